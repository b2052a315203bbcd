use csvchat_core::view::{TableView, View, TYPING_MESSAGE};
use csvchat_core::{NoticeLevel, Sender};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};

use crate::app::{App, Focus};

const MAX_CHAT_INPUT_LINES: u16 = 4;
const MAX_TABLE_HEIGHT: u16 = 14;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let [history_area, main_area] = Layout::horizontal([
        Constraint::Percentage(25),
        Constraint::Percentage(75),
    ])
    .areas(body_area);

    render_history(app, frame, history_area);
    render_main(app, frame, main_area);
    render_footer(app, frame, footer_area);

    if app.controller.state().notice.is_some() {
        render_notice(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" csvchat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!(" {} ", app.settings.api_base_url),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::Black));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let hint = |key: &'static str, label: &'static str| {
        [
            Span::styled(format!(" {} ", key), key_style),
            Span::styled(format!(" {} ", label), label_style),
        ]
    };

    let mode_text = match app.focus {
        Focus::File => " FILE ",
        Focus::Chat => " CHAT ",
        Focus::Graph => " GRAPH ",
    };
    let mut spans = vec![Span::styled(
        mode_text,
        Style::default().bg(Color::Blue).fg(Color::White).bold(),
    )];

    if app.controller.state().notice.is_some() {
        spans.extend(hint("Enter", "dismiss"));
    } else {
        match app.focus {
            Focus::File => {
                spans.extend(hint("Enter", "select file"));
                spans.extend(hint("^U", "upload"));
            }
            Focus::Chat => {
                spans.extend(hint("Enter", "send"));
                spans.extend(hint("Alt+Enter", "newline"));
            }
            Focus::Graph => {
                spans.extend(hint("Enter", "generate graph"));
            }
        }
        spans.extend(hint("Tab", "focus"));
        spans.extend(hint("PgUp/PgDn", "scroll"));
        if app.controller.view().iframe_src.is_some() {
            spans.extend(hint("^O", "open graph"));
        }
        spans.extend(hint("^C", "quit"));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn sender_style(sender: Sender) -> Style {
    match sender {
        Sender::User => Style::default().fg(Color::Cyan),
        Sender::Ai => Style::default().fg(Color::White),
    }
}

fn render_history(app: &mut App, frame: &mut Frame, area: Rect) {
    app.history_area = Some(area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Chat History ");

    let state = app.controller.state();
    let lines: Vec<Line> = state
        .messages
        .iter()
        .flat_map(|msg| {
            let marker = match msg.sender {
                Sender::User => "> ",
                Sender::Ai => "< ",
            };
            [
                Line::from(vec![
                    Span::styled(marker, Style::default().fg(Color::DarkGray)),
                    Span::styled(msg.text.clone(), sender_style(msg.sender)),
                ]),
                Line::default(),
            ]
        })
        .collect();

    let history = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.history_scroll, 0));
    frame.render_widget(history, area);
}

fn render_main(app: &mut App, frame: &mut Frame, area: Rect) {
    let view = app.controller.view();

    let table_height = view.table.as_ref().map(table_height).unwrap_or(0);
    let graph_height = if view.iframe_src.is_some() {
        4
    } else if view.graph_error.is_some() {
        3
    } else {
        0
    };
    let chat_input_height = view
        .chat_form
        .as_ref()
        .map(|form| clamp_lines(form.input.split('\n').count(), MAX_CHAT_INPUT_LINES) + 2)
        .unwrap_or(0);
    let graph_input_height = if view.graph_form.is_some() { 3 } else { 0 };

    let [upload_area, chat_area, table_area, graph_area, chat_input_area, graph_input_area] =
        Layout::vertical([
            Constraint::Length(4),
            Constraint::Min(3),
            Constraint::Length(table_height),
            Constraint::Length(graph_height),
            Constraint::Length(chat_input_height),
            Constraint::Length(graph_input_height),
        ])
        .areas(area);

    // Store areas for mouse hit-testing and scroll calculations
    app.chat_area = Some(chat_area);
    app.table_area = (table_height > 0).then_some(table_area);
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let view = app.controller.view();
    render_upload(app, &view, frame, upload_area);
    render_conversation(app, &view, frame, chat_area);
    if let Some(table) = &view.table {
        render_table(app, table, frame, table_area);
    }
    if graph_height > 0 {
        render_graph_panel(&view, frame, graph_area);
    }
    if chat_input_height > 0 {
        render_chat_input(app, &view, frame, chat_input_area);
    }
    if graph_input_height > 0 {
        render_graph_input(app, &view, frame, graph_input_area);
    }
}

/// Rows plus header and borders, capped at `MAX_TABLE_HEIGHT`
fn table_height(table: &TableView) -> u16 {
    match table {
        TableView::Empty => 3,
        TableView::Rows { rows, .. } => clamp_lines(rows.len(), MAX_TABLE_HEIGHT - 3) + 3,
    }
}

fn clamp_lines(count: usize, max: u16) -> u16 {
    saturating_u16(count).clamp(1, max)
}

fn saturating_u16(count: usize) -> u16 {
    u16::try_from(count).unwrap_or(u16::MAX)
}

fn border_for(app: &App, focus: Focus) -> Style {
    if app.focus == focus {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn render_upload(app: &App, view: &View, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_for(app, Focus::File))
        .title(" Visualize Data: CSV path ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [input_area, status_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Length(1)]).areas(inner);

    let (visible, cursor_x) = visible_slice(&app.file_input, app.file_cursor, input_area.width);
    frame.render_widget(
        Paragraph::new(visible).style(Style::default().fg(Color::Cyan)),
        input_area,
    );
    if app.focus == Focus::File && app.controller.state().notice.is_none() {
        frame.set_cursor_position((input_area.x + cursor_x, input_area.y));
    }

    let dim = Style::default().fg(Color::DarkGray);
    let status = match (view.upload.file_name, view.upload.uploading, view.upload.uploaded) {
        (_, true, _) => Line::from(Span::styled(
            format!("Uploading{}", dots(app)),
            Style::default().fg(Color::Yellow),
        )),
        (Some(name), false, uploaded) => {
            let mut spans = vec![
                Span::styled("Selected: ", dim),
                Span::styled(name.to_string(), Style::default().fg(Color::White)),
            ];
            if uploaded {
                spans.push(Span::styled("  uploaded", Style::default().fg(Color::Green)));
            }
            if view.upload.can_upload {
                spans.push(Span::styled("  (Ctrl+U: Upload CSV Dataset)", dim));
            }
            Line::from(spans)
        }
        (None, false, _) => Line::from(Span::styled(
            "Type a path to a .csv file and press Enter",
            dim,
        )),
    };
    frame.render_widget(Paragraph::new(status), status_area);
}

fn dots(app: &App) -> String {
    // Animated ellipsis: cycles through ".", "..", "..."
    ".".repeat(app.animation_frame as usize + 1)
}

fn render_conversation(app: &App, view: &View, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");

    let text = if view.messages.is_empty() && !view.typing {
        let hint = if view.chat_form.is_some() {
            "Ask me about dataset..."
        } else {
            "Upload a CSV dataset to start chatting."
        };
        Text::from(Span::styled(hint, Style::default().fg(Color::DarkGray)))
    } else {
        let mut lines: Vec<Line> = Vec::new();
        for msg in view.messages {
            // User bubbles on the right, AI on the left
            let (label, label_color, alignment) = match msg.sender {
                Sender::User => ("You", Color::Cyan, Alignment::Right),
                Sender::Ai => ("AI", Color::Yellow, Alignment::Left),
            };
            lines.push(
                Line::from(Span::styled(
                    label,
                    Style::default().fg(label_color).add_modifier(Modifier::BOLD),
                ))
                .alignment(alignment),
            );
            for line in msg.text.lines() {
                lines.push(
                    Line::from(Span::styled(line.to_string(), sender_style(msg.sender)))
                        .alignment(alignment),
                );
            }
            lines.push(Line::default());
        }

        if view.typing {
            lines.push(Line::from(Span::styled(
                "AI",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            let typing = TYPING_MESSAGE.trim_end_matches('.');
            lines.push(Line::from(Span::styled(
                format!("{}{}", typing, dots(app)),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);
}

fn render_table(app: &App, table: &TableView, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Result ");

    let TableView::Rows { columns, rows } = table else {
        let empty = Paragraph::new(table.empty_message().unwrap_or_default())
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(empty, area);
        return;
    };

    let header = Row::new(columns.iter().map(|c| Cell::from(c.to_uppercase())))
        .style(Style::default().fg(Color::White).bg(Color::DarkGray).bold());

    let body = rows.iter().enumerate().map(|(i, row)| {
        let bg = if i % 2 == 0 { Color::Black } else { Color::Reset };
        Row::new(row.iter().map(|cell| Cell::from(cell.as_str())))
            .style(Style::default().fg(Color::Gray).bg(bg))
    });

    let widths = vec![Constraint::Fill(1); columns.len()];
    let widget = Table::new(body, widths).header(header).block(block);

    let offset = app.table_offset.min(rows.len().saturating_sub(1));
    let mut state = TableState::default().with_offset(offset);
    frame.render_stateful_widget(widget, area, &mut state);
}

fn render_graph_panel(view: &View, frame: &mut Frame, area: Rect) {
    if let Some(error) = view.graph_error {
        let panel = Paragraph::new(error)
            .style(Style::default().fg(Color::Red))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red)),
            );
        frame.render_widget(panel, area);
        return;
    }

    let Some(src) = view.iframe_src else {
        return;
    };
    let lines = vec![
        Line::from(Span::styled(
            src.to_string(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::UNDERLINED),
        )),
        Line::from(Span::styled(
            "Press Ctrl+O to open the graph in your browser",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green))
            .title(" Generated Graph "),
    );
    frame.render_widget(panel, area);
}

fn render_chat_input(app: &App, view: &View, frame: &mut Frame, area: Rect) {
    let Some(form) = &view.chat_form else {
        return;
    };

    let title = if form.submit_enabled {
        " Ask (Enter to send) "
    } else {
        " Ask (waiting for reply) "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_for(app, Focus::Chat))
        .title(title);
    let inner = block.inner(area);

    // Cursor line/column within the multi-line input
    let before: String = form.input.chars().take(app.chat_cursor).collect();
    let cursor_line = saturating_u16(before.matches('\n').count());
    let cursor_col = saturating_u16(before.rsplit('\n').next().unwrap_or_default().chars().count());
    let line_offset = cursor_line.saturating_add(1).saturating_sub(inner.height);

    let input = Paragraph::new(form.input)
        .style(Style::default().fg(Color::Cyan))
        .scroll((line_offset, cursor_col.saturating_sub(inner.width.saturating_sub(1))))
        .block(block);
    frame.render_widget(input, area);

    if app.focus == Focus::Chat && view.notice.is_none() {
        let x = cursor_col.min(inner.width.saturating_sub(1));
        let y = cursor_line.saturating_sub(line_offset);
        frame.set_cursor_position((inner.x + x, inner.y + y));
    }
}

fn render_graph_input(app: &App, view: &View, frame: &mut Frame, area: Rect) {
    let Some(form) = &view.graph_form else {
        return;
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_for(app, Focus::Graph))
        .title(format!(" Generate graph... [{}] ", form.submit_label));
    let inner = block.inner(area);

    let (visible, cursor_x) = visible_slice(form.prompt, app.graph_cursor, inner.width);
    frame.render_widget(
        Paragraph::new(visible)
            .style(Style::default().fg(Color::Yellow))
            .block(block),
        area,
    );

    if app.focus == Focus::Graph && view.notice.is_none() {
        frame.set_cursor_position((inner.x + cursor_x, inner.y));
    }
}

/// Visible part of a single-line input, scrolled horizontally to keep the cursor in view
fn visible_slice(text: &str, cursor: usize, width: u16) -> (String, u16) {
    let width = width as usize;
    let scroll_offset = if width == 0 {
        0
    } else if cursor >= width {
        cursor - width + 1
    } else {
        0
    };

    let visible: String = text.chars().skip(scroll_offset).take(width).collect();
    (visible, (cursor - scroll_offset) as u16)
}

fn render_notice(app: &App, frame: &mut Frame, area: Rect) {
    let Some(notice) = &app.controller.state().notice else {
        return;
    };

    // Calculate popup size and position (centered)
    let popup_width = 50.min(area.width.saturating_sub(4));
    let popup_height = 5;
    let popup_x = area.width.saturating_sub(popup_width) / 2;
    let popup_y = area.height.saturating_sub(popup_height) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let (title, color) = match notice.level {
        NoticeLevel::Info => (" Notice ", Color::Green),
        NoticeLevel::Error => (" Error ", Color::Red),
    };
    let body = Text::from(vec![
        Line::from(notice.text.as_str()),
        Line::default(),
        Line::from(Span::styled("Press Enter to dismiss", Style::default().fg(Color::DarkGray))),
    ]);
    let popup = Paragraph::new(body)
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(title),
        );
    frame.render_widget(popup, popup_area);
}
