use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, Focus};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
    }
    app.poll_tasks().await;
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Global keys that work in any mode
    if ctrl && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q')) {
        app.should_quit = true;
        return;
    }

    // A notice blocks everything until dismissed
    if app.controller.state().notice.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
            app.controller.dismiss_notice();
        }
        return;
    }

    match key.code {
        KeyCode::Tab => app.focus_next(),
        KeyCode::BackTab => app.focus_prev(),
        KeyCode::Char('u') if ctrl => app.start_upload(),
        KeyCode::Char('o') if ctrl => open_graph_viewer(app),
        KeyCode::PageUp => app.chat_scroll = app.chat_scroll.saturating_sub(5),
        KeyCode::PageDown => app.chat_scroll = app.chat_scroll.saturating_add(5),
        _ => match app.focus {
            Focus::File => handle_file_key(app, key),
            Focus::Chat => handle_chat_key(app, key),
            Focus::Graph => handle_graph_key(app, key),
        },
    }
}

fn handle_file_key(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Enter {
        app.stage_file();
        return;
    }
    edit_text(&mut app.file_input, &mut app.file_cursor, key);
}

fn handle_chat_key(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Enter {
        // Enter submits; Alt/Shift+Enter is the only way to type a newline
        if key.modifiers.intersects(KeyModifiers::ALT | KeyModifiers::SHIFT) {
            insert_text(app.controller.input_mut(), &mut app.chat_cursor, "\n");
        } else {
            app.submit_chat();
        }
        return;
    }
    edit_text(app.controller.input_mut(), &mut app.chat_cursor, key);
}

fn handle_graph_key(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Enter {
        app.submit_graph();
        return;
    }
    edit_text(app.controller.graph_prompt_mut(), &mut app.graph_cursor, key);
}

fn handle_paste(app: &mut App, text: &str) {
    if app.controller.state().notice.is_some() {
        return;
    }
    match app.focus {
        Focus::File => {
            let single_line = text.trim_end_matches(['\r', '\n']).replace(['\r', '\n'], "");
            insert_text(&mut app.file_input, &mut app.file_cursor, &single_line);
        }
        Focus::Chat => insert_text(app.controller.input_mut(), &mut app.chat_cursor, text),
        Focus::Graph => {
            let single_line = text.replace(['\r', '\n'], " ");
            insert_text(app.controller.graph_prompt_mut(), &mut app.graph_cursor, &single_line);
        }
    }
}

fn insert_text(text: &mut String, cursor: &mut usize, insert: &str) {
    let byte_pos = char_to_byte_index(text, *cursor);
    text.insert_str(byte_pos, insert);
    *cursor += insert.chars().count();
}

/// Cursor-aware line editing shared by all inputs
fn edit_text(text: &mut String, cursor: &mut usize, key: KeyEvent) {
    let char_count = text.chars().count();
    *cursor = (*cursor).min(char_count);

    match key.code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if *cursor < char_count {
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Left => *cursor = cursor.saturating_sub(1),
        KeyCode::Right => *cursor = (*cursor + 1).min(char_count),
        KeyCode::Home => *cursor = 0,
        KeyCode::End => *cursor = char_count,
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let (x, y) = (mouse.column, mouse.row);
    let in_chat = app.chat_area.is_some_and(|r| point_in_rect(x, y, r));
    let in_history = app.history_area.is_some_and(|r| point_in_rect(x, y, r));
    let in_table = app.table_area.is_some_and(|r| point_in_rect(x, y, r));

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if in_chat {
                app.chat_scroll = app.chat_scroll.saturating_add(3);
            } else if in_history {
                app.history_scroll = app.history_scroll.saturating_add(3);
            } else if in_table {
                app.table_offset = app.table_offset.saturating_add(1);
            }
        }
        MouseEventKind::ScrollUp => {
            if in_chat {
                app.chat_scroll = app.chat_scroll.saturating_sub(3);
            } else if in_history {
                app.history_scroll = app.history_scroll.saturating_sub(3);
            } else if in_table {
                app.table_offset = app.table_offset.saturating_sub(1);
            }
        }
        _ => {}
    }
}

/// Show the graph viewer in the system browser
fn open_graph_viewer(app: &App) {
    use std::process::{Command, Stdio};

    let Some(url) = app.controller.view().iframe_src.map(str::to_string) else {
        return;
    };

    let mut command = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]);
        cmd
    } else {
        Command::new("xdg-open")
    };

    let spawned = command
        .arg(&url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    if let Err(err) = spawned {
        tracing::warn!(url = %url, error = %err, "could not open graph viewer");
    }
}
