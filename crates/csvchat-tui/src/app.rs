use std::path::PathBuf;

use csvchat_core::{ApiClient, ChatController, Notice, RequestError, Settings, StagedFile};
use ratatui::layout::Rect;
use serde_json::Value;
use tokio::task::JoinHandle;

type RequestTask = JoinHandle<Result<Value, RequestError>>;

/// Which input currently receives keystrokes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    File,
    Chat,
    Graph,
}

pub struct App {
    pub should_quit: bool,
    pub focus: Focus,

    pub controller: ChatController,
    pub client: ApiClient,
    pub settings: Settings,

    // File picker input
    pub file_input: String,
    pub file_cursor: usize,

    // Cursors into the controller-owned chat input and graph prompt
    pub chat_cursor: usize,
    pub graph_cursor: usize,

    // One slot per action; a filled slot blocks a second request of that kind
    pub upload_task: Option<RequestTask>,
    pub chat_task: Option<RequestTask>,
    pub graph_task: Option<RequestTask>,

    pub animation_frame: u8,

    // Scroll state
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,
    pub history_scroll: u16,
    pub table_offset: usize,

    // Areas for mouse hit-testing
    pub chat_area: Option<Rect>,
    pub history_area: Option<Rect>,
    pub table_area: Option<Rect>,
}

impl App {
    pub fn new(settings: Settings) -> Self {
        let client = ApiClient::new(&settings.api_base_url);
        let controller = ChatController::new(settings.iframe_base_url.clone());

        Self {
            should_quit: false,
            focus: Focus::File,

            controller,
            client,
            settings,

            file_input: String::new(),
            file_cursor: 0,

            chat_cursor: 0,
            graph_cursor: 0,

            upload_task: None,
            chat_task: None,
            graph_task: None,

            animation_frame: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            history_scroll: 0,
            table_offset: 0,

            chat_area: None,
            history_area: None,
            table_area: None,
        }
    }

    /// Inputs currently reachable, in tab order
    pub fn focus_targets(&self) -> Vec<Focus> {
        let view = self.controller.view();
        let mut targets = vec![Focus::File];
        if view.chat_form.is_some() {
            targets.push(Focus::Chat);
        }
        if view.graph_form.is_some() {
            targets.push(Focus::Graph);
        }
        targets
    }

    pub fn focus_next(&mut self) {
        let targets = self.focus_targets();
        let idx = targets.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.set_focus(targets[(idx + 1) % targets.len()]);
    }

    pub fn focus_prev(&mut self) {
        let targets = self.focus_targets();
        let idx = targets.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.set_focus(targets[(idx + targets.len() - 1) % targets.len()]);
    }

    fn set_focus(&mut self, focus: Focus) {
        self.focus = focus;
        // Cursor at end of existing text
        match focus {
            Focus::File => self.file_cursor = self.file_input.chars().count(),
            Focus::Chat => self.chat_cursor = self.controller.state().input.chars().count(),
            Focus::Graph => {
                self.graph_cursor = self.controller.state().graph.prompt.chars().count()
            }
        }
    }

    /// Read the typed path and stage it. Problems surface as an error notice.
    pub fn stage_file(&mut self) {
        let raw = self.file_input.trim().trim_matches(|c| c == '"' || c == '\'');
        if raw.is_empty() {
            return;
        }

        let path = expand_home(raw);
        match StagedFile::from_path(&path) {
            Ok(file) => self.controller.select_file(file),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "could not stage file");
                self.controller.show_notice(Notice::error(format!("{:#}", err)));
            }
        }
    }

    pub fn start_upload(&mut self) {
        if self.upload_task.is_some() {
            return;
        }
        if let Some(request) = self.controller.begin_upload() {
            let client = self.client.clone();
            self.upload_task = Some(tokio::spawn(async move { request.send(&client).await }));
        }
    }

    pub fn submit_chat(&mut self) {
        if self.chat_task.is_some() {
            return;
        }
        if let Some(request) = self.controller.begin_chat() {
            self.chat_cursor = 0;
            let client = self.client.clone();
            self.chat_task = Some(tokio::spawn(async move { request.send(&client).await }));
            // Scroll to bottom so the typing indicator is visible
            self.scroll_chat_to_bottom();
        }
    }

    pub fn submit_graph(&mut self) {
        if self.graph_task.is_some() {
            return;
        }
        if let Some(request) = self.controller.begin_graph() {
            let client = self.client.clone();
            self.graph_task = Some(tokio::spawn(async move { request.send(&client).await }));
        }
    }

    /// Fold finished requests back into the controller
    pub async fn poll_tasks(&mut self) {
        if let Some(outcome) = take_finished(&mut self.upload_task).await {
            self.controller.finish_upload(outcome);
        }
        if let Some(outcome) = take_finished(&mut self.chat_task).await {
            self.controller.finish_chat(outcome);
            self.table_offset = 0;
            self.scroll_chat_to_bottom();
        }
        if let Some(outcome) = take_finished(&mut self.graph_task).await {
            self.controller.finish_graph(outcome);
        }
    }

    pub fn is_busy(&self) -> bool {
        self.upload_task.is_some() || self.chat_task.is_some() || self.graph_task.is_some()
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Scroll the conversation so the newest line is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        // Fall back to a typical pane size before the first render
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };
        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        let state = self.controller.state();
        let mut total_lines: usize = 0;
        for msg in &state.messages {
            total_lines += 1; // Sender line
            for line in msg.text.lines() {
                total_lines += line.chars().count() / wrap_width + 1;
            }
            total_lines += 1; // Blank line after message
        }
        if state.loading {
            total_lines += 2;
        }

        // Paragraph scroll offsets are u16
        let total_lines = u16::try_from(total_lines).unwrap_or(u16::MAX);
        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }
}

async fn take_finished(slot: &mut Option<RequestTask>) -> Option<Result<Value, RequestError>> {
    if !slot.as_ref().is_some_and(|handle| handle.is_finished()) {
        return None;
    }
    let handle = slot.take()?;
    Some(match handle.await {
        Ok(outcome) => outcome,
        Err(join_err) => Err(RequestError::from(join_err)),
    })
}

fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}
