//! Chat/upload state machine
//!
//! Every network transition comes in two halves. `begin_*` checks the
//! precondition, applies the optimistic update and hands back an owned
//! request. `finish_*` folds the outcome back into state and always clears
//! the matching loading flag. Front ends that drive their own tasks use the
//! halves directly; [`ChatController::upload`], [`ChatController::send_message`]
//! and [`ChatController::submit_graph`] chain them for callers that can await
//! inline.
//!
//! A transition whose loading flag is already set is refused, so at most one
//! request per action is ever in flight.

use serde_json::Value;

use crate::api::{ApiClient, RequestError};
use crate::state::{AiResponse, ChatState, Message, Notice, StagedFile, INSUFFICIENT_DATA};
use crate::view::{self, View};

pub const UPLOAD_OK: &str = "File uploaded successfully";
pub const UPLOAD_FAILED: &str = "Error uploading file";
pub const GRAPH_NO_RESPONSE: &str = "No AI response available for graph generation.";
pub const GRAPH_NOT_FOUND: &str = "No graph found in the response.";
pub const GRAPH_FAILED: &str = "An error occurred while fetching the graph.";

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file: StagedFile,
}

impl UploadRequest {
    pub async fn send(self, client: &ApiClient) -> Result<Value, RequestError> {
        client.upload_csv(&self.file).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub prompt: String,
}

impl ChatRequest {
    pub async fn send(self, client: &ApiClient) -> Result<Value, RequestError> {
        client.prompt(&self.prompt).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphRequest {
    pub graph_prompt: String,
    pub df: String,
}

impl GraphRequest {
    pub async fn send(self, client: &ApiClient) -> Result<Value, RequestError> {
        client.graph_bytes(&self.graph_prompt, &self.df).await
    }
}

#[derive(Debug, Clone)]
pub struct ChatController {
    state: ChatState,
}

impl ChatController {
    pub fn new(viewer_url: impl Into<String>) -> Self {
        Self {
            state: ChatState::new(viewer_url),
        }
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn view(&self) -> View<'_> {
        view::derive(&self.state)
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.state.input
    }

    pub fn graph_prompt_mut(&mut self) -> &mut String {
        &mut self.state.graph.prompt
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.state.input = text.into();
    }

    pub fn set_graph_prompt(&mut self, text: impl Into<String>) {
        self.state.graph.prompt = text.into();
    }

    /// Stage a file, replacing any previously staged one
    pub fn select_file(&mut self, file: StagedFile) {
        tracing::debug!(file = %file.name, bytes = file.bytes.len(), "file staged");
        self.state.upload.file = Some(file);
    }

    pub fn show_notice(&mut self, notice: Notice) {
        self.state.notice = Some(notice);
    }

    pub fn dismiss_notice(&mut self) -> bool {
        self.state.notice.take().is_some()
    }

    pub fn begin_upload(&mut self) -> Option<UploadRequest> {
        if self.state.upload.uploading {
            return None;
        }
        let file = self.state.upload.file.clone()?;
        self.state.upload.uploading = true;
        tracing::debug!(file = %file.name, "upload started");
        Some(UploadRequest { file })
    }

    pub fn finish_upload(&mut self, outcome: Result<Value, RequestError>) {
        self.state.upload.uploading = false;
        match outcome {
            Ok(_) => {
                self.state.upload.uploaded = true;
                self.state.notice = Some(Notice::info(UPLOAD_OK));
                tracing::info!("dataset uploaded");
            }
            Err(err) => {
                self.state.notice = Some(Notice::error(UPLOAD_FAILED));
                tracing::warn!(error = %err, "dataset upload failed");
            }
        }
    }

    /// Returns `None` without touching state when the chat form is not
    /// reachable, the input is blank, or a prompt is already in flight.
    pub fn begin_chat(&mut self) -> Option<ChatRequest> {
        if !self.state.upload.uploaded || self.state.loading || self.state.input.trim().is_empty() {
            return None;
        }

        let prompt = std::mem::take(&mut self.state.input);
        self.state.messages.push(Message::user(prompt.clone()));
        self.state.loading = true;
        Some(ChatRequest { prompt })
    }

    pub fn finish_chat(&mut self, outcome: Result<Value, RequestError>) {
        match outcome {
            Ok(value) => {
                let response = AiResponse(value);
                self.state.messages.push(Message::ai(response.message_text()));
                self.state.ai_response = Some(response);
            }
            Err(err) => {
                self.state.messages.push(Message::ai(INSUFFICIENT_DATA));
                tracing::warn!(error = %err, "prompt failed");
            }
        }
        self.state.loading = false;
    }

    pub fn begin_graph(&mut self) -> Option<GraphRequest> {
        if self.state.graph.loading {
            return None;
        }
        let Some(response) = &self.state.ai_response else {
            self.state.graph.error = Some(GRAPH_NO_RESPONSE.to_string());
            return None;
        };
        let df = response.to_df();

        self.state.graph.loading = true;
        self.state.graph.error = None;
        self.state.graph.iframe_src = None;
        Some(GraphRequest {
            graph_prompt: self.state.graph.prompt.clone(),
            df,
        })
    }

    pub fn finish_graph(&mut self, outcome: Result<Value, RequestError>) {
        match outcome {
            // Only the presence of `graph` matters, never its value.
            Ok(value) if value.get("graph").is_some() => {
                self.state.graph.iframe_src = Some(self.state.viewer_url.clone());
            }
            Ok(_) => {
                self.state.graph.error = Some(GRAPH_NOT_FOUND.to_string());
            }
            Err(err) => {
                self.state.graph.error = Some(GRAPH_FAILED.to_string());
                tracing::warn!(error = %err, "graph request failed");
            }
        }
        self.state.graph.loading = false;
    }

    pub async fn upload(&mut self, client: &ApiClient) {
        if let Some(request) = self.begin_upload() {
            let outcome = request.send(client).await;
            self.finish_upload(outcome);
        }
    }

    pub async fn send_message(&mut self, client: &ApiClient) {
        if let Some(request) = self.begin_chat() {
            let outcome = request.send(client).await;
            self.finish_chat(outcome);
        }
    }

    pub async fn submit_graph(&mut self, client: &ApiClient) {
        if let Some(request) = self.begin_graph() {
            let outcome = request.send(client).await;
            self.finish_graph(outcome);
        }
    }
}
