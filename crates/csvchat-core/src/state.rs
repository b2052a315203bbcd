//! UI-agnostic application state types
//!
//! Everything a chat session knows lives in [`ChatState`]. The controller is
//! the only writer; front ends read it through [`crate::view::derive`].

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fallback bubble shown when a prompt round trip fails
pub const INSUFFICIENT_DATA: &str = "Insufficient Data";

/// A chat message in the dataset conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub sender: Sender,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
        }
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Ai,
        }
    }
}

/// Who sent a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

/// Raw payload of the last successful prompt call.
///
/// The backend decides the shape: usually an object carrying an `aiResponse`
/// string, sometimes an array of row objects. Nothing is validated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AiResponse(pub Value);

impl AiResponse {
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Text for the AI chat bubble. Missing or non-string `aiResponse` gives an empty bubble.
    pub fn message_text(&self) -> String {
        match &self.0 {
            Value::Object(map) => map
                .get("aiResponse")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            Value::String(s) => s.clone(),
            _ => String::new(),
        }
    }

    /// Serialized copy sent as the `df` field of a graph request
    pub fn to_df(&self) -> String {
        // Serializing a `Value` cannot fail: all map keys are strings.
        serde_json::to_string(&self.0).unwrap_or_default()
    }
}

/// A CSV file read from disk and waiting to be uploaded
#[derive(Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for StagedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedFile")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl StagedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file for staging. Only `.csv` files are accepted, like a picker filter.
    pub fn from_path(path: &Path) -> Result<Self> {
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if !is_csv {
            return Err(anyhow!("{} is not a .csv file", path.display()));
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("Invalid file name: {}", path.display()))?
            .to_string();
        let bytes = std::fs::read(path)
            .with_context(|| format!("Could not read {}", path.display()))?;

        Ok(Self { name, bytes })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadState {
    pub file: Option<StagedFile>,
    pub uploaded: bool,
    pub uploading: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphRequestState {
    pub prompt: String,
    pub iframe_src: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Blocking message the user must dismiss
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// Complete state of one chat session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatState {
    pub messages: Vec<Message>,
    pub input: String,
    pub loading: bool,
    pub ai_response: Option<AiResponse>,
    pub upload: UploadState,
    pub graph: GraphRequestState,
    pub notice: Option<Notice>,
    /// Viewer URL shown once a graph is confirmed
    pub viewer_url: String,
}

impl ChatState {
    pub fn new(viewer_url: impl Into<String>) -> Self {
        Self {
            viewer_url: viewer_url.into(),
            ..Self::default()
        }
    }
}
