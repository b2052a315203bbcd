pub mod api;
pub mod config;
pub mod controller;
pub mod state;
pub mod view;

// Re-export main types for convenience
pub use api::{ApiClient, RequestBody, RequestError};
pub use config::{Config, ConfigError, Settings};
pub use controller::{ChatController, ChatRequest, GraphRequest, UploadRequest};
pub use state::{AiResponse, ChatState, Message, Notice, NoticeLevel, Sender, StagedFile};
pub use view::{derive, tabulate, TableView, View};
