use reqwest::header::HeaderMap;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};
use thiserror::Error;

use crate::state::StagedFile;

pub const UPLOAD_ENDPOINT: &str = "/upload-csv/";
pub const PROMPT_ENDPOINT: &str = "/prompt/";
pub const GRAPH_ENDPOINT: &str = "/prompt/getGraphBytes/";

/// Any failed backend call. Callers do not branch on the variant.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} returned {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("request task did not complete: {0}")]
    Interrupted(#[from] tokio::task::JoinError),
}

pub enum RequestBody {
    Json(Value),
    Multipart(Form),
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.to_string(),
        }
    }

    /// Single-attempt request against `base_url + endpoint`.
    ///
    /// Returns the parsed JSON body on 2xx. An empty body comes back as
    /// `Value::Null` and a non-JSON body as `Value::String`. Failures are
    /// logged and returned unchanged.
    pub async fn call(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<RequestBody>,
        headers: Option<HeaderMap>,
    ) -> Result<Value, RequestError> {
        let url = format!("{}{}", self.base_url, endpoint);

        let result = self.send(&url, method, body, headers).await;
        if let Err(err) = &result {
            tracing::error!(url = %url, error = %err, "API call error");
        }
        result
    }

    async fn send(
        &self,
        url: &str,
        method: Method,
        body: Option<RequestBody>,
        headers: Option<HeaderMap>,
    ) -> Result<Value, RequestError> {
        let transport = |source: reqwest::Error| RequestError::Transport {
            url: url.to_string(),
            source,
        };

        let mut request = self.client.request(method, url);
        request = match body {
            Some(RequestBody::Json(value)) => request.json(&value),
            Some(RequestBody::Multipart(form)) => request.multipart(form),
            None => request,
        };
        if let Some(headers) = headers {
            request = request.headers(headers);
        }

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(RequestError::Status {
                url: url.to_string(),
                status,
                body: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }

    pub async fn upload_csv(&self, file: &StagedFile) -> Result<Value, RequestError> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str("text/csv")
            .map_err(|source| RequestError::Transport {
                url: format!("{}{}", self.base_url, UPLOAD_ENDPOINT),
                source,
            })?;
        let form = Form::new().part("file", part);

        self.call(UPLOAD_ENDPOINT, Method::POST, Some(RequestBody::Multipart(form)), None)
            .await
    }

    pub async fn prompt(&self, prompt: &str) -> Result<Value, RequestError> {
        let body = json!({ "prompt": prompt });
        self.call(PROMPT_ENDPOINT, Method::POST, Some(RequestBody::Json(body)), None)
            .await
    }

    pub async fn graph_bytes(&self, graph_prompt: &str, df: &str) -> Result<Value, RequestError> {
        let body = json!({ "graph_prompt": graph_prompt, "df": df });
        self.call(GRAPH_ENDPOINT, Method::POST, Some(RequestBody::Json(body)), None)
            .await
    }
}
