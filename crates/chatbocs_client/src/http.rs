//! HTTP alternative to the socket flow: `POST <base>/ask`.

use tracing::debug;

use crate::messages::{AskPayload, ResponseData};

/// HTTP ask error.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response body: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Client for the backend's `/ask` endpoint.
#[derive(Debug, Clone)]
pub struct AskClient {
    http: reqwest::Client,
    endpoint: String,
}

impl AskClient {
    /// `base` is the backend root, e.g. `http://localhost:8000`.
    pub fn new(base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}/ask", base.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Ask one question.
    ///
    /// A non-success status whose body is `{"error": ...}` is returned as
    /// [`ResponseData::Failure`]; any other non-success status is an error.
    pub async fn ask(&self, question: &str) -> Result<ResponseData, HttpError> {
        let body = AskPayload {
            question: question.to_string(),
        };
        let resp = self.http.post(&self.endpoint).json(&body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        debug!(status = status.as_u16(), endpoint = %self.endpoint, "ask answered");

        if status.is_success() {
            return serde_json::from_str(&text).map_err(HttpError::Decode);
        }
        match serde_json::from_str::<ResponseData>(&text) {
            Ok(failure @ ResponseData::Failure { .. }) => Ok(failure),
            _ => Err(HttpError::Status {
                status: status.as_u16(),
                body: text,
            }),
        }
    }
}
