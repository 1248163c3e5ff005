//! Chat log entries and the named socket events exchanged with the backend.
//!
//! Every event travels as one JSON text frame `{"event": <name>, "data": <payload>}`.
//! Payloads are validated into typed structures here, at the transport boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client → server: a user question.
pub const ASK_EVENT: &str = "ask";
/// Server → client: the answer (or failure) for the last question.
pub const RESPONSE_EVENT: &str = "response";

/// Who wrote a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    User,
    Bot,
}

/// One entry of the chat log. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    origin: Origin,
    text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            origin: Origin::User,
            text: text.into(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            origin: Origin::Bot,
            text: text.into(),
        }
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Frame or payload that could not be turned into a known event.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown event: {0}")]
    UnknownEvent(String),
    #[error("invalid `{event}` payload: {source}")]
    InvalidPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One named event on the socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Parse one text frame received from the socket.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Payload of the `ask` event, also the body of `POST /ask`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskPayload {
    pub question: String,
}

/// Payload of the `response` event, also the body returned by `POST /ask`.
///
/// The backend answers `{"response": ...}` or, when answering failed,
/// `{"error": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseData {
    Answer { response: String },
    Failure { error: String },
}

impl ResponseData {
    pub fn answer(text: impl Into<String>) -> Self {
        ResponseData::Answer {
            response: text.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ResponseData::Failure { .. })
    }

    /// Text shown in the chat log for this payload.
    pub fn text(&self) -> &str {
        match self {
            ResponseData::Answer { response } => response,
            ResponseData::Failure { error } => error,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            ResponseData::Answer { response } => response,
            ResponseData::Failure { error } => error,
        }
    }
}

/// Client → server events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    Ask(AskPayload),
}

impl OutboundEvent {
    pub fn ask(question: impl Into<String>) -> Self {
        OutboundEvent::Ask(AskPayload {
            question: question.into(),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::Ask(_) => ASK_EVENT,
        }
    }

    pub fn to_frame(&self) -> Result<Frame, ProtocolError> {
        let data = match self {
            OutboundEvent::Ask(payload) => serde_json::to_value(payload)?,
        };
        Ok(Frame::new(self.name(), data))
    }
}

/// Server → client events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Response(ResponseData),
}

impl InboundEvent {
    /// Validate `data` as the payload of the event called `event`.
    pub fn decode(event: &str, data: &Value) -> Result<Self, ProtocolError> {
        match event {
            RESPONSE_EVENT => {
                let payload: ResponseData = serde_json::from_value(data.clone()).map_err(|source| {
                    ProtocolError::InvalidPayload {
                        event: event.to_string(),
                        source,
                    }
                })?;
                Ok(InboundEvent::Response(payload))
            }
            _ => Err(ProtocolError::UnknownEvent(event.to_string())),
        }
    }

    pub fn from_frame(frame: &Frame) -> Result<Self, ProtocolError> {
        Self::decode(&frame.event, &frame.data)
    }
}
