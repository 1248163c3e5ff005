//! Chat-BOCS client library: session state, typed socket events, WebSocket and
//! HTTP transports, config. Front-end agnostic; the `chatbocs` binary is one front end.

pub mod config;
pub mod http;
pub mod logging;
pub mod messages;
pub mod session;
pub mod transport;

pub use config::{default_config_path, ChatSection, Config, ConfigError, LogSection, ServerSection};
pub use http::{AskClient, HttpError};
pub use messages::{
    AskPayload, ChatMessage, Frame, InboundEvent, Origin, OutboundEvent, ProtocolError,
    ResponseData, ASK_EVENT, RESPONSE_EVENT,
};
pub use session::{SessionController, WELCOME_TEXT};
pub use transport::{EventRouter, Inbound, Transport, TransportError, WsTransport};
