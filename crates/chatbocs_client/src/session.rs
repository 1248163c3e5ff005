//! Chat session state: the ordered message log and the pending-request flag.

use tracing::{debug, warn};

use crate::messages::{ChatMessage, InboundEvent, OutboundEvent, ResponseData, RESPONSE_EVENT};
use crate::transport::{EventRouter, Transport};

/// Greeting seeded as the first bot message of every session.
pub const WELCOME_TEXT: &str =
    "Bienvenue sur Chat-BOCS, Je suis là pour vous aider. Posez-moi une question à tout moment.";

/// Owns one chat session and sends questions through the injected transport `T`.
///
/// There is no correlation between a question and the next `response`
/// event: the backend is assumed to answer one question at a time, in order.
pub struct SessionController<T> {
    transport: T,
    welcome: String,
    messages: Vec<ChatMessage>,
    pending_request: bool,
    input: String,
}

impl<T: Transport> SessionController<T> {
    /// New session greeted with [`WELCOME_TEXT`].
    pub fn new(transport: T) -> Self {
        Self::with_welcome(transport, WELCOME_TEXT)
    }

    /// New session greeted with `welcome`. The session starts initialized.
    pub fn with_welcome(transport: T, welcome: impl Into<String>) -> Self {
        let mut session = Self {
            transport,
            welcome: welcome.into(),
            messages: Vec::new(),
            pending_request: false,
            input: String::new(),
        };
        session.initialize();
        session
    }

    /// Reset to a single bot greeting with nothing pending.
    pub fn initialize(&mut self) {
        self.messages.clear();
        self.messages.push(ChatMessage::bot(self.welcome.clone()));
        self.pending_request = false;
        self.input.clear();
    }

    /// Append `question` as a user message and emit it as an `ask` event.
    ///
    /// Blank questions are ignored. Returns whether the question was sent.
    pub fn submit(&mut self, question: &str) -> bool {
        if question.trim().is_empty() {
            debug!("ignoring blank question");
            return false;
        }
        if self.pending_request {
            debug!("question submitted while another is pending");
        }
        self.messages.push(ChatMessage::user(question));
        self.pending_request = true;
        self.transport.emit(OutboundEvent::ask(question));
        self.input.clear();
        true
    }

    /// Submit the input buffer. The buffer is kept when the submit is rejected.
    pub fn submit_input(&mut self) -> bool {
        let question = std::mem::take(&mut self.input);
        if self.submit(&question) {
            true
        } else {
            self.input = question;
            false
        }
    }

    /// Record the backend's reply, whether or not a question was pending.
    pub fn on_response(&mut self, data: ResponseData) {
        if !self.pending_request {
            debug!("response arrived with no question pending");
        }
        if let ResponseData::Failure { error } = &data {
            warn!(%error, "backend failed to answer");
        }
        self.pending_request = false;
        self.messages.push(ChatMessage::bot(data.into_text()));
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Messages in display order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn pending_request(&self) -> bool {
        self.pending_request
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// End the session, handing back the transport (e.g. to close it).
    pub fn into_transport(self) -> T {
        self.transport
    }
}

impl<T: Transport + 'static> SessionController<T> {
    /// Register the session's `response` handler on `router`.
    /// Payloads that fail validation are logged and leave the session untouched.
    pub fn bind(router: &mut EventRouter<Self>) {
        router.on(RESPONSE_EVENT, |session: &mut Self, data| {
            match InboundEvent::decode(RESPONSE_EVENT, data) {
                Ok(InboundEvent::Response(payload)) => session.on_response(payload),
                Err(e) => warn!(error = %e, "ignoring invalid response"),
            }
        });
    }
}
