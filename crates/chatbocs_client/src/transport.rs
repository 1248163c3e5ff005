//! WebSocket transport: emit named events, receive frames, route them to handlers.

use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::messages::{Frame, OutboundEvent};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Upper bound on waiting for the close frame to be flushed.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Outbound half of the event channel.
///
/// `emit` never reports failure to the caller; a dropped event is only logged.
pub trait Transport {
    fn emit(&self, event: OutboundEvent);
}

impl<T: Transport + ?Sized> Transport for &T {
    fn emit(&self, event: OutboundEvent) {
        (**self).emit(event)
    }
}

/// Transport connection error.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection to {url} failed: {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },
}

/// Connected WebSocket transport. Frames are written by a background task.
pub struct WsTransport {
    outgoing: mpsc::UnboundedSender<Message>,
    writer: Option<JoinHandle<()>>,
}

/// Inbound half of the event channel: frames in arrival order.
pub struct Inbound {
    frames: mpsc::UnboundedReceiver<Frame>,
}

impl WsTransport {
    /// Connect to the backend at `url` (e.g. `ws://localhost:8000/ws`).
    ///
    /// Spawns the reader and writer tasks on the current runtime.
    pub async fn connect(url: &str) -> Result<(Self, Inbound), TransportError> {
        let (ws_stream, _) =
            tokio_tungstenite::connect_async(url)
                .await
                .map_err(|source| TransportError::Connect {
                    url: url.to_string(),
                    source,
                })?;
        info!(url, "connected");

        let (sink, stream) = ws_stream.split();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_loop(sink, out_rx));
        tokio::spawn(read_loop(stream, in_tx));

        Ok((
            Self {
                outgoing: out_tx,
                writer: Some(writer),
            },
            Inbound { frames: in_rx },
        ))
    }

    /// False once the writer task has stopped (socket error or `close`).
    pub fn is_connected(&self) -> bool {
        !self.outgoing.is_closed()
    }

    /// Send a close frame and wait for the writer to flush it and stop.
    /// Later emits are dropped.
    pub async fn close(&mut self) {
        let _ = self.outgoing.send(Message::Close(None));
        let Some(writer) = self.writer.take() else {
            return;
        };
        match tokio::time::timeout(CLOSE_TIMEOUT, writer).await {
            Ok(Ok(())) => debug!("closed"),
            Ok(Err(e)) => warn!(error = %e, "writer task failed"),
            Err(_) => warn!("timed out sending close frame"),
        }
    }
}

impl Transport for WsTransport {
    fn emit(&self, event: OutboundEvent) {
        let name = event.name();
        let json = match event.to_frame().and_then(|frame| frame.to_json()) {
            Ok(json) => json,
            Err(e) => {
                warn!(event = name, error = %e, "dropping event: encode failed");
                return;
            }
        };
        debug!(event = name, "emit");
        if self.outgoing.send(Message::Text(json)).is_err() {
            warn!(event = name, "dropping event: channel not connected");
        }
    }
}

impl Inbound {
    /// Next frame from the server; `None` once the socket has closed.
    pub async fn next(&mut self) -> Option<Frame> {
        self.frames.recv().await
    }
}

async fn write_loop(
    mut sink: SplitSink<WsStream, Message>,
    mut outgoing: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(message) = outgoing.recv().await {
        let closing = matches!(message, Message::Close(_));
        if let Err(e) = sink.send(message).await {
            warn!(error = %e, "socket write failed");
            break;
        }
        if closing {
            break;
        }
    }
    outgoing.close();
    let _ = sink.close().await;
}

async fn read_loop(mut stream: SplitStream<WsStream>, frames: mpsc::UnboundedSender<Frame>) {
    while let Some(item) = stream.next().await {
        let text = match item {
            Ok(Message::Text(t)) => t,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!(error = %e, "socket read failed");
                break;
            }
        };
        let frame = match Frame::parse(&text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "skipping unparseable frame");
                continue;
            }
        };
        debug!(event = %frame.event, "received");
        if frames.send(frame).is_err() {
            break;
        }
    }
    info!("disconnected");
}

type Handler<C> = Box<dyn FnMut(&mut C, &Value)>;

/// Handlers registered per event name, invoked with a context `C`.
///
/// Handlers for one event run in registration order.
pub struct EventRouter<C> {
    handlers: Vec<(String, Handler<C>)>,
}

impl<C> Default for EventRouter<C> {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }
}

impl<C> EventRouter<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every inbound event called `event`.
    pub fn on<F>(&mut self, event: impl Into<String>, handler: F)
    where
        F: FnMut(&mut C, &Value) + 'static,
    {
        self.handlers.push((event.into(), Box::new(handler)));
    }

    pub fn has_handler(&self, event: &str) -> bool {
        self.handlers.iter().any(|(name, _)| name == event)
    }

    /// Run the handlers registered for `frame.event`; returns how many ran.
    pub fn dispatch(&mut self, ctx: &mut C, frame: &Frame) -> usize {
        let mut ran = 0;
        for (name, handler) in self.handlers.iter_mut() {
            if *name == frame.event {
                handler(&mut *ctx, &frame.data);
                ran += 1;
            }
        }
        if ran == 0 {
            debug!(event = %frame.event, "no handler for event");
        }
        ran
    }
}
