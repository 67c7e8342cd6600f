//! Event sources feeding the bus.
//!
//! The bus consumes an [`EventSource`] rather than a socket, so the wire
//! transport can be swapped: [`WebSocketSource`] for deployments,
//! [`ScriptedSource`] for tests and demos.

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use super::{BusError, EventMessage};

/// Capacity of the channel between a source and the bus read loop.
const SOURCE_CHANNEL_CAPACITY: usize = 64;

/// A connectable stream of server-push events.
///
/// `connect` resolves to a receiver of parsed messages; the receiver
/// closing signals a transport drop, which the bus answers with backoff
/// and reconnect.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn connect(&self) -> Result<mpsc::Receiver<EventMessage>, BusError>;
}

/// WebSocket wire source. Each message is a JSON frame shaped
/// `{type, data, timestamp}`.
pub struct WebSocketSource {
    url: String,
}

impl WebSocketSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl EventSource for WebSocketSource {
    async fn connect(&self) -> Result<mpsc::Receiver<EventMessage>, BusError> {
        let (stream, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| BusError::Connect(e.to_string()))?;
        debug!(url = %self.url, "WebSocket connected");

        let (tx, rx) = mpsc::channel(SOURCE_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            let (_write, mut read) = stream.split();
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<EventMessage>(&text) {
                            Ok(message) => {
                                if tx.send(message).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(error = %e, "Dropping malformed event frame");
                            }
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "WebSocket read error");
                        break;
                    }
                }
            }
            // Sender drops here; the bus sees the channel close and
            // schedules a reconnect.
        });

        Ok(rx)
    }
}

/// Scripted source for tests and demos: fails the first `fail_first`
/// connect attempts, then delivers a fixed batch of messages and holds the
/// connection open.
pub struct ScriptedSource {
    fail_first: u32,
    attempts: AtomicU32,
    messages: Mutex<Vec<EventMessage>>,
    // Kept alive so the delivered channel does not read as a transport drop.
    held_sender: Mutex<Option<mpsc::Sender<EventMessage>>>,
}

impl ScriptedSource {
    /// Source that connects on the first attempt and delivers `messages`.
    pub fn new(messages: Vec<EventMessage>) -> Self {
        Self::failing_then(0, messages)
    }

    /// Source whose first `fail_first` connect attempts fail.
    pub fn failing_then(fail_first: u32, messages: Vec<EventMessage>) -> Self {
        Self {
            fail_first,
            attempts: AtomicU32::new(0),
            messages: Mutex::new(messages),
            held_sender: Mutex::new(None),
        }
    }

    /// Source that never connects.
    pub fn always_failing() -> Self {
        Self::failing_then(u32::MAX, Vec::new())
    }

    /// Connect attempts observed so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn connect(&self) -> Result<mpsc::Receiver<EventMessage>, BusError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.fail_first {
            return Err(BusError::Connect(format!(
                "scripted failure on attempt {}",
                attempt + 1
            )));
        }

        let (tx, rx) = mpsc::channel(SOURCE_CHANNEL_CAPACITY);
        let messages = {
            let mut slot = self
                .messages
                .lock()
                .map_err(|e| BusError::Connect(e.to_string()))?;
            std::mem::take(&mut *slot)
        };
        for message in messages {
            let _ = tx.send(message).await;
        }
        if let Ok(mut held) = self.held_sender.lock() {
            *held = Some(tx);
        }
        Ok(rx)
    }
}
