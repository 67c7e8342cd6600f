//! Event bus: reconnecting publish/subscribe channel for server-push
//! entity updates.
//!
//! State machine: `Disconnected → Connecting → Connected`, back to
//! `Disconnected` on any transport drop, with bounded exponential backoff
//! between reconnect attempts. Exhausting the attempt ceiling is reported
//! once and leaves the bus queryable for its state, so the UI can show a
//! stale-data indicator until an explicit `connect()`.

pub mod source;

pub use source::{EventSource, ScriptedSource, WebSocketSource};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::defaults;

/// Bus errors. Connection failures are non-fatal; they feed the backoff
/// loop rather than surfacing to subscribers.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BusError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Connection state, queryable at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusState {
    Disconnected,
    Connecting,
    Connected,
}

/// The four server-push event types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Telemetry,
    Alert,
    MlEvent,
    HealthStatus,
}

/// Wire message: `{type, data, timestamp}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl EventMessage {
    pub fn new(kind: EventKind, data: serde_json::Value) -> Self {
        Self {
            kind,
            data,
            timestamp: Utc::now(),
        }
    }
}

type Handler = Arc<dyn Fn(&EventMessage) + Send + Sync>;

struct BusInner {
    source: Arc<dyn EventSource>,
    state: RwLock<BusState>,
    handlers: RwLock<HashMap<EventKind, Vec<(u64, Handler)>>>,
    next_handler_id: AtomicU64,
    cancel: Mutex<Option<CancellationToken>>,
}

impl BusInner {
    fn set_state(&self, state: BusState) {
        if let Ok(mut slot) = self.state.write() {
            *slot = state;
        }
    }

    /// Invoke handlers for the message's event type in subscription order.
    /// A panicking handler is isolated: logged, and the rest still run.
    fn dispatch(&self, message: &EventMessage) {
        let handlers: Vec<(u64, Handler)> = match self.handlers.read() {
            Ok(map) => map.get(&message.kind).cloned().unwrap_or_default(),
            Err(_) => return,
        };
        for (id, handler) in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(message))).is_err() {
                error!(
                    handler_id = id,
                    event = ?message.kind,
                    "Event handler panicked, continuing with remaining handlers"
                );
            }
        }
    }

    fn remove_handler(&self, kind: EventKind, id: u64) {
        if let Ok(mut map) = self.handlers.write() {
            if let Some(list) = map.get_mut(&kind) {
                list.retain(|(handler_id, _)| *handler_id != id);
            }
        }
    }
}

/// Handle returned by [`EventBus::subscribe`]; dropping it (or calling
/// [`Subscription::unsubscribe`]) removes the handler.
pub struct Subscription {
    kind: EventKind,
    id: u64,
    inner: Weak<BusInner>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.remove_handler(self.kind, self.id);
        }
    }
}

/// The reconnecting publish/subscribe bus.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Bus over the given source. Starts Disconnected; call
    /// [`EventBus::connect`] to bring it up.
    pub fn new(source: Arc<dyn EventSource>) -> Self {
        Self {
            inner: Arc::new(BusInner {
                source,
                state: RwLock::new(BusState::Disconnected),
                handlers: RwLock::new(HashMap::new()),
                next_handler_id: AtomicU64::new(1),
                cancel: Mutex::new(None),
            }),
        }
    }

    /// Bus over a WebSocket endpoint.
    pub fn over_websocket(url: impl Into<String>) -> Self {
        Self::new(Arc::new(WebSocketSource::new(url)))
    }

    /// Current connection state.
    pub fn state(&self) -> BusState {
        self.inner
            .state
            .read()
            .map(|s| *s)
            .unwrap_or(BusState::Disconnected)
    }

    pub fn is_connected(&self) -> bool {
        self.state() == BusState::Connected
    }

    /// Start the connect/reconnect loop. A no-op when the loop is already
    /// running; after the retry ceiling was exhausted this starts a fresh
    /// round of attempts.
    pub fn connect(&self) {
        let mut slot = match self.inner.cancel.lock() {
            Ok(slot) => slot,
            Err(_) => return,
        };
        if let Some(token) = slot.as_ref() {
            if !token.is_cancelled() {
                return;
            }
        }
        let token = CancellationToken::new();
        *slot = Some(token.clone());
        drop(slot);

        self.inner.set_state(BusState::Connecting);
        let inner = Arc::clone(&self.inner);
        tokio::spawn(run_loop(inner, token));
    }

    /// Stop the bus and cancel any pending reconnect timer. Idempotent.
    pub fn disconnect(&self) {
        if let Ok(mut slot) = self.inner.cancel.lock() {
            if let Some(token) = slot.take() {
                token.cancel();
            }
        }
        self.inner.set_state(BusState::Disconnected);
    }

    /// Register a handler for one event type. Handlers for a type run in
    /// subscription order.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&EventMessage) + Send + Sync + 'static,
    {
        let id = self.inner.next_handler_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut map) = self.inner.handlers.write() {
            map.entry(kind).or_default().push((id, Arc::new(handler)));
        }
        Subscription {
            kind,
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Inject an event as if the server had pushed it. Used by tests and
    /// mock deployments; dispatch is synchronous.
    pub fn publish_local(&self, kind: EventKind, data: serde_json::Value) {
        self.inner.dispatch(&EventMessage::new(kind, data));
    }
}

/// Delay before reconnect attempt `attempt` (1-based): bounded exponential,
/// so each retry waits at least as long as the previous one.
fn backoff_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(defaults::BUS_MAX_BACKOFF_EXPONENT);
    let ms = (defaults::BUS_RECONNECT_BASE_DELAY_MS << exponent)
        .min(defaults::BUS_RECONNECT_MAX_DELAY_MS);
    Duration::from_millis(ms)
}

async fn run_loop(inner: Arc<BusInner>, cancel: CancellationToken) {
    let mut consecutive_failures: u32 = 0;

    loop {
        inner.set_state(BusState::Connecting);

        let connected = tokio::select! {
            _ = cancel.cancelled() => {
                inner.set_state(BusState::Disconnected);
                return;
            }
            result = inner.source.connect() => result,
        };

        match connected {
            Ok(mut rx) => {
                consecutive_failures = 0;
                inner.set_state(BusState::Connected);
                info!("Event bus connected");

                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            inner.set_state(BusState::Disconnected);
                            return;
                        }
                        message = rx.recv() => match message {
                            Some(message) => inner.dispatch(&message),
                            None => {
                                warn!("Event bus transport dropped, reconnecting");
                                break;
                            }
                        }
                    }
                }
                inner.set_state(BusState::Disconnected);
            }
            Err(e) => {
                consecutive_failures = consecutive_failures.saturating_add(1);
                if consecutive_failures >= defaults::BUS_MAX_RECONNECT_ATTEMPTS {
                    // Exhaustion is reported once, not per attempt.
                    warn!(
                        error = %e,
                        attempts = consecutive_failures,
                        "Event bus retry ceiling exhausted, staying disconnected"
                    );
                    inner.set_state(BusState::Disconnected);
                    // Mark the loop dead so a later connect() starts fresh.
                    cancel.cancel();
                    return;
                }

                let delay = backoff_delay(consecutive_failures);
                warn!(
                    error = %e,
                    attempt = consecutive_failures,
                    next_retry_ms = delay.as_millis() as u64,
                    "Event bus connect failed, backing off"
                );
                tokio::select! {
                    _ = cancel.cancelled() => {
                        inner.set_state(BusState::Disconnected);
                        return;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}
