//! Real-time connection to the Helix backend.
//!
//! Provides:
//! - Socket.IO v4 client over WebSocket
//! - Automatic reconnection per [`ReconnectPolicy`]
//! - Typed event subscriptions released on drop
//! - Buffered emits while disconnected
//! - Connection status for a non-blocking indicator

pub mod connector;
pub mod error;
pub mod packet;
pub mod policy;
pub mod registry;
mod supervisor;

pub use connector::{Connection, Connector, WebSocketConnector};
pub use error::{ConnectionError, TransportError, TransportResult};
pub use policy::ReconnectPolicy;
pub use registry::Subscription;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use url::Url;

use crate::config::TransportConfig;

use registry::{Handler, Registry};
use supervisor::Supervisor;

/// Fired with no payload when a session is established.
pub const CONNECT_EVENT: &str = "connect";
/// Fired with no payload when a session ends.
pub const DISCONNECT_EVENT: &str = "disconnect";
/// Assistant chat reply (string payload).
pub const AI_RESPONSE_EVENT: &str = "ai_response";
/// New task batch (`{tasks: [...]}` payload).
pub const WORKSPACE_UPDATE_EVENT: &str = "workspace_update";
/// Chat text typed by the user (string payload).
pub const USER_MESSAGE_EVENT: &str = "user_message";

/// Event names the client may not emit.
const RESERVED_EVENTS: &[&str] = &[
    CONNECT_EVENT,
    DISCONNECT_EVENT,
    "connect_error",
    "disconnecting",
    "newListener",
    "removeListener",
];

/// Whether the transport currently has a live session.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ConnectionState {
    /// A Socket.IO session is established.
    Connected,
    /// No session; reconnect attempts may be pending.
    #[default]
    Disconnected,
}

/// Snapshot published on every connection change.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConnectionStatus {
    /// Current state.
    pub state: ConnectionState,
    /// Socket.IO session id while connected.
    pub session_id: Option<String>,
    /// Reconnect attempts since the last successful session.
    pub attempts: u32,
    /// Most recent connection failure.
    pub last_error: Option<ConnectionError>,
    /// The reconnect policy gave up; no further attempts will be made.
    pub exhausted: bool,
}

impl ConnectionStatus {
    /// Whether a session is live.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

/// An event queued for the server.
#[derive(Clone, Debug, PartialEq)]
pub struct OutboundEvent {
    /// Event name.
    pub name: String,
    /// JSON payload.
    pub payload: Value,
}

/// Cloneable sending half of a transport.
///
/// Emits are queued and flushed in order once a session is live.
#[derive(Clone, Debug)]
pub struct Emitter {
    tx: mpsc::UnboundedSender<OutboundEvent>,
}

impl Emitter {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<OutboundEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue `event` with `payload` for the server.
    ///
    /// # Errors
    /// Returns an error for reserved event names, unserializable payloads, or
    /// when the transport has shut down.
    pub fn emit(&self, event: &str, payload: impl Serialize) -> TransportResult<()> {
        if RESERVED_EVENTS.contains(&event) {
            return Err(TransportError::ReservedEvent(event.to_string()));
        }
        let payload =
            serde_json::to_value(payload).map_err(|e| TransportError::Encode(e.to_string()))?;
        self.tx
            .send(OutboundEvent {
                name: event.to_string(),
                payload,
            })
            .map_err(|_| TransportError::Closed)
    }
}

/// Owned handle to the single real-time connection.
///
/// Created once at startup and passed to whatever needs it. The background
/// task stops on [`shutdown`](Self::shutdown) or when the handle is dropped.
pub struct TransportHandle {
    registry: Arc<Registry>,
    emitter: Emitter,
    status: watch::Receiver<ConnectionStatus>,
    shutdown: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl TransportHandle {
    /// Start connecting to the configured endpoint over WebSocket.
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    /// Returns an error if the endpoint is not a valid URL.
    pub fn spawn(config: &TransportConfig) -> TransportResult<Self> {
        Self::spawn_with(config, Arc::new(WebSocketConnector))
    }

    /// Start connecting through a custom connector.
    ///
    /// # Errors
    /// Returns an error if the endpoint is not a valid URL.
    pub fn spawn_with(
        config: &TransportConfig,
        connector: Arc<dyn Connector>,
    ) -> TransportResult<Self> {
        let endpoint = Url::parse(&config.endpoint)?;
        let registry = Arc::new(Registry::default());
        let (emitter, outbound) = Emitter::channel();
        let (status_tx, status) = watch::channel(ConnectionStatus::default());
        let shutdown = Arc::new(Notify::new());

        let supervisor = Supervisor {
            endpoint,
            connect_timeout: config.connect_timeout,
            policy: config.reconnect.clone(),
            connector,
            registry: Arc::clone(&registry),
            outbound,
            status: status_tx,
            shutdown: Arc::clone(&shutdown),
            pending: None,
        };
        tracing::info!(endpoint = %config.endpoint, "Starting Helix transport");
        let task = tokio::spawn(supervisor.run());

        Ok(Self {
            registry,
            emitter,
            status,
            shutdown,
            task: Some(task),
        })
    }

    /// Queue an event for the server.
    ///
    /// # Errors
    /// See [`Emitter::emit`].
    pub fn emit(&self, event: &str, payload: impl Serialize) -> TransportResult<()> {
        self.emitter.emit(event, payload)
    }

    /// A cloneable sender for this transport.
    #[must_use]
    pub fn emitter(&self) -> Emitter {
        self.emitter.clone()
    }

    /// Register `callback` for `event`, decoding the payload as `T`.
    ///
    /// Payloads that do not decode are logged and skipped. Callbacks run on
    /// the transport task one at a time, in arrival order.
    pub fn subscribe<T, F>(&self, event: impl Into<String>, callback: F) -> Subscription
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let event = event.into();
        let name = event.clone();
        let handler: Handler = Arc::new(move |payload: &Value| {
            match <T as Deserialize>::deserialize(payload) {
                Ok(decoded) => callback(decoded),
                Err(err) => {
                    tracing::warn!(event = %name, %err, "Dropping event with unexpected payload");
                }
            }
        });
        let id = self.registry.insert(&event, handler);
        Subscription::new(&self.registry, event, id)
    }

    /// Number of live subscriptions for `event`.
    #[must_use]
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.registry.count(event)
    }

    /// Latest connection status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    /// A receiver notified on every status change.
    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Whether a session is live.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status.borrow().is_connected()
    }

    /// Disconnect and wait for the background task to finish.
    pub async fn shutdown(mut self) {
        self.shutdown.notify_one();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                tracing::warn!(%err, "Transport task ended abnormally");
            }
        }
    }
}

impl Drop for TransportHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
