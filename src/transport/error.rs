//! Error types for the real-time transport.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by the real-time connection.
///
/// Connection-level variants are retried by the reconnect policy and surface
/// on the connection status; they never interrupt the caller.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TransportError {
    /// The configured endpoint is not a usable URL.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The server could not be reached.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The Engine.IO or Socket.IO handshake did not complete.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// The server sent something that is not valid Socket.IO.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server refused the namespace connection.
    #[error("Server rejected connection: {0}")]
    Rejected(String),

    /// Nothing arrived from the server within the heartbeat window.
    #[error("No heartbeat from server within {0:?}")]
    PingTimeout(Duration),

    /// The event name is reserved by the protocol.
    #[error("Event name is reserved: {0}")]
    ReservedEvent(String),

    /// The payload could not be serialized.
    #[error("Payload could not be encoded: {0}")]
    Encode(String),

    /// The transport has been shut down.
    #[error("Transport is closed")]
    Closed,
}

/// Connection-level failure kind, as shown on the status indicator.
pub type ConnectionError = TransportError;

/// Convenience result alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

impl TransportError {
    /// Check if the reconnect policy should retry after this error.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connect(_)
                | Self::Handshake(_)
                | Self::Protocol(_)
                | Self::Rejected(_)
                | Self::PingTimeout(_)
        )
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(value: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Connect(value.to_string())
    }
}

impl From<url::ParseError> for TransportError {
    fn from(value: url::ParseError) -> Self {
        Self::InvalidEndpoint(value.to_string())
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(value: serde_json::Error) -> Self {
        Self::Protocol(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(TransportError::Connect("refused".into()).is_retryable());
        assert!(TransportError::PingTimeout(Duration::from_secs(1)).is_retryable());
        assert!(!TransportError::Closed.is_retryable());
        assert!(!TransportError::InvalidEndpoint("x".into()).is_retryable());
    }
}
