//! Error types for the read-aloud client library.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Error type for read-aloud client operations.
///
/// Cloneable so a single failed handshake can be reported to every caller
/// that was waiting on it.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// WebSocket handshake or transport failure.
    #[error("WebSocket connection failed: {0}")]
    Connection(Arc<tungstenite::Error>),

    /// Handshake did not complete within the connect timeout.
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// Endpoint URL or header values could not form a handshake request.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An outbound frame could not be written.
    #[error("Failed to send frame: {0}")]
    Send(Arc<tungstenite::Error>),

    /// The connection closed while the request was outstanding.
    #[error("Connection closed: {reason} ({code})")]
    ConnectionClosed {
        /// WebSocket close code.
        code: u16,
        /// Close reason, empty if the peer gave none.
        reason: String,
    },

    /// No turn end arrived before the per-call deadline.
    #[error("Synthesis timed out after {0:?}")]
    Timeout(Duration),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(Arc<serde_json::Error>),

    /// Output format name not in the known table.
    #[error("Unknown output format: {0}")]
    UnknownFormat(String),
}

impl From<tungstenite::Error> for Error {
    fn from(err: tungstenite::Error) -> Self {
        Error::Connection(Arc::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(Arc::new(err))
    }
}
