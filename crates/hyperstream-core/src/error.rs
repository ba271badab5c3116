//! Error types for the stream client.

use thiserror::Error;

/// Errors returned to callers of the client API.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The client configuration is incomplete (e.g. no endpoint set).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The underlying transport failed to open or write.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A subscription was issued while the session is not online.
    #[error("client is not connected")]
    NotConnected,

    /// `connect()` was called while a session is connecting or online.
    #[error("client is already connected")]
    AlreadyConnected,

    /// A pending connect was superseded by `disconnect()`.
    #[error("connect cancelled by disconnect")]
    Cancelled,

    /// A request could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StreamError {
    /// Returns `true` if retrying the operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::NotConnected)
    }
}

/// Errors produced by a transport adapter.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Opening the connection failed.
    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    /// Writing a frame failed.
    #[error("send failed: {0}")]
    Send(String),

    /// Closing the connection failed.
    #[error("close failed: {0}")]
    Close(String),

    /// Reading a frame failed.
    #[error("receive failed: {0}")]
    Receive(String),

    /// The connection was closed, by either side.
    #[error("connection closed")]
    Closed,
}

/// A malformed inbound frame.
///
/// Always recovered inside the read loop; never surfaced to callers.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid JSON frame: {0}")]
    Json(#[from] serde_json::Error),
}
