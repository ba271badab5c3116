//! The transport seam — a duplex text-frame channel opened from a URL.
//!
//! The send and receive halves are independent so the read loop can block on
//! [`FrameSource::next_frame`] while writers use the [`FrameSink`].

use async_trait::async_trait;

use crate::error::TransportError;

/// Outbound half of an open connection.
#[async_trait]
pub trait FrameSink: Send + Sync + 'static {
    /// Write one complete text frame.
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Close the connection. Must be idempotent.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Inbound half of an open connection.
#[async_trait]
pub trait FrameSource: Send + 'static {
    /// Wait for the next text frame.
    ///
    /// An orderly close is reported as [`TransportError::Closed`].
    async fn next_frame(&mut self) -> Result<String, TransportError>;
}

/// Both halves of a freshly opened connection.
pub struct Connection {
    pub sink: Box<dyn FrameSink>,
    pub source: Box<dyn FrameSource>,
}

impl Connection {
    pub fn new(sink: impl FrameSink, source: impl FrameSource) -> Self {
        Self {
            sink: Box::new(sink),
            source: Box::new(source),
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

/// Opens connections to an endpoint.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; the client keeps one behind an
/// `Arc` and calls it from reconnect tasks.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn open(&self, url: &str) -> Result<Connection, TransportError>;
}
