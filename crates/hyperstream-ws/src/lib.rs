//! hyperstream-ws — session engine for the Hyperion stream client.
//!
//! # Features
//! - Single read loop per session demultiplexing live, LIB and fork data
//! - Serialized writes: one outbound frame at a time
//! - Request ledger replayed in order on every reconnect
//! - Optional auto-reconnect with exponential backoff
//! - Per-client event bus with persistent and one-shot listeners

pub mod client;
mod dispatcher;
mod reconnect;
pub mod session;
pub mod transport;

pub use client::HyperionStreamClient;
pub use session::SessionStatus;
pub use transport::{WsConnector, WsSink, WsSource};
