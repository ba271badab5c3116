//! hyperstream-core — foundation types for the Hyperion stream client.
//!
//! # Overview
//!
//! The Hyperion history indexer streams chain actions and table deltas over
//! a long-lived WebSocket. This crate holds everything that does not depend
//! on a concrete socket implementation:
//!
//! - [`Connector`] / [`FrameSink`] / [`FrameSource`] — the duplex transport seam
//! - [`SubscriptionRequest`] / [`IncomingData`] — wire types
//! - [`RequestLedger`] — ordered record of accepted subscriptions for replay
//! - [`EventBus`] — named persistent and one-shot listeners
//! - [`DataQueues`] — live, irreversible and reversible data partitions
//! - [`ClientConfig`] — endpoint, cursor policy and reconnect backoff
//! - [`StreamError`] / [`TransportError`] / [`DecodeError`] — error taxonomy

pub mod config;
pub mod error;
pub mod events;
pub mod handler;
pub mod ledger;
pub mod message;
pub mod queue;
pub mod transport;

pub use config::{ClientConfig, CursorPolicy, ReconnectConfig, ReconnectPolicy};
pub use error::{DecodeError, StreamError, TransportError};
pub use events::EventBus;
pub use handler::{DataHandler, HandlerError};
pub use ledger::{RequestKind, RequestLedger, SavedRequest};
pub use message::{
    DataKind, FilterOp, IncomingData, RequestFilter, StreamActionsRequest, StreamDeltasRequest,
    SubscriptionRequest,
};
pub use queue::{DataQueues, QueueKind};
pub use transport::{Connection, Connector, FrameSink, FrameSource};
