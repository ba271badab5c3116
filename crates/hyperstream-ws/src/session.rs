//! Session state and the outbound half of a session.
//!
//! [`SessionState`] holds the fields every task reads without locking:
//! status, generation and block cursors. [`Outbound`] owns the sink and the
//! request ledger; it lives behind the client's single write lock, so frames
//! never interleave and the ledger always matches what was written.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};

use parking_lot::RwLock;
use tracing::{debug, warn};

use hyperstream_core::config::CursorPolicy;
use hyperstream_core::error::StreamError;
use hyperstream_core::ledger::RequestLedger;
use hyperstream_core::message::SubscriptionRequest;
use hyperstream_core::transport::FrameSink;

/// Connection status of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Offline,
    Connecting,
    Online,
}

impl SessionStatus {
    fn to_u8(self) -> u8 {
        match self {
            Self::Offline => 0,
            Self::Connecting => 1,
            Self::Online => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Online,
            _ => Self::Offline,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Offline => write!(f, "offline"),
            Self::Connecting => write!(f, "connecting"),
            Self::Online => write!(f, "online"),
        }
    }
}

/// Lock-free session fields.
///
/// Status is only written while the outbound lock is held, so a writer that
/// observes `Online` under that lock also sees a live sink.
#[derive(Debug)]
pub(crate) struct SessionState {
    endpoint: RwLock<Option<String>>,
    status: AtomicU8,
    generation: AtomicU64,
    last_received_block: AtomicU64,
    last_irreversible_block: AtomicU64,
    ever_connected: AtomicBool,
}

impl SessionState {
    pub(crate) fn new(endpoint: Option<String>) -> Self {
        Self {
            endpoint: RwLock::new(endpoint),
            status: AtomicU8::new(SessionStatus::Offline.to_u8()),
            generation: AtomicU64::new(0),
            last_received_block: AtomicU64::new(0),
            last_irreversible_block: AtomicU64::new(0),
            ever_connected: AtomicBool::new(false),
        }
    }

    pub(crate) fn endpoint(&self) -> Option<String> {
        self.endpoint.read().clone()
    }

    pub(crate) fn set_endpoint(&self, endpoint: String) {
        *self.endpoint.write() = Some(endpoint);
    }

    pub(crate) fn status(&self) -> SessionStatus {
        SessionStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub(crate) fn set_status(&self, status: SessionStatus) {
        self.status.store(status.to_u8(), Ordering::Release);
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Start a new generation, fencing off every task tied to the old one.
    pub(crate) fn advance_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }

    pub(crate) fn observe_block(&self, block_num: u64) {
        self.last_received_block.fetch_max(block_num, Ordering::AcqRel);
    }

    pub(crate) fn observe_lib(&self, block_num: u64) {
        self.last_irreversible_block.fetch_max(block_num, Ordering::AcqRel);
    }

    pub(crate) fn last_received_block(&self) -> u64 {
        self.last_received_block.load(Ordering::Acquire)
    }

    pub(crate) fn last_irreversible_block(&self) -> u64 {
        self.last_irreversible_block.load(Ordering::Acquire)
    }

    pub(crate) fn reset_cursors(&self) {
        self.last_received_block.store(0, Ordering::Release);
        self.last_irreversible_block.store(0, Ordering::Release);
    }

    /// Apply the cursor policy for a connect that just succeeded.
    pub(crate) fn prepare_cursor(&self, policy: CursorPolicy) {
        let first_connect = !self.ever_connected.swap(true, Ordering::AcqRel);
        if first_connect || policy == CursorPolicy::Restart {
            self.last_received_block.store(0, Ordering::Release);
        }
    }
}

/// The sink of the current session plus the ledger of accepted requests.
#[derive(Default)]
pub(crate) struct Outbound {
    sink: Option<Box<dyn FrameSink>>,
    ledger: RequestLedger,
}

impl Outbound {
    pub(crate) fn attach(&mut self, sink: Box<dyn FrameSink>) {
        self.sink = Some(sink);
    }

    pub(crate) fn ledger(&self) -> &RequestLedger {
        &self.ledger
    }

    pub(crate) fn clear_ledger(&mut self) {
        self.ledger.clear();
    }

    /// Write a subscription and record it. The ledger is untouched when the
    /// write fails.
    pub(crate) async fn subscribe(&mut self, request: SubscriptionRequest) -> Result<(), StreamError> {
        let sink = self.sink.as_mut().ok_or(StreamError::NotConnected)?;
        let frame = request.to_frame()?;
        sink.send(frame).await?;
        self.ledger.record(request);
        Ok(())
    }

    /// Re-send every ledger entry in order. A failed entry is logged and
    /// skipped; it stays in the ledger for the next reconnect. Returns the
    /// number of entries written.
    pub(crate) async fn replay(&mut self) -> usize {
        let Some(sink) = self.sink.as_mut() else {
            return 0;
        };
        let mut sent = 0;
        for (index, entry) in self.ledger.iter().enumerate() {
            let frame = match entry.payload.to_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(index, kind = %entry.kind, error = %e, "skipping unserializable saved request");
                    continue;
                }
            };
            match sink.send(frame).await {
                Ok(()) => sent += 1,
                Err(e) => {
                    warn!(index, kind = %entry.kind, error = %e, "replay of saved request failed");
                }
            }
        }
        sent
    }

    /// Close and drop the sink. Close errors are swallowed.
    pub(crate) async fn close(&mut self) {
        if let Some(mut sink) = self.sink.take() {
            if let Err(e) = sink.close().await {
                debug!(error = %e, "ignoring error while closing transport");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_atomic() {
        let state = SessionState::new(None);
        assert_eq!(state.status(), SessionStatus::Offline);
        state.set_status(SessionStatus::Connecting);
        assert_eq!(state.status(), SessionStatus::Connecting);
        state.set_status(SessionStatus::Online);
        assert_eq!(state.status(), SessionStatus::Online);
    }

    #[test]
    fn generations_fence_stale_tasks() {
        let state = SessionState::new(None);
        let first = state.advance_generation();
        assert!(state.is_current(first));
        let second = state.advance_generation();
        assert!(!state.is_current(first));
        assert!(state.is_current(second));
    }

    #[test]
    fn block_cursor_only_moves_forward() {
        let state = SessionState::new(None);
        state.observe_block(10);
        state.observe_block(7);
        assert_eq!(state.last_received_block(), 10);
        state.reset_cursors();
        assert_eq!(state.last_received_block(), 0);
    }

    #[test]
    fn resume_policy_keeps_cursor_after_first_connect() {
        let state = SessionState::new(None);
        state.observe_block(42);
        state.prepare_cursor(CursorPolicy::Resume);
        assert_eq!(state.last_received_block(), 0);

        state.observe_block(50);
        state.prepare_cursor(CursorPolicy::Resume);
        assert_eq!(state.last_received_block(), 50);

        state.prepare_cursor(CursorPolicy::Restart);
        assert_eq!(state.last_received_block(), 0);
    }

    #[tokio::test]
    async fn subscribe_without_sink_is_not_connected() {
        let mut outbound = Outbound::default();
        let err = outbound
            .subscribe(hyperstream_core::StreamDeltasRequest::new("eosio", "global").into())
            .await
            .unwrap_err();
        assert!(matches!(err, StreamError::NotConnected));
        assert!(outbound.ledger().is_empty());
        assert_eq!(outbound.replay().await, 0);
    }
}
