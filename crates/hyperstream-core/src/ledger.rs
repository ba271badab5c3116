//! Request ledger.
//!
//! Records every subscription the server accepted during the current
//! session so they can be re-issued, in the same order, after the connection
//! is re-established.

use crate::message::SubscriptionRequest;

/// Which stream a saved request subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Action,
    Delta,
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Action => write!(f, "action"),
            Self::Delta => write!(f, "delta"),
        }
    }
}

/// A subscription that was successfully written to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedRequest {
    pub kind: RequestKind,
    pub payload: SubscriptionRequest,
}

impl From<SubscriptionRequest> for SavedRequest {
    fn from(payload: SubscriptionRequest) -> Self {
        let kind = match &payload {
            SubscriptionRequest::Action(_) => RequestKind::Action,
            SubscriptionRequest::Delta(_) => RequestKind::Delta,
        };
        Self { kind, payload }
    }
}

/// Append-only, insertion-ordered list of saved requests.
///
/// Not synchronized on its own; the client keeps it under the same lock as
/// the outbound sink so recording and writing are one step.
#[derive(Debug, Clone, Default)]
pub struct RequestLedger {
    entries: Vec<SavedRequest>,
}

impl RequestLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request after it was written.
    pub fn record(&mut self, request: SubscriptionRequest) {
        self.entries.push(SavedRequest::from(request));
    }

    /// Iterate saved requests in issuance order.
    pub fn iter(&self) -> impl Iterator<Item = &SavedRequest> {
        self.entries.iter()
    }

    /// Forget every saved request.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ordered copy of the current entries.
    pub fn snapshot(&self) -> Vec<SavedRequest> {
        self.entries.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{StreamActionsRequest, StreamDeltasRequest};

    #[test]
    fn record_preserves_issuance_order() {
        let mut ledger = RequestLedger::new();
        ledger.record(StreamActionsRequest::new("eosio.token", "transfer").into());
        ledger.record(StreamDeltasRequest::new("eosio", "global").into());
        ledger.record(StreamActionsRequest::new("eosio", "*").into());

        let kinds: Vec<_> = ledger.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![RequestKind::Action, RequestKind::Delta, RequestKind::Action]
        );
        match &ledger.snapshot()[2].payload {
            SubscriptionRequest::Action(req) => assert_eq!(req.contract, "eosio"),
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[test]
    fn clear_empties_the_ledger() {
        let mut ledger = RequestLedger::new();
        ledger.record(StreamDeltasRequest::new("eosio", "global").into());
        assert_eq!(ledger.len(), 1);
        ledger.clear();
        assert!(ledger.is_empty());
    }
}
