//! Wire types exchanged with the Hyperion stream endpoint.
//!
//! Outbound subscriptions are an internally tagged envelope:
//! `{"type":"action", "contract":..., ...}`. Inbound frames carry a `type`
//! tag, a `block_num` and an opaque `data` payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DecodeError;

/// A single `field == value` filter on action data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFilter {
    pub field: String,
    pub value: String,
}

impl RequestFilter {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// How multiple filters combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    And,
    Or,
}

/// Subscription to contract actions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreamActionsRequest {
    /// Contract account the action belongs to (`eosio.token`).
    pub contract: String,
    /// Notified account; empty matches any.
    #[serde(default)]
    pub account: String,
    /// Action name; `*` matches any.
    pub action: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<RequestFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_op: Option<FilterOp>,
    /// First block to stream. `0` streams live data only.
    #[serde(default)]
    pub start_from: i64,
    /// Last block to stream. `0` streams indefinitely.
    #[serde(default)]
    pub read_until: i64,
}

impl StreamActionsRequest {
    pub fn new(contract: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            contract: contract.into(),
            action: action.into(),
            ..Self::default()
        }
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = account.into();
        self
    }

    pub fn with_filter(mut self, filter: RequestFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_filter_op(mut self, op: FilterOp) -> Self {
        self.filter_op = Some(op);
        self
    }

    pub fn with_range(mut self, start_from: i64, read_until: i64) -> Self {
        self.start_from = start_from;
        self.read_until = read_until;
        self
    }
}

/// Subscription to contract table deltas.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreamDeltasRequest {
    /// Contract owning the table.
    pub code: String,
    pub table: String,
    /// Table scope; `*` matches any.
    #[serde(default)]
    pub scope: String,
    /// RAM payer; empty matches any.
    #[serde(default)]
    pub payer: String,
    #[serde(default)]
    pub start_from: i64,
    #[serde(default)]
    pub read_until: i64,
}

impl StreamDeltasRequest {
    pub fn new(code: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            table: table.into(),
            ..Self::default()
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_payer(mut self, payer: impl Into<String>) -> Self {
        self.payer = payer.into();
        self
    }

    pub fn with_range(mut self, start_from: i64, read_until: i64) -> Self {
        self.start_from = start_from;
        self.read_until = read_until;
        self
    }
}

/// Outbound subscription envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubscriptionRequest {
    Action(StreamActionsRequest),
    Delta(StreamDeltasRequest),
}

impl SubscriptionRequest {
    /// Serialize into a single text frame.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<StreamActionsRequest> for SubscriptionRequest {
    fn from(req: StreamActionsRequest) -> Self {
        Self::Action(req)
    }
}

impl From<StreamDeltasRequest> for SubscriptionRequest {
    fn from(req: StreamDeltasRequest) -> Self {
        Self::Delta(req)
    }
}

/// Classification of an inbound frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataKind {
    Action,
    Delta,
    LibUpdate,
    ForkNotice,
    /// Control, acknowledgement or unknown message; keeps the raw tag.
    Other(String),
}

impl DataKind {
    /// Map a wire `type` tag to a kind. Accepts the long trace/event forms.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "action" | "action_trace" => Self::Action,
            "delta" | "delta_trace" => Self::Delta,
            "lib_update" => Self::LibUpdate,
            "fork" | "fork_event" => Self::ForkNotice,
            other => Self::Other(other.to_string()),
        }
    }

    /// Name under which items of this kind fire on the event bus.
    pub fn event_name(&self) -> &str {
        match self {
            Self::Action => "action",
            Self::Delta => "delta",
            Self::LibUpdate => "lib_update",
            Self::ForkNotice => "fork",
            Self::Other(tag) => tag,
        }
    }

    /// `true` for live chain data (actions and deltas).
    pub fn is_chain_data(&self) -> bool {
        matches!(self, Self::Action | Self::Delta)
    }
}

impl std::fmt::Display for DataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.event_name())
    }
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    tag: String,
    #[serde(default)]
    block_num: u64,
    #[serde(default)]
    data: Value,
}

impl From<RawFrame> for IncomingData {
    fn from(raw: RawFrame) -> Self {
        Self {
            kind: DataKind::from_tag(&raw.tag),
            block_num: raw.block_num,
            content: raw.data,
        }
    }
}

/// A decoded inbound message. Immutable once decoded.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawFrame")]
pub struct IncomingData {
    pub kind: DataKind,
    pub block_num: u64,
    pub content: Value,
}

impl IncomingData {
    /// Decode a raw text frame.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_request_serializes_with_type_tag() {
        let req: SubscriptionRequest = StreamActionsRequest::new("eosio.token", "transfer")
            .with_account("alice")
            .with_filter(RequestFilter::new("@transfer.to", "bob"))
            .with_range(100, 0)
            .into();
        let json: Value = serde_json::from_str(&req.to_frame().unwrap()).unwrap();
        assert_eq!(json["type"], "action");
        assert_eq!(json["contract"], "eosio.token");
        assert_eq!(json["account"], "alice");
        assert_eq!(json["filters"][0]["field"], "@transfer.to");
        assert_eq!(json["start_from"], 100);
        assert!(json.get("filter_op").is_none());
    }

    #[test]
    fn delta_request_serializes_with_type_tag() {
        let req: SubscriptionRequest = StreamDeltasRequest::new("eosio.token", "accounts")
            .with_scope("alice")
            .into();
        let json: Value = serde_json::from_str(&req.to_frame().unwrap()).unwrap();
        assert_eq!(json["type"], "delta");
        assert_eq!(json["table"], "accounts");
        assert_eq!(json["scope"], "alice");
    }

    #[test]
    fn decode_classifies_known_tags() {
        let cases = [
            (r#"{"type":"action","block_num":5,"data":{}}"#, DataKind::Action),
            (r#"{"type":"delta_trace","block_num":5}"#, DataKind::Delta),
            (r#"{"type":"lib_update","block_num":4}"#, DataKind::LibUpdate),
            (r#"{"type":"fork_event","block_num":3}"#, DataKind::ForkNotice),
        ];
        for (frame, kind) in cases {
            assert_eq!(IncomingData::decode(frame).unwrap().kind, kind, "{frame}");
        }
    }

    #[test]
    fn decode_keeps_unknown_tag() {
        let item = IncomingData::decode(r#"{"type":"ack","data":{"reqId":1}}"#).unwrap();
        assert_eq!(item.kind, DataKind::Other("ack".into()));
        assert_eq!(item.kind.event_name(), "ack");
        assert_eq!(item.block_num, 0);
        assert_eq!(item.content["reqId"], 1);
    }

    #[test]
    fn decode_rejects_malformed_frames() {
        assert!(IncomingData::decode("not json").is_err());
        assert!(IncomingData::decode(r#"{"block_num":1}"#).is_err());
        assert!(IncomingData::decode(r#"{"type":"action","block_num":"x"}"#).is_err());
    }
}
