//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What happens to the block cursor when a session is re-established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorPolicy {
    /// Keep the last received block across reconnects.
    #[default]
    Resume,
    /// Zero the last received block on every successful connect.
    Restart,
}

/// Automatic reconnect settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Reconnect automatically after the connection drops.
    #[serde(default)]
    pub enabled: bool,
    /// Delay before the first attempt, in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Upper bound on the delay between attempts, in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Multiplier applied to the delay after each failed attempt.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Give up after this many failed attempts (`None` = never).
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

fn default_initial_backoff_ms() -> u64 { 500 }
fn default_max_backoff_ms() -> u64 { 60_000 }
fn default_multiplier() -> f64 { 2.0 }

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            multiplier: default_multiplier(),
            max_attempts: None,
        }
    }
}

impl ReconnectConfig {
    pub fn policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            multiplier: self.multiplier,
            max_attempts: self.max_attempts,
        }
    }
}

/// Exponential backoff schedule for reconnect attempts.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
    pub max_attempts: Option<u32>,
}

impl ReconnectPolicy {
    /// Delay before the `attempt`-th reconnect (1-based), or `None` once the
    /// attempt budget is exhausted.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || self.max_attempts.is_some_and(|max| attempt > max) {
            return None;
        }
        let base_ms = self.initial_backoff.as_millis() as f64
            * self.multiplier.powi(attempt.saturating_sub(1).min(64) as i32);
        let capped = base_ms.min(self.max_backoff.as_millis() as f64);
        Some(Duration::from_millis(capped as u64))
    }
}

/// Configuration bundle for a stream client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// WebSocket endpoint, e.g. `"wss://eos.hyperion.example/stream"`.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub cursor_policy: CursorPolicy,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            ..Self::default()
        }
    }

    pub fn with_cursor_policy(mut self, policy: CursorPolicy) -> Self {
        self.cursor_policy = policy;
        self
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Load from a JSON document; absent fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_defaults_fill_missing_fields() {
        let config = ClientConfig::from_json(r#"{"endpoint":"ws://localhost:7000"}"#).unwrap();
        assert_eq!(config.endpoint.as_deref(), Some("ws://localhost:7000"));
        assert_eq!(config.cursor_policy, CursorPolicy::Resume);
        assert!(!config.reconnect.enabled);
        assert_eq!(config.reconnect.initial_backoff_ms, 500);
    }

    #[test]
    fn json_overrides() {
        let config = ClientConfig::from_json(
            r#"{"cursor_policy":"restart","reconnect":{"enabled":true,"max_attempts":3}}"#,
        )
        .unwrap();
        assert!(config.endpoint.is_none());
        assert_eq!(config.cursor_policy, CursorPolicy::Restart);
        assert!(config.reconnect.enabled);
        assert_eq!(config.reconnect.max_attempts, Some(3));
        assert_eq!(config.reconnect.max_backoff_ms, 60_000);
    }

    #[test]
    fn backoff_grows_then_caps() {
        let policy = ReconnectConfig {
            initial_backoff_ms: 100,
            max_backoff_ms: 500,
            ..Default::default()
        }
        .policy();
        assert_eq!(policy.next_delay(1), Some(Duration::from_millis(100)));
        assert_eq!(policy.next_delay(2), Some(Duration::from_millis(200)));
        assert_eq!(policy.next_delay(3), Some(Duration::from_millis(400)));
        assert_eq!(policy.next_delay(4), Some(Duration::from_millis(500)));
        assert_eq!(policy.next_delay(40), Some(Duration::from_millis(500)));
    }

    #[test]
    fn backoff_respects_attempt_budget() {
        let policy = ReconnectConfig {
            max_attempts: Some(2),
            ..Default::default()
        }
        .policy();
        assert!(policy.next_delay(2).is_some());
        assert!(policy.next_delay(3).is_none());
    }
}
