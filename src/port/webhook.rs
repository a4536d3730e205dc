//! Webhook delivery port.

use async_trait::async_trait;
use serde_json::Value;

/// Result of one delivery attempt.
///
/// Deliberately not a `Result`: any HTTP response, including 4xx/5xx, is
/// a completed attempt; only a transport failure (connect error, timeout)
/// is `Failed`. Either way the caller records exactly one audit row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// A response was received; its status code is recorded verbatim.
    Completed { response_status: u16 },
    /// No response: network error or timeout.
    Failed { error: String },
}

/// Delivers one event payload to a subscriber-supplied callback URL.
#[async_trait]
pub trait WebhookSink: Send + Sync {
    /// POST the JSON payload to `url` with a bounded timeout.
    async fn deliver(&self, url: &str, payload: &Value) -> DeliveryOutcome;
}
