//! Webhook delivery audit records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of a delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Success,
    Failed,
}

impl DeliveryStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Success => "success",
            DeliveryStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(DeliveryStatus::Success),
            "failed" => Ok(DeliveryStatus::Failed),
            other => Err(format!("unknown delivery status: {other}")),
        }
    }
}

/// Append-only audit record for one webhook delivery attempt.
///
/// Exactly one row is written per attempt, success or failure; this is
/// the durable record operators and reconciliation jobs rely on. Never
/// mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookDelivery {
    pub subscription_id: Uuid,
    pub event_id: i64,
    pub status: DeliveryStatus,
    /// HTTP status of the response, when one was received at all.
    pub response_status: Option<u16>,
    pub error_message: Option<String>,
    pub delivered_at: DateTime<Utc>,
}

impl WebhookDelivery {
    /// Record a completed attempt: any HTTP response, including 4xx/5xx.
    #[must_use]
    pub fn completed(subscription_id: Uuid, event_id: i64, response_status: u16) -> Self {
        Self {
            subscription_id,
            event_id,
            status: DeliveryStatus::Success,
            response_status: Some(response_status),
            error_message: None,
            delivered_at: Utc::now(),
        }
    }

    /// Record a failed attempt: network error or timeout, no response.
    #[must_use]
    pub fn failed(subscription_id: Uuid, event_id: i64, error: impl Into<String>) -> Self {
        Self {
            subscription_id,
            event_id,
            status: DeliveryStatus::Failed,
            response_status: None,
            error_message: Some(error.into()),
            delivered_at: Utc::now(),
        }
    }
}
