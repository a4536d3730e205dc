//! Webhook delivery over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::Value;
use tracing::warn;

use crate::config::WebhookConfig;
use crate::port::{DeliveryOutcome, WebhookSink};

/// Delivers event payloads to subscriber callback URLs via HTTP POST.
///
/// Any response counts as a completed attempt; only transport failures
/// (connect error, timeout, invalid URL) are reported as failed. The
/// sink never retries — the audit trail is the recovery mechanism.
pub struct HttpWebhookSink {
    http: HttpClient,
}

impl HttpWebhookSink {
    /// Create a sink with the given per-request timeout.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "Failed to build HTTP client, using defaults");
                HttpClient::new()
            });
        Self { http }
    }

    #[must_use]
    pub fn from_config(config: &WebhookConfig) -> Self {
        Self::new(Duration::from_millis(config.timeout_ms))
    }
}

#[async_trait]
impl WebhookSink for HttpWebhookSink {
    async fn deliver(&self, url: &str, payload: &Value) -> DeliveryOutcome {
        if let Err(err) = url::Url::parse(url) {
            return DeliveryOutcome::Failed {
                error: format!("invalid webhook URL: {err}"),
            };
        }

        match self.http.post(url).json(payload).send().await {
            Ok(response) => DeliveryOutcome::Completed {
                response_status: response.status().as_u16(),
            },
            Err(err) => DeliveryOutcome::Failed {
                error: err.to_string(),
            },
        }
    }
}
