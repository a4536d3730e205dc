use std::collections::VecDeque;

use async_trait::async_trait;
use namewatch::port::{DeliveryOutcome, WebhookSink};
use parking_lot::Mutex;
use serde_json::Value;

/// A delivered payload captured by the recording sink.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub payload: Value,
}

/// Webhook sink that records every delivery and replays scripted
/// outcomes. When the script runs out, deliveries complete with 200.
#[derive(Default)]
pub struct RecordingSink {
    outcomes: Mutex<VecDeque<DeliveryOutcome>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_outcome(&self, outcome: DeliveryOutcome) {
        self.outcomes.lock().push_back(outcome);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl WebhookSink for RecordingSink {
    async fn deliver(&self, url: &str, payload: &Value) -> DeliveryOutcome {
        self.calls.lock().push(RecordedCall {
            url: url.to_string(),
            payload: payload.clone(),
        });
        self.outcomes
            .lock()
            .pop_front()
            .unwrap_or(DeliveryOutcome::Completed {
                response_status: 200,
            })
    }
}
