//! Subscription matching and webhook dispatch.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, error, warn};

use crate::domain::{DomainEvent, Subscription, WebhookDelivery};
use crate::port::{DeliveryOutcome, DeliveryStore, SubscriptionStore, WebhookSink};

/// Matches stored events against active subscriptions and delivers them.
///
/// Delivery is best-effort: a failed POST is recorded in the audit trail
/// and never blocks other subscriptions or the enclosing ingestion
/// cycle. Exactly one [`WebhookDelivery`] row is written per attempt.
pub struct Dispatcher {
    subscriptions: Arc<dyn SubscriptionStore>,
    deliveries: Arc<dyn DeliveryStore>,
    sink: Arc<dyn WebhookSink>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        subscriptions: Arc<dyn SubscriptionStore>,
        deliveries: Arc<dyn DeliveryStore>,
        sink: Arc<dyn WebhookSink>,
    ) -> Self {
        Self {
            subscriptions,
            deliveries,
            sink,
        }
    }

    /// Dispatch every event of a freshly stored page, in arrival order.
    ///
    /// Returns the total number of delivery attempts made.
    pub async fn dispatch_page(&self, events: &[DomainEvent]) -> usize {
        let mut attempts = 0;
        for event in events {
            attempts += self.dispatch_event(event).await;
        }
        attempts
    }

    /// Dispatch one event to every matching active subscription.
    pub async fn dispatch_event(&self, event: &DomainEvent) -> usize {
        let subscriptions = match self
            .subscriptions
            .active_for_event_type(&event.event_type)
            .await
        {
            Ok(subscriptions) => subscriptions,
            Err(err) => {
                warn!(
                    event_id = event.event_id,
                    error = %err,
                    "Failed to load subscriptions, skipping dispatch"
                );
                return 0;
            }
        };

        let now = Utc::now();
        let mut attempts = 0;

        for subscription in subscriptions.iter().filter(|s| s.matches(event, now)) {
            self.deliver_one(event, subscription).await;
            attempts += 1;
        }

        if attempts > 0 {
            debug!(
                event_id = event.event_id,
                attempts, "Dispatched event to subscribers"
            );
        }

        attempts
    }

    async fn deliver_one(&self, event: &DomainEvent, subscription: &Subscription) {
        let payload = delivery_payload(event, subscription);
        let outcome = self.sink.deliver(&subscription.webhook_url, &payload).await;

        let delivery = match &outcome {
            DeliveryOutcome::Completed { response_status } => {
                WebhookDelivery::completed(subscription.id, event.event_id, *response_status)
            }
            DeliveryOutcome::Failed { error } => {
                warn!(
                    event_id = event.event_id,
                    subscription_id = %subscription.id,
                    error = %error,
                    "Webhook delivery failed"
                );
                WebhookDelivery::failed(subscription.id, event.event_id, error.clone())
            }
        };

        // The audit row is the durable record; losing it is worth an
        // error-level log even though the cycle keeps going.
        if let Err(err) = self.deliveries.record(&delivery).await {
            error!(
                event_id = event.event_id,
                subscription_id = %subscription.id,
                error = %err,
                "Failed to record delivery attempt"
            );
        }
    }
}

/// The JSON body POSTed to the subscriber's callback URL.
fn delivery_payload(event: &DomainEvent, subscription: &Subscription) -> serde_json::Value {
    json!({
        "subscriptionId": subscription.id,
        "event": {
            "id": event.event_id,
            "name": event.name,
            "type": event.event_type,
            "tokenId": event.token_id,
            "uniqueId": event.unique_id,
            "relayId": event.relay_id,
            "data": event.event_data,
            "createdAt": event.created_at.to_rfc3339(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::memory::MemoryStore;
    use crate::domain::{DeliveryStatus, SubscriptionFilters};
    use crate::port::SubscriptionStore as _;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;
    use serde_json::json;

    /// Sink that returns scripted outcomes and records every call.
    struct ScriptedSink {
        outcomes: Mutex<Vec<DeliveryOutcome>>,
        calls: Mutex<Vec<(String, serde_json::Value)>>,
    }

    impl ScriptedSink {
        fn completing(status: u16) -> Self {
            Self {
                outcomes: Mutex::new(vec![DeliveryOutcome::Completed {
                    response_status: status,
                }]),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with_outcomes(outcomes: Vec<DeliveryOutcome>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl WebhookSink for ScriptedSink {
        async fn deliver(&self, url: &str, payload: &serde_json::Value) -> DeliveryOutcome {
            self.calls.lock().push((url.to_string(), payload.clone()));
            let mut outcomes = self.outcomes.lock();
            if outcomes.len() > 1 {
                outcomes.remove(0)
            } else {
                outcomes
                    .first()
                    .cloned()
                    .unwrap_or(DeliveryOutcome::Completed {
                        response_status: 200,
                    })
            }
        }
    }

    fn sale(id: i64, name: &str, price: i64) -> DomainEvent {
        DomainEvent {
            event_id: id,
            name: name.into(),
            token_id: None,
            unique_id: None,
            relay_id: None,
            event_type: "SALE".into(),
            event_data: json!({"price": price}),
            created_at: Utc::now(),
            processed: false,
        }
    }

    async fn store_with_subscription(filters: SubscriptionFilters) -> (Arc<MemoryStore>, Subscription) {
        let store = Arc::new(MemoryStore::new());
        let subscription =
            Subscription::new("user-1", "SALE", "https://hooks.example/cb", filters);
        store.upsert(&subscription).await.unwrap();
        (store, subscription)
    }

    #[tokio::test]
    async fn matching_event_is_delivered_and_audited() {
        let (store, subscription) = store_with_subscription(SubscriptionFilters {
            min_price: Some(dec!(500)),
            ..Default::default()
        })
        .await;
        let sink = Arc::new(ScriptedSink::completing(200));
        let dispatcher = Dispatcher::new(store.clone(), store.clone(), sink.clone());

        let attempts = dispatcher.dispatch_event(&sale(1, "foo.com", 600)).await;
        assert_eq!(attempts, 1);

        let calls = sink.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "https://hooks.example/cb");
        assert_eq!(calls[0].1["event"]["id"], 1);

        let audit = store.deliveries();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].subscription_id, subscription.id);
        assert_eq!(audit[0].status, DeliveryStatus::Success);
        assert_eq!(audit[0].response_status, Some(200));
    }

    #[tokio::test]
    async fn non_matching_event_is_not_delivered() {
        let (store, _) = store_with_subscription(SubscriptionFilters {
            min_price: Some(dec!(500)),
            ..Default::default()
        })
        .await;
        let sink = Arc::new(ScriptedSink::completing(200));
        let dispatcher = Dispatcher::new(store.clone(), store.clone(), sink.clone());

        let attempts = dispatcher.dispatch_event(&sale(1, "foo.com", 400)).await;
        assert_eq!(attempts, 0);
        assert!(sink.calls.lock().is_empty());
        assert!(store.deliveries().is_empty());
    }

    #[tokio::test]
    async fn error_responses_still_count_as_attempts() {
        let (store, _) = store_with_subscription(SubscriptionFilters::default()).await;
        let sink = Arc::new(ScriptedSink::completing(500));
        let dispatcher = Dispatcher::new(store.clone(), store.clone(), sink);

        dispatcher.dispatch_event(&sale(1, "foo.com", 600)).await;

        let audit = store.deliveries();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].status, DeliveryStatus::Success);
        assert_eq!(audit[0].response_status, Some(500));
    }

    #[tokio::test]
    async fn failed_delivery_is_audited_and_does_not_block_others() {
        let store = Arc::new(MemoryStore::new());
        let first = Subscription::new(
            "user-1",
            "SALE",
            "https://hooks.example/a",
            SubscriptionFilters::default(),
        );
        let second = Subscription::new(
            "user-2",
            "SALE",
            "https://hooks.example/b",
            SubscriptionFilters::default(),
        );
        store.upsert(&first).await.unwrap();
        store.upsert(&second).await.unwrap();

        let sink = Arc::new(ScriptedSink::with_outcomes(vec![
            DeliveryOutcome::Failed {
                error: "connection refused".into(),
            },
            DeliveryOutcome::Completed {
                response_status: 200,
            },
        ]));
        let dispatcher = Dispatcher::new(store.clone(), store.clone(), sink.clone());

        let attempts = dispatcher.dispatch_event(&sale(1, "foo.com", 600)).await;
        assert_eq!(attempts, 2);
        assert_eq!(sink.calls.lock().len(), 2);

        let audit = store.deliveries();
        assert_eq!(audit.len(), 2);
        assert_eq!(
            audit
                .iter()
                .filter(|d| d.status == DeliveryStatus::Failed)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn dispatch_page_walks_events_in_order() {
        let (store, _) = store_with_subscription(SubscriptionFilters::default()).await;
        let sink = Arc::new(ScriptedSink::completing(200));
        let dispatcher = Dispatcher::new(store.clone(), store.clone(), sink.clone());

        let attempts = dispatcher
            .dispatch_page(&[sale(1, "foo.com", 100), sale(2, "bar.com", 200)])
            .await;
        assert_eq!(attempts, 2);

        let calls = sink.calls.lock();
        assert_eq!(calls[0].1["event"]["id"], 1);
        assert_eq!(calls[1].1["event"]["id"], 2);
    }
}
