//! In-memory store implementing every persistence port.
//!
//! Used by tests and ephemeral runs. Semantics mirror the SQLite
//! adapter: events are immutable once stored, deliveries append-only,
//! traits derived once.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::{
    DomainAnalytics, DomainEvent, DomainTraits, Subscription, WebhookDelivery,
};
use crate::error::Result;
use crate::port::{
    AnalyticsStore, CursorStore, DeliveryStore, EventStore, SubscriptionStore, TraitsStore,
};

/// In-memory store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    events: RwLock<BTreeMap<i64, DomainEvent>>,
    cursor: RwLock<Option<i64>>,
    subscriptions: RwLock<HashMap<uuid::Uuid, Subscription>>,
    deliveries: RwLock<Vec<WebhookDelivery>>,
    analytics: RwLock<HashMap<String, DomainAnalytics>>,
    traits: RwLock<HashMap<String, DomainTraits>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored events, for test assertions.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.read().len()
    }

    /// All recorded deliveries, for test assertions.
    #[must_use]
    pub fn deliveries(&self) -> Vec<WebhookDelivery> {
        self.deliveries.read().clone()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn upsert_events(&self, events: &[DomainEvent]) -> Result<usize> {
        let mut stored = self.events.write();
        let mut written = 0;
        for event in events {
            // Immutable once stored: redelivery is a no-op.
            if !stored.contains_key(&event.event_id) {
                stored.insert(event.event_id, event.clone());
                written += 1;
            }
        }
        Ok(written)
    }

    async fn get_event(&self, event_id: i64) -> Result<Option<DomainEvent>> {
        Ok(self.events.read().get(&event_id).cloned())
    }

    async fn load_unprocessed(&self, limit: usize) -> Result<Vec<DomainEvent>> {
        let events = self.events.read();
        let mut unprocessed: Vec<DomainEvent> =
            events.values().filter(|e| !e.processed).cloned().collect();
        unprocessed.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.event_id.cmp(&b.event_id))
        });
        unprocessed.truncate(limit);
        Ok(unprocessed)
    }

    async fn mark_processed(&self, event_ids: &[i64]) -> Result<()> {
        let mut events = self.events.write();
        for id in event_ids {
            if let Some(event) = events.get_mut(id) {
                event.processed = true;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CursorStore for MemoryStore {
    async fn load(&self) -> Result<Option<i64>> {
        Ok(*self.cursor.read())
    }

    async fn save(&self, last_event_id: i64) -> Result<()> {
        *self.cursor.write() = Some(last_event_id);
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn active_for_event_type(&self, event_type: &str) -> Result<Vec<Subscription>> {
        Ok(self
            .subscriptions
            .read()
            .values()
            .filter(|s| s.is_active && s.event_type == event_type)
            .cloned()
            .collect())
    }

    async fn upsert(&self, subscription: &Subscription) -> Result<()> {
        self.subscriptions
            .write()
            .insert(subscription.id, subscription.clone());
        Ok(())
    }
}

#[async_trait]
impl DeliveryStore for MemoryStore {
    async fn record(&self, delivery: &WebhookDelivery) -> Result<()> {
        self.deliveries.write().push(delivery.clone());
        Ok(())
    }

    async fn list_for_event(&self, event_id: i64) -> Result<Vec<WebhookDelivery>> {
        Ok(self
            .deliveries
            .read()
            .iter()
            .filter(|d| d.event_id == event_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AnalyticsStore for MemoryStore {
    async fn get(&self, name: &str) -> Result<Option<DomainAnalytics>> {
        Ok(self.analytics.read().get(name).cloned())
    }

    async fn put(&self, analytics: &DomainAnalytics) -> Result<()> {
        self.analytics
            .write()
            .insert(analytics.name.clone(), analytics.clone());
        Ok(())
    }
}

#[async_trait]
impl TraitsStore for MemoryStore {
    async fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.traits.read().contains_key(name))
    }

    async fn get_traits(&self, name: &str) -> Result<Option<DomainTraits>> {
        Ok(self.traits.read().get(name).cloned())
    }

    async fn insert_if_absent(&self, traits: &DomainTraits) -> Result<bool> {
        let mut stored = self.traits.write();
        if stored.contains_key(&traits.name) {
            Ok(false)
        } else {
            stored.insert(traits.name.clone(), traits.clone());
            Ok(true)
        }
    }
}
