//! Persistence ports.
//!
//! All writes are upserts (or explicit insert-if-absent) so any backing
//! store can satisfy the pipeline's idempotency requirements without
//! relying on a specific conflict-resolution feature.

use async_trait::async_trait;

use crate::domain::{
    DomainAnalytics, DomainEvent, DomainTraits, Subscription, WebhookDelivery,
};
use crate::error::Result;

/// Idempotent storage for domain events.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Upsert a page of events keyed by `event_id`; a redelivered event
    /// overwrites rather than duplicates. Returns the number written.
    async fn upsert_events(&self, events: &[DomainEvent]) -> Result<usize>;

    /// Fetch a single event by id.
    async fn get_event(&self, event_id: i64) -> Result<Option<DomainEvent>>;

    /// Events not yet consumed by analytics, ordered by creation time
    /// then id, bounded by `limit`.
    async fn load_unprocessed(&self, limit: usize) -> Result<Vec<DomainEvent>>;

    /// Exclude the given events from future unprocessed batches.
    async fn mark_processed(&self, event_ids: &[i64]) -> Result<()>;
}

/// Persistence for the singleton ingestion cursor.
#[async_trait]
pub trait CursorStore: Send + Sync {
    /// The last acknowledged event id, if any cycle has completed.
    async fn load(&self) -> Result<Option<i64>>;

    /// Persist a new cursor position.
    async fn save(&self, last_event_id: i64) -> Result<()>;
}

/// Read access to subscriptions; the management surface lives elsewhere.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Active subscriptions listening for the given event type.
    async fn active_for_event_type(&self, event_type: &str) -> Result<Vec<Subscription>>;

    /// Upsert a subscription keyed by id.
    async fn upsert(&self, subscription: &Subscription) -> Result<()>;
}

/// Append-only audit trail of webhook delivery attempts.
#[async_trait]
pub trait DeliveryStore: Send + Sync {
    /// Append one attempt record. Never updates an existing row.
    async fn record(&self, delivery: &WebhookDelivery) -> Result<()>;

    /// All recorded attempts for an event, in insertion order.
    async fn list_for_event(&self, event_id: i64) -> Result<Vec<WebhookDelivery>>;
}

/// Per-domain rollup storage.
///
/// The aggregator performs an explicit read-modify-write: `get` the prior
/// row (if any), fold the batch in memory, `put` the result. Batches are
/// processed serially per domain, so `put` only needs last-write-wins
/// upsert semantics.
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<DomainAnalytics>>;

    async fn put(&self, analytics: &DomainAnalytics) -> Result<()>;
}

/// Storage for once-derived domain traits.
#[async_trait]
pub trait TraitsStore: Send + Sync {
    /// Whether traits were already derived for this domain.
    async fn contains(&self, name: &str) -> Result<bool>;

    /// Fetch the derived traits for a domain, if present.
    async fn get_traits(&self, name: &str) -> Result<Option<DomainTraits>>;

    /// Insert unless a row already exists. Returns whether a row was
    /// written; an existing row is left untouched.
    async fn insert_if_absent(&self, traits: &DomainTraits) -> Result<bool>;
}
