//! Subscriptions and their filter predicates.
//!
//! Subscriptions are created and managed by an external surface; the core
//! only reads them. Filter evaluation is a short-circuiting conjunction
//! that fails closed: a clause referencing data absent from the event
//! payload rejects the event, unless the subscriber never specified that
//! clause.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::DomainEvent;

/// A subscriber's standing request for matching events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: String,
    /// The single event type this subscription listens for.
    pub event_type: String,
    pub webhook_url: String,
    #[serde(default)]
    pub filters: SubscriptionFilters,
    pub is_active: bool,
}

impl Subscription {
    /// Create an active subscription with a fresh id.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        event_type: impl Into<String>,
        webhook_url: impl Into<String>,
        filters: SubscriptionFilters,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            event_type: event_type.into(),
            webhook_url: webhook_url.into(),
            filters,
            is_active: true,
        }
    }

    /// Whether this subscription matches the given event.
    ///
    /// The event type must match exactly and every specified filter
    /// clause must be satisfied.
    #[must_use]
    pub fn matches(&self, event: &DomainEvent, now: DateTime<Utc>) -> bool {
        self.is_active && self.event_type == event.event_type && self.filters.matches(event, now)
    }
}

/// Per-subscription filter predicate. Every field is optional; an absent
/// clause is automatically satisfied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionFilters {
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// Bounds on the label length (characters before the first dot).
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    /// Accepted extensions (suffix after the last dot), case-insensitive.
    pub extensions: Option<Vec<String>>,
    /// Matches when the domain expires within this many days of `now`.
    pub expires_within_days: Option<i64>,
    /// Case-insensitive equality against the payload's owner address.
    pub owner: Option<String>,
}

impl SubscriptionFilters {
    /// Evaluate the conjunction against an event, short-circuiting on the
    /// first failing clause.
    #[must_use]
    pub fn matches(&self, event: &DomainEvent, now: DateTime<Utc>) -> bool {
        if self.min_price.is_some() || self.max_price.is_some() {
            let Some(price) = event.price() else {
                return false;
            };
            if self.min_price.map_or(false, |min| price < min) {
                return false;
            }
            if self.max_price.map_or(false, |max| price > max) {
                return false;
            }
        }

        let label_len = event.label().chars().count();
        if self.min_length.map_or(false, |min| label_len < min) {
            return false;
        }
        if self.max_length.map_or(false, |max| label_len > max) {
            return false;
        }

        if let Some(extensions) = &self.extensions {
            let Some(ext) = event.extension() else {
                return false;
            };
            if !extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
                return false;
            }
        }

        if let Some(days) = self.expires_within_days {
            let Some(expires_at) = event.expires_at() else {
                return false;
            };
            if (expires_at - now).num_seconds() / 86_400 > days {
                return false;
            }
        }

        if let Some(owner) = &self.owner {
            let Some(event_owner) = event.owner() else {
                return false;
            };
            if !owner.eq_ignore_ascii_case(event_owner) {
                return false;
            }
        }

        true
    }
}
