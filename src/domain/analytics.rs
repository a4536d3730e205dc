//! Incrementally-updated per-domain rollups.
//!
//! `DomainAnalytics` is a running summary over every event ever ingested
//! for a domain. It is folded forward batch by batch, never recomputed
//! from scratch; the fold here is pure so the aggregation loop can apply
//! it under whatever transaction semantics the backing store provides.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::event::{DomainEvent, EventKind};

/// Running per-domain summary. One row per domain name.
///
/// Invariants: `total_events` is monotonically non-decreasing;
/// `highest_price`/`lowest_price` are running extrema across all ingested
/// events. Absent extrema are represented as `None`, never a sentinel, so
/// a legitimate price of zero aggregates correctly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainAnalytics {
    pub name: String,
    pub total_events: i64,
    pub last_event_type: Option<String>,
    pub last_event_at: Option<DateTime<Utc>>,
    pub total_volume: Decimal,
    pub highest_price: Option<Decimal>,
    pub lowest_price: Option<Decimal>,
    pub offer_count: i64,
    pub trade_count: i64,
    /// Set once a fractionalization event is seen; never unset.
    pub is_fractionalized: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl DomainAnalytics {
    /// A fresh, empty rollup for a domain with no prior row.
    #[must_use]
    pub fn seed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            total_events: 0,
            last_event_type: None,
            last_event_at: None,
            total_volume: Decimal::ZERO,
            highest_price: None,
            lowest_price: None,
            offer_count: 0,
            trade_count: 0,
            is_fractionalized: false,
            expires_at: None,
        }
    }

    /// Fold a batch of events for this domain into the rollup.
    ///
    /// Events must be in chronological order; the caller groups a batch
    /// by domain name before applying. Prices feed the aggregates only
    /// for kinds in the sale/listing/offer allow-list.
    pub fn apply_batch(&mut self, events: &[&DomainEvent]) {
        for event in events {
            self.total_events += 1;
            self.last_event_type = Some(event.event_type.clone());
            self.last_event_at = Some(event.created_at);

            let kind = event.kind();

            if kind.is_priced() {
                if let Some(price) = event.price() {
                    self.total_volume += price;
                    self.highest_price = Some(match self.highest_price {
                        Some(high) => high.max(price),
                        None => price,
                    });
                    self.lowest_price = Some(match self.lowest_price {
                        Some(low) => low.min(price),
                        None => price,
                    });
                }
            }

            match kind {
                EventKind::Offer => self.offer_count += 1,
                EventKind::Sale => self.trade_count += 1,
                EventKind::Fractionalization => self.is_fractionalized = true,
                _ => {}
            }

            if let Some(expiry) = event.expires_at() {
                self.expires_at = Some(expiry);
            }
        }
    }
}
