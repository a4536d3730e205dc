//! Canonical domain-lifecycle event.
//!
//! Upstream payloads are heterogeneous; by the time an event reaches this
//! type it has been normalized (see `adapter::upstream`) and is immutable.
//! Field extraction helpers here walk `event_data` with fixed precedence
//! lists only — no speculative key guessing.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Candidate payload fields holding a price, in precedence order.
const PRICE_FIELDS: &[&str] = &["price", "salePrice", "amount"];

/// Candidate payload fields holding an owner address, in precedence order.
const OWNER_FIELDS: &[&str] = &["owner", "buyer", "newOwner"];

/// Candidate payload fields holding an expiry, in precedence order.
const EXPIRY_FIELDS: &[&str] = &["expiresAt", "expiry"];

/// A single normalized domain-lifecycle event. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Upstream-assigned monotonic identifier; unique key for dedup.
    pub event_id: i64,
    /// Domain name, or the synthetic `unnamed-<id>` placeholder.
    pub name: String,
    pub token_id: Option<String>,
    pub unique_id: Option<String>,
    pub relay_id: Option<String>,
    /// Open-ended event kind string as reported upstream.
    pub event_type: String,
    /// Opaque structured payload; drives filters and analytics.
    pub event_data: Value,
    pub created_at: DateTime<Utc>,
    /// Whether the analytics stage has consumed this event.
    pub processed: bool,
}

impl DomainEvent {
    /// Classify the open-ended upstream type string.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        EventKind::classify(&self.event_type)
    }

    /// Extract a price from the payload using the fixed precedence list.
    ///
    /// Tries top-level payload fields first, then the nested
    /// `payment.price` location. Returns `None` when no candidate is
    /// present or parseable.
    #[must_use]
    pub fn price(&self) -> Option<Decimal> {
        for field in PRICE_FIELDS {
            if let Some(price) = self.event_data.get(field).and_then(decimal_value) {
                return Some(price);
            }
        }
        self.event_data
            .get("payment")
            .and_then(|p| p.get("price"))
            .and_then(decimal_value)
    }

    /// Extract the owner address from the payload, if present.
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        OWNER_FIELDS
            .iter()
            .find_map(|field| self.event_data.get(field).and_then(Value::as_str))
    }

    /// Extract an expiry timestamp from the payload, if present.
    ///
    /// Accepts either an RFC 3339 string or epoch seconds.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        EXPIRY_FIELDS
            .iter()
            .find_map(|field| self.event_data.get(field).and_then(datetime_value))
    }

    /// The label before the first dot (`foo.com` → `foo`).
    #[must_use]
    pub fn label(&self) -> &str {
        self.name.split('.').next().unwrap_or(&self.name)
    }

    /// The suffix after the last dot (`foo.com` → `com`), if any.
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        let (_, ext) = self.name.rsplit_once('.')?;
        if ext.is_empty() {
            None
        } else {
            Some(ext)
        }
    }
}

fn decimal_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n.to_string().parse().ok(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn datetime_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        _ => None,
    }
}

/// Known event kinds, classified from the open-ended upstream string.
///
/// Unrecognized values map to [`EventKind::Other`] and flow through the
/// pipeline untouched; they are stored, matched, and counted toward
/// `total_events`, just never toward price aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Sale,
    Listing,
    Offer,
    Transfer,
    Renewal,
    Expiration,
    Fractionalization,
    Mint,
    Other,
}

impl EventKind {
    /// Classify an upstream type string, case-insensitively.
    #[must_use]
    pub fn classify(event_type: &str) -> Self {
        match event_type.to_ascii_uppercase().as_str() {
            "SALE" | "SOLD" | "PURCHASE" | "NAME_TOKEN_PURCHASED" => EventKind::Sale,
            "LISTING" | "LISTED" | "NAME_TOKEN_LISTED" => EventKind::Listing,
            "OFFER" | "OFFER_RECEIVED" | "NAME_TOKEN_OFFER_RECEIVED" => EventKind::Offer,
            "TRANSFER" | "NAME_TOKEN_TRANSFERRED" => EventKind::Transfer,
            "RENEWAL" | "RENEWED" | "NAME_RENEWED" => EventKind::Renewal,
            "EXPIRY" | "EXPIRED" | "NAME_EXPIRED" => EventKind::Expiration,
            "FRACTIONALIZED" | "NAME_TOKEN_FRACTIONALIZED" => EventKind::Fractionalization,
            "MINT" | "MINTED" | "TOKENIZED" | "NAME_TOKENIZED" => EventKind::Mint,
            _ => EventKind::Other,
        }
    }

    /// Whether events of this kind carry a price that feeds volume and
    /// running extrema (the sale/listing/offer allow-list).
    #[must_use]
    pub fn is_priced(&self) -> bool {
        matches!(self, EventKind::Sale | EventKind::Listing | EventKind::Offer)
    }
}
