//! Raw poll-API payloads and normalization into [`DomainEvent`].
//!
//! Upstream records do not keep their fields in consistent locations:
//! depending on the event kind, the name or correlation ids may sit at
//! the top level, inside `eventData`, or under a legacy alias. For each
//! target field normalization walks a fixed precedence list and takes the
//! first present, non-empty value. It never fails and never drops an
//! event; a record with no recoverable name gets the deterministic
//! `unnamed-<id>` placeholder so it stays storable and traceable.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::domain::DomainEvent;

/// One page of the poll API response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEventPage {
    #[serde(default)]
    pub events: Vec<RawEvent>,
    #[serde(default)]
    pub last_id: Option<i64>,
    #[serde(default)]
    pub has_more_events: bool,
}

/// A single raw upstream event, tolerant of shape drift.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub token_id: Option<String>,
    #[serde(default)]
    pub unique_id: Option<String>,
    #[serde(default)]
    pub relay_id: Option<String>,
    #[serde(default, rename = "type")]
    pub event_type: Option<String>,
    #[serde(default)]
    pub event_data: Option<Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl RawEvent {
    /// Normalize into the canonical event record.
    #[must_use]
    pub fn normalize(self) -> DomainEvent {
        let event_data = self.event_data.unwrap_or(Value::Null);

        let name = first_non_empty(self.name, &event_data, &["name", "domain"])
            .unwrap_or_else(|| format!("unnamed-{}", self.id));
        let token_id = first_non_empty(self.token_id, &event_data, &["tokenId", "token"]);
        let unique_id =
            first_non_empty(self.unique_id, &event_data, &["uniqueId", "correlationId"]);
        let relay_id = first_non_empty(self.relay_id, &event_data, &["relayId", "relay"]);

        let created_at = self
            .created_at
            .or_else(|| payload_timestamp(&event_data))
            .unwrap_or_else(Utc::now);

        DomainEvent {
            event_id: self.id,
            name,
            token_id,
            unique_id,
            relay_id,
            event_type: self
                .event_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "UNKNOWN".into()),
            event_data,
            created_at,
            processed: false,
        }
    }
}

/// Walk the precedence list: top-level value first, then each payload
/// alias in order. Empty strings count as absent.
fn first_non_empty(top_level: Option<String>, payload: &Value, aliases: &[&str]) -> Option<String> {
    top_level
        .filter(|s| !s.is_empty())
        .or_else(|| {
            aliases.iter().find_map(|alias| {
                payload
                    .get(alias)
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })
        })
}

fn payload_timestamp(payload: &Value) -> Option<DateTime<Utc>> {
    payload
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
