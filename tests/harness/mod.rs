//! Shared test doubles and fixtures for integration tests.

#![allow(dead_code)]

pub mod recording_sink;
pub mod scripted_source;
pub mod temp_db;

use chrono::Utc;
use namewatch::domain::DomainEvent;
use serde_json::Value;

/// Build a normalized event with the given payload.
pub fn event(id: i64, name: &str, event_type: &str, data: Value) -> DomainEvent {
    DomainEvent {
        event_id: id,
        name: name.into(),
        token_id: None,
        unique_id: None,
        relay_id: None,
        event_type: event_type.into(),
        event_data: data,
        // Spread creation times so batch ordering is deterministic.
        created_at: Utc::now() + chrono::Duration::milliseconds(id),
        processed: false,
    }
}
