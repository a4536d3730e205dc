//! Database model types for Diesel ORM.
//!
//! Timestamps are stored as RFC 3339 text, decimals as their canonical
//! string form, and structured fields (event payloads, filters) as JSON
//! text. Conversions to and from domain types live in `store.rs`.

use diesel::prelude::*;

use super::schema::{
    domain_analytics, domain_events, domain_traits, ingest_cursor, subscriptions,
    webhook_deliveries,
};

/// Database row for a domain event.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = domain_events)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct EventRow {
    pub event_id: i64,
    pub name: String,
    pub token_id: Option<String>,
    pub unique_id: Option<String>,
    pub relay_id: Option<String>,
    pub event_type: String,
    pub event_data: String,
    pub created_at: String,
    pub processed: bool,
}

/// Database row for the singleton ingestion cursor.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = ingest_cursor)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CursorRow {
    pub id: i32,
    pub last_event_id: i64,
}

/// Database row for a subscription.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = subscriptions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SubscriptionRow {
    pub id: String,
    pub user_id: String,
    pub event_type: String,
    pub webhook_url: String,
    pub filters: String,
    pub is_active: bool,
}

/// Database row for a webhook delivery attempt (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = webhook_deliveries)]
pub struct NewDeliveryRow {
    pub subscription_id: String,
    pub event_id: i64,
    pub status: String,
    pub response_status: Option<i32>,
    pub error_message: Option<String>,
    pub delivered_at: String,
}

/// Database row for a webhook delivery attempt (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = webhook_deliveries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DeliveryRow {
    pub id: Option<i32>,
    pub subscription_id: String,
    pub event_id: i64,
    pub status: String,
    pub response_status: Option<i32>,
    pub error_message: Option<String>,
    pub delivered_at: String,
}

/// Database row for per-domain analytics.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = domain_analytics)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AnalyticsRow {
    pub name: String,
    pub total_events: i64,
    pub last_event_type: Option<String>,
    pub last_event_at: Option<String>,
    pub total_volume: String,
    pub highest_price: Option<String>,
    pub lowest_price: Option<String>,
    pub offer_count: i64,
    pub trade_count: i64,
    pub is_fractionalized: bool,
    pub expires_at: Option<String>,
}

/// Database row for once-derived domain traits.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = domain_traits)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TraitsRow {
    pub name: String,
    pub label: String,
    pub extension: String,
    pub length: i32,
    pub is_numeric: bool,
    pub has_hyphen: bool,
    pub vowel_ratio: f64,
    pub brandability: i32,
}
