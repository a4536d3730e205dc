//! SQLite store implementation.
//!
//! One pooled store implements every persistence port. Events are
//! immutable once stored: a redelivered `event_id` is ignored rather
//! than rewritten, which both dedups replayed pages and preserves the
//! `processed` flag across replays so no event is aggregated twice.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::connection::DbPool;
use super::model::{
    AnalyticsRow, CursorRow, DeliveryRow, EventRow, NewDeliveryRow, SubscriptionRow, TraitsRow,
};
use super::schema::{
    domain_analytics, domain_events, domain_traits, ingest_cursor, subscriptions,
    webhook_deliveries,
};
use crate::domain::{
    DomainAnalytics, DomainEvent, DomainTraits, Subscription, WebhookDelivery,
};
use crate::error::{Error, Result};
use crate::port::{
    AnalyticsStore, CursorStore, DeliveryStore, EventStore, SubscriptionStore, TraitsStore,
};

use async_trait::async_trait;

/// The cursor table is a singleton; this is its only row id.
const CURSOR_ROW_ID: i32 = 0;

/// SQLite-backed implementation of all persistence ports.
pub struct SqliteStore {
    /// Database connection pool.
    pool: DbPool,
}

impl SqliteStore {
    /// Create a new SQLite store with the given connection pool.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<SqliteConnection>>> {
        self.pool.get().map_err(|e| Error::Connection(e.to_string()))
    }

    fn event_to_row(event: &DomainEvent) -> Result<EventRow> {
        Ok(EventRow {
            event_id: event.event_id,
            name: event.name.clone(),
            token_id: event.token_id.clone(),
            unique_id: event.unique_id.clone(),
            relay_id: event.relay_id.clone(),
            event_type: event.event_type.clone(),
            event_data: serde_json::to_string(&event.event_data)
                .map_err(|e| Error::Parse(e.to_string()))?,
            created_at: event.created_at.to_rfc3339(),
            processed: event.processed,
        })
    }

    fn event_from_row(row: EventRow) -> Result<DomainEvent> {
        Ok(DomainEvent {
            event_id: row.event_id,
            name: row.name,
            token_id: row.token_id,
            unique_id: row.unique_id,
            relay_id: row.relay_id,
            event_type: row.event_type,
            event_data: serde_json::from_str(&row.event_data)
                .map_err(|e| Error::Parse(e.to_string()))?,
            created_at: parse_datetime(&row.created_at)?,
            processed: row.processed,
        })
    }

    fn subscription_to_row(subscription: &Subscription) -> Result<SubscriptionRow> {
        Ok(SubscriptionRow {
            id: subscription.id.to_string(),
            user_id: subscription.user_id.clone(),
            event_type: subscription.event_type.clone(),
            webhook_url: subscription.webhook_url.clone(),
            filters: serde_json::to_string(&subscription.filters)
                .map_err(|e| Error::Parse(e.to_string()))?,
            is_active: subscription.is_active,
        })
    }

    fn subscription_from_row(row: SubscriptionRow) -> Result<Subscription> {
        Ok(Subscription {
            id: parse_uuid(&row.id)?,
            user_id: row.user_id,
            event_type: row.event_type,
            webhook_url: row.webhook_url,
            filters: serde_json::from_str(&row.filters).map_err(|e| Error::Parse(e.to_string()))?,
            is_active: row.is_active,
        })
    }

    fn delivery_to_row(delivery: &WebhookDelivery) -> NewDeliveryRow {
        NewDeliveryRow {
            subscription_id: delivery.subscription_id.to_string(),
            event_id: delivery.event_id,
            status: delivery.status.as_str().to_string(),
            response_status: delivery.response_status.map(i32::from),
            error_message: delivery.error_message.clone(),
            delivered_at: delivery.delivered_at.to_rfc3339(),
        }
    }

    fn delivery_from_row(row: DeliveryRow) -> Result<WebhookDelivery> {
        Ok(WebhookDelivery {
            subscription_id: parse_uuid(&row.subscription_id)?,
            event_id: row.event_id,
            status: row.status.parse().map_err(Error::Parse)?,
            response_status: row
                .response_status
                .map(|s| u16::try_from(s).map_err(|e| Error::Parse(e.to_string())))
                .transpose()?,
            error_message: row.error_message,
            delivered_at: parse_datetime(&row.delivered_at)?,
        })
    }

    fn analytics_to_row(analytics: &DomainAnalytics) -> AnalyticsRow {
        AnalyticsRow {
            name: analytics.name.clone(),
            total_events: analytics.total_events,
            last_event_type: analytics.last_event_type.clone(),
            last_event_at: analytics.last_event_at.map(|t| t.to_rfc3339()),
            total_volume: analytics.total_volume.to_string(),
            highest_price: analytics.highest_price.map(|p| p.to_string()),
            lowest_price: analytics.lowest_price.map(|p| p.to_string()),
            offer_count: analytics.offer_count,
            trade_count: analytics.trade_count,
            is_fractionalized: analytics.is_fractionalized,
            expires_at: analytics.expires_at.map(|t| t.to_rfc3339()),
        }
    }

    fn analytics_from_row(row: AnalyticsRow) -> Result<DomainAnalytics> {
        Ok(DomainAnalytics {
            name: row.name,
            total_events: row.total_events,
            last_event_type: row.last_event_type,
            last_event_at: row.last_event_at.as_deref().map(parse_datetime).transpose()?,
            total_volume: parse_decimal(&row.total_volume)?,
            highest_price: row.highest_price.as_deref().map(parse_decimal).transpose()?,
            lowest_price: row.lowest_price.as_deref().map(parse_decimal).transpose()?,
            offer_count: row.offer_count,
            trade_count: row.trade_count,
            is_fractionalized: row.is_fractionalized,
            expires_at: row.expires_at.as_deref().map(parse_datetime).transpose()?,
        })
    }

    fn traits_from_row(row: TraitsRow) -> Result<DomainTraits> {
        Ok(DomainTraits {
            name: row.name,
            label: row.label,
            extension: row.extension,
            length: usize::try_from(row.length).map_err(|e| Error::Parse(e.to_string()))?,
            is_numeric: row.is_numeric,
            has_hyphen: row.has_hyphen,
            vowel_ratio: row.vowel_ratio,
            brandability: u8::try_from(row.brandability).map_err(|e| Error::Parse(e.to_string()))?,
        })
    }

    fn traits_to_row(traits: &DomainTraits) -> TraitsRow {
        TraitsRow {
            name: traits.name.clone(),
            label: traits.label.clone(),
            extension: traits.extension.clone(),
            length: traits.length as i32,
            is_numeric: traits.is_numeric,
            has_hyphen: traits.has_hyphen,
            vowel_ratio: traits.vowel_ratio,
            brandability: i32::from(traits.brandability),
        }
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Parse(e.to_string()))
}

fn parse_decimal(s: &str) -> Result<Decimal> {
    s.parse().map_err(|e: rust_decimal::Error| Error::Parse(e.to_string()))
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::Parse(e.to_string()))
}

#[async_trait]
impl EventStore for SqliteStore {
    async fn upsert_events(&self, events: &[DomainEvent]) -> Result<usize> {
        let rows = events
            .iter()
            .map(Self::event_to_row)
            .collect::<Result<Vec<_>>>()?;

        let mut conn = self.conn()?;
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let mut written = 0;
            for row in &rows {
                written += diesel::insert_or_ignore_into(domain_events::table)
                    .values(row)
                    .execute(conn)?;
            }
            Ok(written)
        })
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn get_event(&self, event_id: i64) -> Result<Option<DomainEvent>> {
        let mut conn = self.conn()?;

        let row: Option<EventRow> = domain_events::table
            .find(event_id)
            .first(&mut conn)
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        row.map(Self::event_from_row).transpose()
    }

    async fn load_unprocessed(&self, limit: usize) -> Result<Vec<DomainEvent>> {
        let mut conn = self.conn()?;

        let rows: Vec<EventRow> = domain_events::table
            .filter(domain_events::processed.eq(false))
            .order((domain_events::created_at.asc(), domain_events::event_id.asc()))
            .limit(limit as i64)
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        rows.into_iter().map(Self::event_from_row).collect()
    }

    async fn mark_processed(&self, event_ids: &[i64]) -> Result<()> {
        if event_ids.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn()?;

        diesel::update(domain_events::table.filter(domain_events::event_id.eq_any(event_ids)))
            .set(domain_events::processed.eq(true))
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl CursorStore for SqliteStore {
    async fn load(&self) -> Result<Option<i64>> {
        let mut conn = self.conn()?;

        let row: Option<CursorRow> = ingest_cursor::table
            .find(CURSOR_ROW_ID)
            .first(&mut conn)
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(row.map(|r| r.last_event_id))
    }

    async fn save(&self, last_event_id: i64) -> Result<()> {
        let mut conn = self.conn()?;

        diesel::replace_into(ingest_cursor::table)
            .values(&CursorRow {
                id: CURSOR_ROW_ID,
                last_event_id,
            })
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for SqliteStore {
    async fn active_for_event_type(&self, event_type: &str) -> Result<Vec<Subscription>> {
        let mut conn = self.conn()?;

        let rows: Vec<SubscriptionRow> = subscriptions::table
            .filter(subscriptions::event_type.eq(event_type))
            .filter(subscriptions::is_active.eq(true))
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        rows.into_iter().map(Self::subscription_from_row).collect()
    }

    async fn upsert(&self, subscription: &Subscription) -> Result<()> {
        let row = Self::subscription_to_row(subscription)?;
        let mut conn = self.conn()?;

        diesel::replace_into(subscriptions::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl DeliveryStore for SqliteStore {
    async fn record(&self, delivery: &WebhookDelivery) -> Result<()> {
        let row = Self::delivery_to_row(delivery);
        let mut conn = self.conn()?;

        diesel::insert_into(webhook_deliveries::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    async fn list_for_event(&self, event_id: i64) -> Result<Vec<WebhookDelivery>> {
        let mut conn = self.conn()?;

        let rows: Vec<DeliveryRow> = webhook_deliveries::table
            .filter(webhook_deliveries::event_id.eq(event_id))
            .order(webhook_deliveries::id.asc())
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        rows.into_iter().map(Self::delivery_from_row).collect()
    }
}

#[async_trait]
impl AnalyticsStore for SqliteStore {
    async fn get(&self, name: &str) -> Result<Option<DomainAnalytics>> {
        let mut conn = self.conn()?;

        let row: Option<AnalyticsRow> = domain_analytics::table
            .find(name)
            .first(&mut conn)
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        row.map(Self::analytics_from_row).transpose()
    }

    async fn put(&self, analytics: &DomainAnalytics) -> Result<()> {
        let row = Self::analytics_to_row(analytics);
        let mut conn = self.conn()?;

        diesel::replace_into(domain_analytics::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl TraitsStore for SqliteStore {
    async fn contains(&self, name: &str) -> Result<bool> {
        let mut conn = self.conn()?;

        let row: Option<TraitsRow> = domain_traits::table
            .find(name)
            .first(&mut conn)
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(row.is_some())
    }

    async fn get_traits(&self, name: &str) -> Result<Option<DomainTraits>> {
        let mut conn = self.conn()?;

        let row: Option<TraitsRow> = domain_traits::table
            .find(name)
            .first(&mut conn)
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        row.map(Self::traits_from_row).transpose()
    }

    async fn insert_if_absent(&self, traits: &DomainTraits) -> Result<bool> {
        let row = Self::traits_to_row(traits);
        let mut conn = self.conn()?;

        let written = diesel::insert_or_ignore_into(domain_traits::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(written > 0)
    }
}
