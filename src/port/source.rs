//! Upstream event source port.

use async_trait::async_trait;

use crate::domain::DomainEvent;
use crate::error::Result;

/// Parameters for one page fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchQuery {
    /// Fetch events strictly after this id; `None` starts from the
    /// beginning of the stream.
    pub after: Option<i64>,
    /// Maximum events per page.
    pub limit: usize,
    /// Event types to request; empty means all types.
    pub event_types: Vec<String>,
    /// Only events from finalized blocks.
    pub finalized_only: bool,
}

/// One page of normalized events from the upstream source.
#[derive(Debug, Clone, Default)]
pub struct EventPage {
    /// Events in upstream-reported order.
    pub events: Vec<DomainEvent>,
    /// The page's high-water mark to persist and acknowledge.
    pub last_id: Option<i64>,
    /// Whether the upstream reports more pending events.
    pub has_more: bool,
}

/// Paginated, acknowledged access to the upstream event stream.
///
/// The protocol is at-least-once: a crash between storing a page and
/// acknowledging it causes the same page to be served again, so storage
/// must be idempotent.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetch a page of events strictly after the query's cursor.
    async fn fetch_events(&self, query: &FetchQuery) -> Result<EventPage>;

    /// Confirm that everything up to `event_id` was durably consumed.
    async fn acknowledge(&self, event_id: i64) -> Result<()>;

    /// Rewind the upstream stream to replay from `event_id`.
    async fn reset(&self, event_id: i64) -> Result<()>;

    /// Source name for logging and diagnostics.
    fn source_name(&self) -> &'static str;
}
