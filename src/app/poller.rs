//! Ingestion loop.
//!
//! One non-overlapping cycle per timer tick: fetch a page strictly after
//! the cursor, store it idempotently, persist and acknowledge the page's
//! high-water mark, then hand the page to the dispatcher. While the
//! upstream reports more pending events, follow-up cycles run without
//! waiting for the timer.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::app::dispatcher::Dispatcher;
use crate::domain::Cursor;
use crate::error::Result;
use crate::port::{CursorStore, EventSource, EventStore, FetchQuery};

/// Ingestion loop settings, resolved from configuration.
#[derive(Debug, Clone)]
pub struct PollerSettings {
    pub interval: Duration,
    pub page_size: usize,
    pub event_types: Vec<String>,
    pub finalized_only: bool,
}

/// Cycle state machine: at most one cycle runs at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleState {
    Idle,
    Polling,
}

/// RAII token for an in-flight cycle; releases the state on every exit
/// path, including early returns and panics.
struct CycleGuard<'a> {
    state: &'a Mutex<CycleState>,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        *self.state.lock() = CycleState::Idle;
    }
}

/// Outcome of one ingestion cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// The cycle was skipped because another was already in flight.
    pub skipped: bool,
    /// Events returned by the upstream page.
    pub fetched: usize,
    /// Events newly written to the store (redeliveries excluded).
    pub stored: usize,
    /// Webhook delivery attempts made for this page.
    pub dispatched: usize,
    /// Whether the upstream reported more pending events.
    pub has_more: bool,
}

impl CycleReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// Drives ingestion cycles against the upstream event source.
pub struct Poller {
    source: Arc<dyn EventSource>,
    events: Arc<dyn EventStore>,
    cursor: Arc<dyn CursorStore>,
    dispatcher: Arc<Dispatcher>,
    settings: PollerSettings,
    /// The only mutable state this component owns.
    state: Mutex<CycleState>,
}

impl Poller {
    #[must_use]
    pub fn new(
        source: Arc<dyn EventSource>,
        events: Arc<dyn EventStore>,
        cursor: Arc<dyn CursorStore>,
        dispatcher: Arc<Dispatcher>,
        settings: PollerSettings,
    ) -> Self {
        Self {
            source,
            events,
            cursor,
            dispatcher,
            settings,
            state: Mutex::new(CycleState::Idle),
        }
    }

    /// Run the ingestion loop until shutdown or a fatal upstream error.
    ///
    /// Transient failures (network, 5xx, storage) are logged and retried
    /// on the next tick; the cursor is only advanced after a page has
    /// been durably stored, so nothing is lost. Fatal upstream errors
    /// (bad credentials, malformed requests) terminate the loop — the
    /// returned error is the terminal state an operator has to act on.
    ///
    /// The shutdown signal is only honored between cycles: an in-flight
    /// cycle always completes its current page, so a stored page is
    /// never left behind without its cursor advance.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            source = self.source.source_name(),
            interval_secs = self.settings.interval.as_secs(),
            page_size = self.settings.page_size,
            "Ingestion loop starting"
        );

        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => {
                    info!("Ingestion loop stopping");
                    return Ok(());
                }
            }

            // Drain pending pages back to back before sleeping again.
            loop {
                match self.run_cycle().await {
                    Ok(report) if report.has_more => {
                        debug!(
                            fetched = report.fetched,
                            "Upstream has more events, running follow-up cycle"
                        );
                    }
                    Ok(_) => break,
                    Err(err) if err.is_fatal() => {
                        error!(error = %err, "Fatal upstream error, stopping ingestion loop");
                        return Err(err);
                    }
                    Err(err) => {
                        warn!(error = %err, "Ingestion cycle failed, retrying next tick");
                        break;
                    }
                }

                if *shutdown.borrow() {
                    break;
                }
            }

            if *shutdown.borrow() {
                info!("Ingestion loop stopping");
                return Ok(());
            }
        }
    }

    /// Run a single ingestion cycle.
    ///
    /// Returns a skipped report when another cycle is already in flight.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let Some(_guard) = self.begin_cycle() else {
            debug!("Ingestion cycle already in flight, skipping");
            return Ok(CycleReport::skipped());
        };

        let mut cursor = match self.cursor.load().await? {
            Some(id) => Cursor::at(id),
            None => Cursor::start(),
        };
        let after = cursor.last_event_id();
        let query = FetchQuery {
            after,
            limit: self.settings.page_size,
            event_types: self.settings.event_types.clone(),
            finalized_only: self.settings.finalized_only,
        };

        let page = self.source.fetch_events(&query).await?;
        if page.events.is_empty() && page.last_id.is_none() {
            debug!(after = ?after, "No new events");
            return Ok(CycleReport::default());
        }

        let fetched = page.events.len();
        let stored = self.events.upsert_events(&page.events).await?;

        // The cursor only moves after the page is durably stored; a crash
        // before the ack replays the page and the upsert absorbs it. A
        // stale high-water mark (a replayed page) never moves it back.
        if let Some(last_id) = page.last_id {
            cursor.advance(last_id);
            if cursor.last_event_id() != after {
                if let Some(mark) = cursor.last_event_id() {
                    self.cursor.save(mark).await?;
                    self.source.acknowledge(mark).await?;
                }
            }
        }

        let dispatched = self.dispatcher.dispatch_page(&page.events).await;

        info!(
            fetched,
            stored,
            dispatched,
            last_id = ?page.last_id,
            has_more = page.has_more,
            "Ingestion cycle complete"
        );

        Ok(CycleReport {
            skipped: false,
            fetched,
            stored,
            dispatched,
            has_more: page.has_more,
        })
    }

    /// Operator action: rewind the cursor to an arbitrary id and tell the
    /// upstream to replay from there.
    pub async fn reset_cursor(&self, event_id: i64) -> Result<()> {
        let Some(_guard) = self.begin_cycle() else {
            warn!("Cannot reset cursor while a cycle is in flight");
            return Ok(());
        };

        self.cursor.save(event_id).await?;
        self.source.reset(event_id).await?;
        info!(event_id, "Cursor reset");
        Ok(())
    }

    /// Transition Idle → Polling; `None` when a cycle is in flight.
    fn begin_cycle(&self) -> Option<CycleGuard<'_>> {
        let mut state = self.state.lock();
        if *state == CycleState::Polling {
            return None;
        }
        *state = CycleState::Polling;
        Some(CycleGuard { state: &self.state })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::memory::MemoryStore;
    use crate::adapter::webhook::HttpWebhookSink;
    use crate::domain::DomainEvent;
    use crate::error::{Error, UpstreamError};
    use crate::port::EventPage;
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;
    use std::collections::VecDeque;

    fn settings() -> PollerSettings {
        PollerSettings {
            interval: Duration::from_secs(30),
            page_size: 10,
            event_types: Vec::new(),
            finalized_only: true,
        }
    }

    fn event(id: i64) -> DomainEvent {
        DomainEvent {
            event_id: id,
            name: format!("domain-{id}.com"),
            token_id: None,
            unique_id: None,
            relay_id: None,
            event_type: "SALE".into(),
            event_data: json!({"price": 100}),
            created_at: Utc::now(),
            processed: false,
        }
    }

    /// Deterministic test double for the upstream source.
    #[derive(Default)]
    struct ScriptedSource {
        pages: Mutex<VecDeque<Result<EventPage>>>,
        acks: Mutex<Vec<i64>>,
        resets: Mutex<Vec<i64>>,
        queries: Mutex<Vec<FetchQuery>>,
    }

    impl ScriptedSource {
        fn push_page(&self, events: Vec<DomainEvent>, has_more: bool) {
            let last_id = events.iter().map(|e| e.event_id).max();
            self.pages.lock().push_back(Ok(EventPage {
                events,
                last_id,
                has_more,
            }));
        }

        fn push_error(&self, error: UpstreamError) {
            self.pages.lock().push_back(Err(Error::Upstream(error)));
        }
    }

    #[async_trait]
    impl EventSource for ScriptedSource {
        async fn fetch_events(&self, query: &FetchQuery) -> Result<EventPage> {
            self.queries.lock().push(query.clone());
            self.pages
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(EventPage::default()))
        }

        async fn acknowledge(&self, event_id: i64) -> Result<()> {
            self.acks.lock().push(event_id);
            Ok(())
        }

        async fn reset(&self, event_id: i64) -> Result<()> {
            self.resets.lock().push(event_id);
            Ok(())
        }

        fn source_name(&self) -> &'static str {
            "scripted"
        }
    }

    fn poller_with(source: Arc<ScriptedSource>, store: Arc<MemoryStore>) -> Poller {
        let sink = Arc::new(HttpWebhookSink::new(Duration::from_millis(100)));
        let dispatcher = Arc::new(Dispatcher::new(store.clone(), store.clone(), sink));
        Poller::new(source, store.clone(), store, dispatcher, settings())
    }

    #[tokio::test]
    async fn cycle_stores_page_and_advances_cursor() {
        let source = Arc::new(ScriptedSource::default());
        source.push_page(vec![event(1), event(2)], false);
        let store = Arc::new(MemoryStore::new());
        let poller = poller_with(source.clone(), store.clone());

        let report = poller.run_cycle().await.unwrap();
        assert!(!report.skipped);
        assert_eq!(report.fetched, 2);
        assert_eq!(report.stored, 2);
        assert!(!report.has_more);

        assert_eq!(store.event_count(), 2);
        assert_eq!(CursorStore::load(&*store).await.unwrap(), Some(2));
        assert_eq!(source.acks.lock().as_slice(), &[2]);
    }

    #[tokio::test]
    async fn next_cycle_fetches_strictly_after_cursor() {
        let source = Arc::new(ScriptedSource::default());
        source.push_page(vec![event(1), event(2)], false);
        source.push_page(vec![event(3)], false);
        let store = Arc::new(MemoryStore::new());
        let poller = poller_with(source.clone(), store.clone());

        poller.run_cycle().await.unwrap();
        poller.run_cycle().await.unwrap();

        let queries = source.queries.lock();
        assert_eq!(queries[0].after, None);
        assert_eq!(queries[1].after, Some(2));
        assert_eq!(CursorStore::load(&*store).await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn replayed_page_is_deduplicated() {
        let source = Arc::new(ScriptedSource::default());
        let page = vec![event(1), event(2)];
        source.push_page(page.clone(), false);
        source.push_page(page, false);
        let store = Arc::new(MemoryStore::new());
        let poller = poller_with(source.clone(), store.clone());

        let first = poller.run_cycle().await.unwrap();
        let second = poller.run_cycle().await.unwrap();

        assert_eq!(first.stored, 2);
        assert_eq!(second.stored, 0);
        assert_eq!(store.event_count(), 2);
    }

    #[tokio::test]
    async fn stale_page_never_moves_the_cursor_backwards() {
        let source = Arc::new(ScriptedSource::default());
        source.push_page(vec![event(10)], false);
        // A replayed page with a lower high-water mark.
        source.push_page(vec![event(3)], false);
        let store = Arc::new(MemoryStore::new());
        let poller = poller_with(source.clone(), store.clone());

        poller.run_cycle().await.unwrap();
        poller.run_cycle().await.unwrap();

        assert_eq!(CursorStore::load(&*store).await.unwrap(), Some(10));
        assert_eq!(source.acks.lock().as_slice(), &[10]);
    }

    #[tokio::test]
    async fn transient_error_leaves_cursor_unchanged() {
        let source = Arc::new(ScriptedSource::default());
        source.push_error(UpstreamError::Server { status: 503 });
        let store = Arc::new(MemoryStore::new());
        let poller = poller_with(source.clone(), store.clone());

        let result = poller.run_cycle().await;
        assert!(matches!(result, Err(ref e) if !e.is_fatal()));
        assert_eq!(CursorStore::load(&*store).await.unwrap(), None);
        assert!(source.acks.lock().is_empty());
    }

    #[tokio::test]
    async fn fatal_error_is_surfaced_as_fatal() {
        let source = Arc::new(ScriptedSource::default());
        source.push_error(UpstreamError::Unauthorized("bad key".into()));
        let store = Arc::new(MemoryStore::new());
        let poller = poller_with(source.clone(), store.clone());

        let result = poller.run_cycle().await;
        assert!(matches!(result, Err(ref e) if e.is_fatal()));
    }

    #[tokio::test]
    async fn empty_page_is_a_quiet_no_op() {
        let source = Arc::new(ScriptedSource::default());
        let store = Arc::new(MemoryStore::new());
        let poller = poller_with(source.clone(), store.clone());

        let report = poller.run_cycle().await.unwrap();
        assert_eq!(report.fetched, 0);
        assert_eq!(CursorStore::load(&*store).await.unwrap(), None);
        assert!(source.acks.lock().is_empty());
    }

    #[tokio::test]
    async fn reset_cursor_rewinds_and_notifies_upstream() {
        let source = Arc::new(ScriptedSource::default());
        let store = Arc::new(MemoryStore::new());
        let poller = poller_with(source.clone(), store.clone());

        poller.reset_cursor(17).await.unwrap();

        assert_eq!(CursorStore::load(&*store).await.unwrap(), Some(17));
        assert_eq!(source.resets.lock().as_slice(), &[17]);
    }

    #[tokio::test]
    async fn guard_prevents_overlapping_cycles() {
        let source = Arc::new(ScriptedSource::default());
        let store = Arc::new(MemoryStore::new());
        let poller = poller_with(source, store);

        // Hold the state as an in-flight cycle would.
        let guard = poller.begin_cycle().unwrap();
        let report = poller.run_cycle().await.unwrap();
        assert!(report.skipped);
        drop(guard);

        let report = poller.run_cycle().await.unwrap();
        assert!(!report.skipped);
    }

    #[tokio::test]
    async fn guard_is_released_on_error_paths() {
        let source = Arc::new(ScriptedSource::default());
        source.push_error(UpstreamError::Server { status: 500 });
        let store = Arc::new(MemoryStore::new());
        let poller = poller_with(source, store);

        assert!(poller.run_cycle().await.is_err());

        // The failed cycle must have returned the state to Idle.
        let report = poller.run_cycle().await.unwrap();
        assert!(!report.skipped);
    }
}
