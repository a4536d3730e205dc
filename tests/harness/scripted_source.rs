use std::collections::VecDeque;

use async_trait::async_trait;
use namewatch::domain::DomainEvent;
use namewatch::error::{Error, Result, UpstreamError};
use namewatch::port::{EventPage, EventSource, FetchQuery};
use parking_lot::Mutex;

/// Deterministic test double for the upstream poll API.
#[derive(Default)]
pub struct ScriptedSource {
    pages: Mutex<VecDeque<Result<EventPage>>>,
    acks: Mutex<Vec<i64>>,
    resets: Mutex<Vec<i64>>,
    queries: Mutex<Vec<FetchQuery>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a page whose high-water mark is the max queued event id.
    pub fn push_page(&self, events: Vec<DomainEvent>, has_more: bool) {
        let last_id = events.iter().map(|e| e.event_id).max();
        self.pages.lock().push_back(Ok(EventPage {
            events,
            last_id,
            has_more,
        }));
    }

    /// Queue an upstream failure for the next fetch.
    pub fn push_error(&self, error: UpstreamError) {
        self.pages.lock().push_back(Err(Error::Upstream(error)));
    }

    pub fn acks(&self) -> Vec<i64> {
        self.acks.lock().clone()
    }

    pub fn resets(&self) -> Vec<i64> {
        self.resets.lock().clone()
    }

    pub fn queries(&self) -> Vec<FetchQuery> {
        self.queries.lock().clone()
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
