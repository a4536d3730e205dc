//! Analytics aggregation loop.
//!
//! Runs independently of ingestion on its own timer and shares nothing
//! with it but the durable store. Each batch drains the unprocessed
//! event backlog in creation order, folds it into the per-domain
//! rollups, derives traits for first-seen domains, and marks the
//! consumed events so they are never aggregated twice.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::domain::{DomainAnalytics, DomainEvent, DomainTraits};
use crate::error::Result;
use crate::port::{AnalyticsStore, EventStore, TraitsStore};

/// Aggregation loop settings, resolved from configuration.
#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    pub interval: Duration,
    pub batch_size: usize,
}

/// Outcome of one aggregation batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Events consumed and marked processed.
    pub processed: usize,
    /// Distinct domains whose rollups were updated.
    pub domains: usize,
}

/// Maintains [`DomainAnalytics`] as a running summary over all events.
pub struct Aggregator {
    events: Arc<dyn EventStore>,
    analytics: Arc<dyn AnalyticsStore>,
    traits: Arc<dyn TraitsStore>,
    settings: AggregatorSettings,
}

impl Aggregator {
    #[must_use]
    pub fn new(
        events: Arc<dyn EventStore>,
        analytics: Arc<dyn AnalyticsStore>,
        traits: Arc<dyn TraitsStore>,
        settings: AggregatorSettings,
    ) -> Self {
        Self {
            events,
            analytics,
            traits,
            settings,
        }
    }

    /// Run the aggregation loop until shutdown. Errors are logged and
    /// the next tick retries; unconsumed events simply stay in the
    /// backlog. A batch in flight always runs to completion.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.settings.interval.as_secs(),
            batch_size = self.settings.batch_size,
            "Aggregation loop starting"
        );

        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => {
                    info!("Aggregation loop stopping");
                    return;
                }
            }

            match self.run_batch().await {
                Ok(report) if report.processed > 0 => {
                    info!(
                        processed = report.processed,
                        domains = report.domains,
                        "Aggregation batch complete"
                    );
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(error = %err, "Aggregation batch failed, retrying next tick");
                }
            }
        }
    }

    /// Aggregate one batch of the unprocessed backlog.
    ///
    /// Domains are folded one at a time with read-modify-write against
    /// the store; a failure on one domain leaves its events unprocessed
    /// for the next batch without blocking the others.
    pub async fn run_batch(&self) -> Result<BatchReport> {
        let batch = self.events.load_unprocessed(self.settings.batch_size).await?;
        if batch.is_empty() {
            return Ok(BatchReport::default());
        }

        let groups = group_by_domain(&batch);
        let mut consumed: Vec<i64> = Vec::with_capacity(batch.len());
        let mut domains = 0;

        for (name, events) in &groups {
            match self.aggregate_domain(name, events).await {
                Ok(()) => {
                    consumed.extend(events.iter().map(|e| e.event_id));
                    domains += 1;
                }
                Err(err) => {
                    warn!(
                        domain = %name,
                        error = %err,
                        "Failed to aggregate domain, leaving its events unprocessed"
                    );
                }
            }
        }

        self.events.mark_processed(&consumed).await?;

        Ok(BatchReport {
            processed: consumed.len(),
            domains,
        })
    }

    /// Read-modify-write one domain's rollup, then derive traits once.
    async fn aggregate_domain(&self, name: &str, events: &[&DomainEvent]) -> Result<()> {
        let mut analytics = self
            .analytics
            .get(name)
            .await?
            .unwrap_or_else(|| DomainAnalytics::seed(name));

        analytics.apply_batch(events);
        self.analytics.put(&analytics).await?;

        if !self.traits.contains(name).await? {
            let traits = DomainTraits::derive(name);
            if self.traits.insert_if_absent(&traits).await? {
                debug!(domain = %name, brandability = traits.brandability, "Derived domain traits");
            }
        }

        Ok(())
    }
}

/// Group a chronologically ordered batch by domain name, preserving the
/// per-domain event order.
fn group_by_domain(batch: &[DomainEvent]) -> BTreeMap<String, Vec<&DomainEvent>> {
    let mut groups: BTreeMap<String, Vec<&DomainEvent>> = BTreeMap::new();
    for event in batch {
        groups.entry(event.name.clone()).or_default().push(event);
    }
    groups
}
