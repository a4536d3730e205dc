//! Application wiring.
//!
//! Builds the adapters, binds them to the ports, and runs the two
//! independent loops: ingestion (poller + dispatcher) and analytics
//! aggregation. The loops share only the durable store.

mod aggregator;
mod dispatcher;
mod poller;

pub use aggregator::{Aggregator, AggregatorSettings, BatchReport};
pub use dispatcher::Dispatcher;
pub use poller::{CycleReport, Poller, PollerSettings};

use std::sync::Arc;

use tokio::signal;
use tokio::sync::watch;
use tracing::info;

use crate::adapter::sqlite::{create_pool, run_migrations, SqliteStore};
use crate::adapter::upstream::PollClient;
use crate::adapter::webhook::HttpWebhookSink;
use crate::config::Config;
use crate::error::Result;

/// Main application struct.
pub struct App;

impl App {
    /// Run both loops until shutdown or a fatal upstream error.
    ///
    /// Ctrl-C flips the shutdown flag; each loop finishes its in-flight
    /// page or batch before exiting. A fatal poller error also stops the
    /// aggregation loop so the process can terminate.
    pub async fn run(config: Config) -> Result<()> {
        let store = init_store(&config)?;
        let source = Arc::new(PollClient::from_config(&config.upstream));
        let sink = Arc::new(HttpWebhookSink::from_config(&config.webhook));

        let dispatcher = Arc::new(Dispatcher::new(store.clone(), store.clone(), sink));

        let poller = Poller::new(
            source,
            store.clone(),
            store.clone(),
            dispatcher,
            PollerSettings {
                interval: config.poll_interval(),
                page_size: config.poller.page_size,
                event_types: config.poller.event_types.clone(),
                finalized_only: config.poller.finalized_only,
            },
        );

        let aggregator = Aggregator::new(
            store.clone(),
            store.clone(),
            store,
            AggregatorSettings {
                interval: config.aggregate_interval(),
                batch_size: config.aggregator.batch_size,
            },
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shutdown_tx = Arc::new(shutdown_tx);

        {
            let shutdown_tx = shutdown_tx.clone();
            tokio::spawn(async move {
                if signal::ctrl_c().await.is_ok() {
                    info!("Shutdown signal received");
                    let _ = shutdown_tx.send(true);
                }
            });
        }

        let (result, ()) = tokio::join!(
            async {
                let result = poller.run(shutdown_rx.clone()).await;
                let _ = shutdown_tx.send(true);
                result
            },
            aggregator.run(shutdown_rx.clone()),
        );

        result
    }

    /// Operator action: rewind the ingestion cursor and replay.
    pub async fn reset_cursor(config: Config, event_id: i64) -> Result<()> {
        let store = init_store(&config)?;
        let source = Arc::new(PollClient::from_config(&config.upstream));
        let sink = Arc::new(HttpWebhookSink::from_config(&config.webhook));
        let dispatcher = Arc::new(Dispatcher::new(store.clone(), store.clone(), sink));

        let poller = Poller::new(
            source,
            store.clone(),
            store,
            dispatcher,
            PollerSettings {
                interval: config.poll_interval(),
                page_size: config.poller.page_size,
                event_types: config.poller.event_types.clone(),
                finalized_only: config.poller.finalized_only,
            },
        );

        poller.reset_cursor(event_id).await
    }
}

fn init_store(config: &Config) -> Result<Arc<SqliteStore>> {
    let pool = create_pool(&config.database.path)?;
    run_migrations(&pool)?;
    info!(path = %config.database.path, "Database ready");
    Ok(Arc::new(SqliteStore::new(pool)))
}
