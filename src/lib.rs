//! Namewatch - domain lifecycle event pipeline.
//!
//! Ingests domain-lifecycle events from a blockchain-indexing poll API,
//! records them exactly once, matches them against user-defined
//! subscriptions with webhook callbacks, and maintains incrementally
//! updated per-domain analytics used for scoring opportunities.
//!
//! # Architecture
//!
//! The crate keeps a strict port/adapter split:
//!
//! - **`domain`** - Pure types and logic: events, cursors, subscriptions
//!   and their filter predicates, delivery audit records, analytics
//!   rollups, and opportunity scoring.
//! - **`port`** - Trait seams for the external collaborators: the
//!   upstream event source, the durable store, and webhook endpoints.
//! - **`adapter`** - Implementations: the HTTP poll client with payload
//!   normalization, the SQLite store (Diesel), an in-memory store, and
//!   the HTTP webhook sink.
//! - **`app`** - The ingestion and aggregation loops plus wiring.
//!
//! # Modules
//!
//! - [`config`] - Configuration loading from TOML files
//! - [`domain`] - Store-agnostic types and pure logic
//! - [`error`] - Error types for the crate
//! - [`port`] - Trait definitions for external collaborators
//! - [`adapter`] - Port implementations
//! - [`app`] - Loop orchestration
//!
//! # Example
//!
//! ```no_run
//! use namewatch::app::App;
//! use namewatch::config::Config;
//!
//! # async fn run() -> namewatch::error::Result<()> {
//! let config = Config::load("config.toml")?;
//! App::run(config).await
//! # }
//! ```

pub mod adapter;
pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod port;
