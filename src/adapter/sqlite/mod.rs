//! SQLite persistence adapter (Diesel ORM).

mod connection;
mod model;
mod schema;
mod store;

pub use connection::{create_pool, run_migrations, DbPool, MIGRATIONS};
pub use store::SqliteStore;
