//! Persistence layer
//!
//! SQLite-backed storage for the points ledger: the append-only transaction
//! log, per-user tier aggregates, daily activity records, community action
//! counters, the achievement catalog, and photo-challenge progress.

pub mod database;
pub mod ledger_store;
pub mod schema;

pub use database::{Database, DatabaseError};
pub use ledger_store::LedgerStore;
