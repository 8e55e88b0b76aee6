//! SQLite storage layer.
//!
//! The single-table item store backed by SQLite with WAL mode and split
//! read/write connection pools.

pub mod item_store;
pub mod pool;
