//! Storage abstractions for Agent Builder.
//!
//! Defines the single-table item store trait the repository is written
//! against, plus an in-memory implementation. The SQLite implementation lives
//! in agent-builder-infra.

pub mod item_store;
pub mod memory;
