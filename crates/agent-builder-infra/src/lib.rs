//! Infrastructure layer for Agent Builder.
//!
//! Contains implementations of the ports defined in `agent-builder-core`:
//! the SQLite item store, the HTTP runtime client, and the config loader.

pub mod config;
pub mod runtime;
pub mod sqlite;
