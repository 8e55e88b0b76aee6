//! Shared domain types for Agent Builder.
//!
//! Agents, caller identity, pagination, item store records, configuration,
//! invocation requests, and their error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod agent;
pub mod config;
pub mod error;
pub mod invocation;
pub mod page;
pub mod storage;
pub mod user;
