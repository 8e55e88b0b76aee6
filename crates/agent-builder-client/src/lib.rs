//! Client library for the Agent Builder REST API.
//!
//! [`api::HttpAgentApi`] talks to the server. [`store::AgentStore`] keeps a
//! normalized cache of the owned, favorite and public lists and applies
//! mutations optimistically before the server confirms them.

pub mod api;
pub mod cache;
pub mod error;
pub mod store;

pub use api::{AgentApi, HttpAgentApi};
pub use cache::{AgentCache, ListKind, ListPhase, ListSnapshot};
pub use error::ClientError;
pub use store::{AgentStore, Mutation, Notice};
