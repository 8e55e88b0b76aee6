//! Request extractors: caller identity, pagination, and JSON bodies.

pub mod auth;
pub mod json;
pub mod query;
