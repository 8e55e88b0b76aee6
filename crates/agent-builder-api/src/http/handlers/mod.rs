//! HTTP request handlers for the REST API.

pub mod agent;
pub mod invoke;
