//! HTTP/REST API layer for Agent Builder.
//!
//! Axum-based REST API with caller identity taken from authorizer headers,
//! plain JSON bodies, and permissive CORS.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;
