//! Agent data access.
//!
//! The repository is the only code that knows the physical key layout; the
//! service layer above it works in agents, pages, and callers.

pub mod agent;
pub mod cursor;
pub mod keys;
