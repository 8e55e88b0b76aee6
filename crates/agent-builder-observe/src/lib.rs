//! Logging and trace export setup for Agent Builder binaries.

pub mod tracing_setup;
