//! Business logic and port definitions for Agent Builder.
//!
//! This crate defines the "ports" (`ItemStore`, `AgentRuntime`) that the
//! infrastructure layer implements, plus the agent repository and services
//! written against them. It depends only on `agent-builder-types`, never on
//! `agent-builder-infra` or any database/IO crate.

pub mod invocation;
pub mod repository;
pub mod service;
pub mod storage;
