//! Item store trait.
//!
//! The key-value contract the agent repository is written against: a single
//! table of JSON items keyed by `(pk, sk)`, with batched reads, atomic
//! counters, cursor-paginated range queries, and all-or-nothing multi-item
//! writes. Implementations live in agent-builder-infra (SQLite) and in
//! [`super::memory`] (tests).

use agent_builder_types::error::RepositoryError;
use agent_builder_types::storage::{Item, ItemKey, ItemPage, ItemQuery, WriteOp};

/// Trait for single-table item persistence.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait ItemStore: Send + Sync {
    /// Get one item. Returns None if the key does not exist.
    fn get(
        &self,
        key: &ItemKey,
    ) -> impl std::future::Future<Output = Result<Option<Item>, RepositoryError>> + Send;

    /// Get several items in one round trip. Missing keys are omitted and the
    /// result order is unspecified.
    fn batch_get(
        &self,
        keys: &[ItemKey],
    ) -> impl std::future::Future<Output = Result<Vec<Item>, RepositoryError>> + Send;

    /// Write an item, replacing any previous item with the same key.
    fn put(
        &self,
        item: &Item,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete an item. No-op if the key does not exist.
    fn delete(
        &self,
        key: &ItemKey,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Atomically add `delta` to a numeric attribute of an existing item.
    ///
    /// Returns the new value, or None when the item does not exist (nothing
    /// is created).
    fn add(
        &self,
        key: &ItemKey,
        attribute: &str,
        delta: i64,
    ) -> impl std::future::Future<Output = Result<Option<i64>, RepositoryError>> + Send;

    /// Range query within one partition over a sort key prefix.
    fn query(
        &self,
        query: &ItemQuery,
    ) -> impl std::future::Future<Output = Result<ItemPage, RepositoryError>> + Send;

    /// Apply every operation or none of them.
    ///
    /// A failed precondition aborts the whole write with
    /// [`RepositoryError::ConditionFailed`]. Two operations on the same key
    /// in one call are rejected.
    fn transact_write(
        &self,
        ops: Vec<WriteOp>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}

/// Reject transactions that touch the same key twice.
pub fn ensure_distinct_keys(ops: &[WriteOp]) -> Result<(), RepositoryError> {
    let mut seen = std::collections::HashSet::with_capacity(ops.len());
    for op in ops {
        if !seen.insert(op.key()) {
            return Err(RepositoryError::Query(format!(
                "transaction touches {}/{} more than once",
                op.key().pk,
                op.key().sk
            )));
        }
    }
    Ok(())
}
