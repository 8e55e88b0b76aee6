//! In-memory item store.
//!
//! A `BTreeMap` ordered by `(pk, sk)` behind a tokio `RwLock`. Range queries
//! walk the map in key order, so they behave like the SQLite store's indexed
//! scans. Used by repository and service tests, and handy for local runs.

use std::collections::BTreeMap;
use std::sync::Arc;

use agent_builder_types::error::RepositoryError;
use agent_builder_types::storage::{Item, ItemKey, ItemPage, ItemQuery, WriteCondition, WriteOp};
use tokio::sync::RwLock;

use super::item_store::{ensure_distinct_keys, ItemStore};

/// Cloneable in-memory [`ItemStore`]; clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryItemStore {
    data: Arc<RwLock<BTreeMap<ItemKey, serde_json::Value>>>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items (all partitions).
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }
}

fn check_condition(
    data: &BTreeMap<ItemKey, serde_json::Value>,
    key: &ItemKey,
    condition: WriteCondition,
) -> Result<(), RepositoryError> {
    let exists = data.contains_key(key);
    match condition {
        WriteCondition::None => Ok(()),
        WriteCondition::Exists if exists => Ok(()),
        WriteCondition::NotExists if !exists => Ok(()),
        WriteCondition::Exists => Err(RepositoryError::ConditionFailed(format!(
            "{}/{} does not exist",
            key.pk, key.sk
        ))),
        WriteCondition::NotExists => Err(RepositoryError::ConditionFailed(format!(
            "{}/{} already exists",
            key.pk, key.sk
        ))),
    }
}

fn add_to(value: &mut serde_json::Value, attribute: &str, delta: i64) -> Result<i64, RepositoryError> {
    let obj = value
        .as_object_mut()
        .ok_or_else(|| RepositoryError::Query("item is not a JSON object".to_string()))?;
    let current = obj.get(attribute).and_then(|v| v.as_i64()).unwrap_or(0);
    let next = current + delta;
    obj.insert(attribute.to_string(), serde_json::Value::from(next));
    Ok(next)
}

fn merge_into(
    value: &mut serde_json::Value,
    fields: &serde_json::Map<String, serde_json::Value>,
) -> Result<(), RepositoryError> {
    let obj = value
        .as_object_mut()
        .ok_or_else(|| RepositoryError::Query("item is not a JSON object".to_string()))?;
    for (k, v) in fields {
        obj.insert(k.clone(), v.clone());
    }
    Ok(())
}

impl ItemStore for MemoryItemStore {
    async fn get(&self, key: &ItemKey) -> Result<Option<Item>, RepositoryError> {
        let data = self.data.read().await;
        Ok(data.get(key).map(|v| Item::new(key.clone(), v.clone())))
    }

    async fn batch_get(&self, keys: &[ItemKey]) -> Result<Vec<Item>, RepositoryError> {
        let data = self.data.read().await;
        let mut items = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(v) = data.get(key) {
                if !items.iter().any(|i: &Item| &i.key == key) {
                    items.push(Item::new(key.clone(), v.clone()));
                }
            }
        }
        Ok(items)
    }

    async fn put(&self, item: &Item) -> Result<(), RepositoryError> {
        let mut data = self.data.write().await;
        data.insert(item.key.clone(), item.data.clone());
        Ok(())
    }

    async fn delete(&self, key: &ItemKey) -> Result<(), RepositoryError> {
        let mut data = self.data.write().await;
        data.remove(key);
        Ok(())
    }

    async fn add(
        &self,
        key: &ItemKey,
        attribute: &str,
        delta: i64,
    ) -> Result<Option<i64>, RepositoryError> {
        let mut data = self.data.write().await;
        match data.get_mut(key) {
            Some(value) => add_to(value, attribute, delta).map(Some),
            None => Ok(None),
        }
    }

    async fn query(&self, query: &ItemQuery) -> Result<ItemPage, RepositoryError> {
        let data = self.data.read().await;
        let start = ItemKey::new(query.pk.clone(), query.sk_prefix.clone());

        let mut matching: Vec<(&ItemKey, &serde_json::Value)> = data
            .range(start..)
            .take_while(|(k, _)| k.pk == query.pk && k.sk.starts_with(&query.sk_prefix))
            .collect();
        if query.descending {
            matching.reverse();
        }

        let after_start = matching.into_iter().filter(|(k, _)| match &query.exclusive_start {
            Some(s) if query.descending => k.sk < s.sk,
            Some(s) => k.sk > s.sk,
            None => true,
        });

        let limit = query.limit as usize;
        let mut items: Vec<Item> = after_start
            .take(limit + 1)
            .map(|(k, v)| Item::new(k.clone(), v.clone()))
            .collect();

        let last_key = if items.len() > limit {
            items.truncate(limit);
            items.last().map(|i| i.key.clone())
        } else {
            None
        };

        Ok(ItemPage { items, last_key })
    }

    async fn transact_write(&self, ops: Vec<WriteOp>) -> Result<(), RepositoryError> {
        ensure_distinct_keys(&ops)?;
        let mut data = self.data.write().await;

        // All conditions are checked before anything is applied.
        for op in &ops {
            match op {
                WriteOp::Put { item, condition } => check_condition(&data, &item.key, *condition)?,
                WriteOp::Delete { key, condition } | WriteOp::Merge { key, condition, .. } => {
                    check_condition(&data, key, *condition)?
                }
                WriteOp::Add { .. } => {}
            }
        }

        for op in ops {
            match op {
                WriteOp::Put { item, .. } => {
                    data.insert(item.key, item.data);
                }
                WriteOp::Delete { key, .. } => {
                    data.remove(&key);
                }
                WriteOp::Merge { key, fields, .. } => {
                    if let Some(value) = data.get_mut(&key) {
                        merge_into(value, &fields)?;
                    }
                }
                WriteOp::Add {
                    key,
                    attribute,
                    delta,
                } => {
                    if let Some(value) = data.get_mut(&key) {
                        add_to(value, &attribute, delta)?;
                    }
                }
            }
        }

        Ok(())
    }
}
