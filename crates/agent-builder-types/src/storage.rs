//! Item store types.
//!
//! The store is a single table of JSON items addressed by a composite
//! `(pk, sk)` key. Range queries run inside one partition (`pk`) over a sort
//! key prefix, and continue from an exclusive start key.

use serde::{Deserialize, Serialize};

/// Composite primary key of a stored item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey {
    pub pk: String,
    pub sk: String,
}

impl ItemKey {
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
        }
    }
}

/// A stored item: its key plus a JSON object of attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub key: ItemKey,
    pub data: serde_json::Value,
}

impl Item {
    pub fn new(key: ItemKey, data: serde_json::Value) -> Self {
        Self { key, data }
    }
}

/// Range query within one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemQuery {
    pub pk: String,
    /// Only sort keys starting with this prefix match.
    pub sk_prefix: String,
    pub limit: u32,
    /// Continue after this key (exclusive).
    pub exclusive_start: Option<ItemKey>,
    /// Sort key order; `true` returns the largest sort keys first.
    pub descending: bool,
}

/// One page of a range query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemPage {
    pub items: Vec<Item>,
    /// Key of the last returned item, set only when more items remain.
    pub last_key: Option<ItemKey>,
}

/// Precondition attached to a transactional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteCondition {
    #[default]
    None,
    /// The item must already exist.
    Exists,
    /// The item must not exist yet.
    NotExists,
}

/// One element of an all-or-nothing multi-item write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Put {
        item: Item,
        condition: WriteCondition,
    },
    Delete {
        key: ItemKey,
        condition: WriteCondition,
    },
    /// Set top-level attributes on an existing item, leaving the others
    /// untouched. A missing item fails an `Exists` condition and is otherwise
    /// skipped.
    Merge {
        key: ItemKey,
        fields: serde_json::Map<String, serde_json::Value>,
        condition: WriteCondition,
    },
    /// Atomically add `delta` to a numeric attribute. Skipped when the item
    /// does not exist.
    Add {
        key: ItemKey,
        attribute: String,
        delta: i64,
    },
}

impl WriteOp {
    pub fn put(item: Item) -> Self {
        WriteOp::Put {
            item,
            condition: WriteCondition::None,
        }
    }

    pub fn delete(key: ItemKey) -> Self {
        WriteOp::Delete {
            key,
            condition: WriteCondition::None,
        }
    }

    pub fn merge(
        key: ItemKey,
        fields: serde_json::Map<String, serde_json::Value>,
        condition: WriteCondition,
    ) -> Self {
        WriteOp::Merge {
            key,
            fields,
            condition,
        }
    }

    pub fn add(key: ItemKey, attribute: impl Into<String>, delta: i64) -> Self {
        WriteOp::Add {
            key,
            attribute: attribute.into(),
            delta,
        }
    }

    pub fn key(&self) -> &ItemKey {
        match self {
            WriteOp::Put { item, .. } => &item.key,
            WriteOp::Delete { key, .. } | WriteOp::Merge { key, .. } | WriteOp::Add { key, .. } => {
                key
            }
        }
    }
}
