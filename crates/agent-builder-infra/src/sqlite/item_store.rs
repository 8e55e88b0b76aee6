//! SQLite item store implementation.
//!
//! Implements `ItemStore` from `agent-builder-core` over the single `items`
//! table. Items are stored as JSON text; counters and partial updates use the
//! JSON1 functions so they happen inside one statement.

use agent_builder_core::storage::item_store::{ensure_distinct_keys, ItemStore};
use agent_builder_types::error::RepositoryError;
use agent_builder_types::storage::{Item, ItemKey, ItemPage, ItemQuery, WriteCondition, WriteOp};
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};

use super::pool::DatabasePool;

/// Keys per `batch_get` statement, well under SQLite's bind limit.
const BATCH_CHUNK: usize = 100;

/// SQLite-backed implementation of `ItemStore`.
#[derive(Clone)]
pub struct SqliteItemStore {
    pool: DatabasePool,
}

impl SqliteItemStore {
    /// Create a new item store backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct ItemRow {
    pk: String,
    sk: String,
    data: String,
}

impl ItemRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            pk: row.try_get("pk")?,
            sk: row.try_get("sk")?,
            data: row.try_get("data")?,
        })
    }

    fn into_item(self) -> Result<Item, RepositoryError> {
        let data = serde_json::from_str(&self.data)
            .map_err(|e| RepositoryError::Serialization(format!("invalid JSON item: {e}")))?;
        Ok(Item::new(ItemKey::new(self.pk, self.sk), data))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn query_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

fn encode(value: &serde_json::Value) -> Result<String, RepositoryError> {
    serde_json::to_string(value)
        .map_err(|e| RepositoryError::Serialization(format!("failed to serialize item: {e}")))
}

fn json_path(attribute: &str) -> String {
    format!("$.{attribute}")
}

async fn exists(conn: &mut SqliteConnection, key: &ItemKey) -> Result<bool, RepositoryError> {
    let row = sqlx::query("SELECT 1 FROM items WHERE pk = ? AND sk = ?")
        .bind(&key.pk)
        .bind(&key.sk)
        .fetch_optional(&mut *conn)
        .await
        .map_err(query_err)?;
    Ok(row.is_some())
}

async fn check_condition(
    conn: &mut SqliteConnection,
    key: &ItemKey,
    condition: WriteCondition,
) -> Result<(), RepositoryError> {
    let wanted = match condition {
        WriteCondition::None => return Ok(()),
        WriteCondition::Exists => true,
        WriteCondition::NotExists => false,
    };
    if exists(conn, key).await? == wanted {
        return Ok(());
    }
    let reason = if wanted { "does not exist" } else { "already exists" };
    Err(RepositoryError::ConditionFailed(format!(
        "{}/{} {reason}",
        key.pk, key.sk
    )))
}

async fn put_item(conn: &mut SqliteConnection, item: &Item) -> Result<(), RepositoryError> {
    sqlx::query(
        r#"INSERT INTO items (pk, sk, data) VALUES (?, ?, ?)
           ON CONFLICT (pk, sk) DO UPDATE SET data = excluded.data"#,
    )
    .bind(&item.key.pk)
    .bind(&item.key.sk)
    .bind(encode(&item.data)?)
    .execute(&mut *conn)
    .await
    .map_err(query_err)?;
    Ok(())
}

async fn delete_item(conn: &mut SqliteConnection, key: &ItemKey) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM items WHERE pk = ? AND sk = ?")
        .bind(&key.pk)
        .bind(&key.sk)
        .execute(&mut *conn)
        .await
        .map_err(query_err)?;
    Ok(())
}

async fn merge_item(
    conn: &mut SqliteConnection,
    key: &ItemKey,
    fields: &serde_json::Map<String, serde_json::Value>,
) -> Result<(), RepositoryError> {
    let patch = encode(&serde_json::Value::Object(fields.clone()))?;
    sqlx::query("UPDATE items SET data = json_patch(data, ?) WHERE pk = ? AND sk = ?")
        .bind(patch)
        .bind(&key.pk)
        .bind(&key.sk)
        .execute(&mut *conn)
        .await
        .map_err(query_err)?;
    Ok(())
}

async fn add_to_item(
    conn: &mut SqliteConnection,
    key: &ItemKey,
    attribute: &str,
    delta: i64,
) -> Result<Option<i64>, RepositoryError> {
    let path = json_path(attribute);
    let row = sqlx::query(
        r#"UPDATE items
           SET data = json_set(data, ?1, COALESCE(json_extract(data, ?1), 0) + ?2)
           WHERE pk = ?3 AND sk = ?4
           RETURNING json_extract(data, ?1) AS value"#,
    )
    .bind(&path)
    .bind(delta)
    .bind(&key.pk)
    .bind(&key.sk)
    .fetch_optional(&mut *conn)
    .await
    .map_err(query_err)?;

    match row {
        Some(row) => {
            let value: i64 = row.try_get("value").map_err(query_err)?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// ItemStore implementation
// ---------------------------------------------------------------------------

impl ItemStore for SqliteItemStore {
    async fn get(&self, key: &ItemKey) -> Result<Option<Item>, RepositoryError> {
        let row = sqlx::query("SELECT pk, sk, data FROM items WHERE pk = ? AND sk = ?")
            .bind(&key.pk)
            .bind(&key.sk)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        match row {
            Some(row) => {
                let item_row = ItemRow::from_row(&row).map_err(query_err)?;
                Ok(Some(item_row.into_item()?))
            }
            None => Ok(None),
        }
    }

    async fn batch_get(&self, keys: &[ItemKey]) -> Result<Vec<Item>, RepositoryError> {
        let mut items = Vec::with_capacity(keys.len());
        for chunk in keys.chunks(BATCH_CHUNK) {
            let mut qb: QueryBuilder<Sqlite> =
                QueryBuilder::new("SELECT pk, sk, data FROM items WHERE ");
            for (i, key) in chunk.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push("(pk = ");
                qb.push_bind(key.pk.clone());
                qb.push(" AND sk = ");
                qb.push_bind(key.sk.clone());
                qb.push(")");
            }

            let rows = qb
                .build()
                .fetch_all(&self.pool.reader)
                .await
                .map_err(query_err)?;
            for row in &rows {
                let item_row = ItemRow::from_row(row).map_err(query_err)?;
                items.push(item_row.into_item()?);
            }
        }
        Ok(items)
    }

    async fn put(&self, item: &Item) -> Result<(), RepositoryError> {
        let mut conn = self.pool.writer.acquire().await.map_err(query_err)?;
        put_item(&mut conn, item).await
    }

    async fn delete(&self, key: &ItemKey) -> Result<(), RepositoryError> {
        let mut conn = self.pool.writer.acquire().await.map_err(query_err)?;
        delete_item(&mut conn, key).await
    }

    async fn add(
        &self,
        key: &ItemKey,
        attribute: &str,
        delta: i64,
    ) -> Result<Option<i64>, RepositoryError> {
        let mut conn = self.pool.writer.acquire().await.map_err(query_err)?;
        add_to_item(&mut conn, key, attribute, delta).await
    }

    async fn query(&self, query: &ItemQuery) -> Result<ItemPage, RepositoryError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT pk, sk, data FROM items WHERE pk = ");
        qb.push_bind(query.pk.clone());
        qb.push(" AND substr(sk, 1, length(");
        qb.push_bind(query.sk_prefix.clone());
        qb.push(")) = ");
        qb.push_bind(query.sk_prefix.clone());

        if let Some(start) = &query.exclusive_start {
            qb.push(if query.descending { " AND sk < " } else { " AND sk > " });
            qb.push_bind(start.sk.clone());
        }

        qb.push(if query.descending {
            " ORDER BY sk DESC"
        } else {
            " ORDER BY sk ASC"
        });
        // One extra row tells whether another page exists.
        qb.push(" LIMIT ");
        qb.push_bind(i64::from(query.limit) + 1);

        let rows = qb
            .build()
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_err)?;

        let mut items = rows
            .iter()
            .map(|row| {
                ItemRow::from_row(row)
                    .map_err(query_err)
                    .and_then(ItemRow::into_item)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let limit = query.limit as usize;
        let last_key = if items.len() > limit {
            items.truncate(limit);
            items.last().map(|item| item.key.clone())
        } else {
            None
        };

        Ok(ItemPage { items, last_key })
    }

    async fn transact_write(&self, ops: Vec<WriteOp>) -> Result<(), RepositoryError> {
        ensure_distinct_keys(&ops)?;

        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        // All conditions are checked before anything is written, so a
        // failure leaves nothing to roll back.
        for op in &ops {
            match op {
                WriteOp::Put { item, condition } => {
                    check_condition(&mut tx, &item.key, *condition).await?
                }
                WriteOp::Delete { key, condition } | WriteOp::Merge { key, condition, .. } => {
                    check_condition(&mut tx, key, *condition).await?
                }
                WriteOp::Add { .. } => {}
            }
        }

        for op in &ops {
            match op {
                WriteOp::Put { item, .. } => put_item(&mut tx, item).await?,
                WriteOp::Delete { key, .. } => delete_item(&mut tx, key).await?,
                WriteOp::Merge { key, fields, .. } => merge_item(&mut tx, key, fields).await?,
                WriteOp::Add {
                    key,
                    attribute,
                    delta,
                } => {
                    add_to_item(&mut tx, key, attribute, *delta).await?;
                }
            }
        }

        tx.commit().await.map_err(query_err)?;
        Ok(())
    }
}
