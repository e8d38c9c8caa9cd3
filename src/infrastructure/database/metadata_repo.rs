//! SQLite implementation of the metadata store.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

use crate::domain::errors::Result;
use crate::domain::ports::MetadataStore;

/// Statements delete at most this many ids per `IN` list.
const DELETE_CHUNK: usize = 500;

/// SQLite's bound-parameter ceiling; batch selects stay under it.
const BIND_LIMIT: usize = 999;

/// Metadata repository over one store's `metadata` table.
#[derive(Debug, Clone)]
pub struct MetadataRepo {
    pool: SqlitePool,
}

impl MetadataRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetadataStore for MetadataRepo {
    async fn insert_rows(&self, payloads: &[String]) -> Result<Vec<Option<i64>>> {
        if payloads.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(payloads.len());
        let mut inserted = 0usize;

        for payload in payloads {
            let length = payload.len() as i64;
            let result =
                sqlx::query("INSERT INTO metadata (metadata, metadata_length) VALUES (?, ?)")
                    .bind(payload)
                    .bind(length)
                    .execute(&mut *tx)
                    .await;
            match result {
                Ok(r) => {
                    ids.push(Some(r.last_insert_rowid()));
                    inserted += 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "metadata insert failed, skipping row");
                    ids.push(None);
                }
            }
        }

        if inserted == 0 {
            if let Err(e) = tx.rollback().await {
                tracing::warn!(error = %e, "rollback of empty insert batch failed");
            }
            return Ok(ids);
        }

        if let Err(e) = tx.commit().await {
            // Nothing persisted; report the whole batch as skipped.
            tracing::warn!(error = %e, "metadata insert commit failed");
            return Ok(vec![None; payloads.len()]);
        }

        Ok(ids)
    }

    async fn delete_ids(&self, ids: &[i64]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut deleted = 0u64;

        for chunk in ids.chunks(DELETE_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!("DELETE FROM metadata WHERE id IN ({placeholders})");
            let mut query = sqlx::query(&sql);
            for id in chunk {
                query = query.bind(id);
            }
            deleted += query.execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        tracing::debug!(requested = ids.len(), deleted, "metadata rows deleted");
        Ok(deleted)
    }

    async fn select_ids_where(&self, where_sql: &str) -> Result<Vec<i64>> {
        let sql = format!("SELECT id FROM metadata WHERE {where_sql} ORDER BY id");
        let ids = sqlx::query_scalar::<_, i64>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn fetch_metadata_batch(&self, ids: &[i64]) -> Result<HashMap<i64, String>> {
        let mut out = HashMap::with_capacity(ids.len());

        for chunk in ids.chunks(BIND_LIMIT) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT id, metadata, metadata_length FROM metadata WHERE id IN ({placeholders})"
            );
            let mut query = sqlx::query(&sql);
            for id in chunk {
                query = query.bind(id);
            }
            let rows = query.fetch_all(&self.pool).await?;
            for row in rows {
                let id: i64 = row.get("id");
                let payload: Option<String> = row.get("metadata");
                out.insert(id, payload.unwrap_or_else(|| "{}".to_string()));
            }
        }

        Ok(out)
    }

    async fn update_row(&self, id: i64, payload: &str) -> Result<bool> {
        let length = payload.len() as i64;
        let result =
            sqlx::query("UPDATE metadata SET metadata = ?, metadata_length = ? WHERE id = ?")
                .bind(payload)
                .bind(length)
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
