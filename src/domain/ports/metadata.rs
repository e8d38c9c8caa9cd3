//! Metadata store port.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::errors::Result;

/// Persistence interface for the metadata sidecar.
///
/// Payloads cross this boundary as raw JSON text; `metadata_length` is the
/// payload's byte length. Row ids are engine-assigned and monotonically
/// increasing, and double as vector ids in the vector file.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert a batch of payloads inside one transaction.
    ///
    /// Returns one entry per input payload: the assigned id, or `None`
    /// for rows that failed (the rest of the batch still commits). A
    /// batch where every row failed is rolled back.
    async fn insert_rows(&self, payloads: &[String]) -> Result<Vec<Option<i64>>>;

    /// Delete rows by id, chunked under a single transaction.
    ///
    /// Returns the number of rows actually removed.
    async fn delete_ids(&self, ids: &[i64]) -> Result<u64>;

    /// Ids of rows matching a rendered WHERE fragment, ascending.
    async fn select_ids_where(&self, where_sql: &str) -> Result<Vec<i64>>;

    /// Fetch payloads for a set of ids. Missing ids are absent from the
    /// returned map; callers substitute `{}`.
    async fn fetch_metadata_batch(&self, ids: &[i64]) -> Result<HashMap<i64, String>>;

    /// Replace one row's payload. Returns false when the id is unknown.
    async fn update_row(&self, id: i64, payload: &str) -> Result<bool>;
}
