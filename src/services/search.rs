//! Top-K similarity search.
//!
//! Streams the vector file in chunks, scores every admitted record with
//! the dot kernel, keeps the best K in a bounded min-heap, then joins
//! metadata for the survivors in one batched fetch.

use serde_json::Value;

use crate::domain::errors::{Result, StoreError};
use crate::domain::models::{FilterNode, SearchResult};
use crate::domain::ports::MetadataStore;
use crate::infrastructure::database::sql::where_clause;
use crate::infrastructure::vector::{dot, normalized, TopK, VectorFile};

/// Unfiltered top-K search.
pub async fn search(
    file: &mut VectorFile,
    store: &dyn MetadataStore,
    query: &[f32],
    top_k: usize,
) -> Result<Vec<SearchResult>> {
    run_search(file, store, query, top_k, None).await
}

/// Top-K search restricted to records whose metadata matches `filter`.
pub async fn search_filtered(
    file: &mut VectorFile,
    store: &dyn MetadataStore,
    query: &[f32],
    top_k: usize,
    filter: &Value,
) -> Result<Vec<SearchResult>> {
    run_search(file, store, query, top_k, Some(filter)).await
}

async fn run_search(
    file: &mut VectorFile,
    store: &dyn MetadataStore,
    query: &[f32],
    top_k: usize,
    filter: Option<&Value>,
) -> Result<Vec<SearchResult>> {
    if top_k == 0 {
        return Err(StoreError::InvalidArgument("top_k must be positive".into()));
    }
    if query.is_empty() {
        return Err(StoreError::InvalidArgument(
            "query vector must not be empty".into(),
        ));
    }

    let header = file.header();
    if header.vector_count == 0 || header.dimensions == 0 {
        return Ok(Vec::new());
    }
    if query.len() != header.dimensions as usize {
        return Err(StoreError::DimensionMismatch {
            expected: header.dimensions,
            got: query.len() as u32,
        });
    }

    // Resolve the admission set up front; an empty match short-circuits
    // the whole scan.
    let admitted: Option<Vec<i64>> = match filter {
        Some(doc) => {
            let node = FilterNode::parse(doc)?;
            let ids = store.select_ids_where(&where_clause(&node)).await?;
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            Some(ids)
        }
        None => None,
    };

    let query = normalized(query);
    let mut heap = TopK::new(top_k);

    let mut scanner = file.scan(0)?;
    while let Some(batch) = scanner.next_batch()? {
        for (id, vector) in batch.records() {
            if let Some(ids) = &admitted {
                if ids.binary_search(&id).is_err() {
                    continue;
                }
            }
            heap.consider(dot(&query, vector), id);
        }
    }

    let ranked = heap.into_sorted();
    let ids: Vec<i64> = ranked.iter().map(|(_, id)| *id).collect();
    let mut payloads = store.fetch_metadata_batch(&ids).await?;

    Ok(ranked
        .into_iter()
        .map(|(similarity, id)| SearchResult {
            id,
            similarity,
            metadata: payloads
                .remove(&id)
                .and_then(|raw| serde_json::from_str(&raw).ok())
                .unwrap_or_else(|| serde_json::json!({})),
        })
        .collect())
}
