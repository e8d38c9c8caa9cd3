//! Offset/limit pagination over the vector file.
//!
//! Pages come back in file order, which is insertion order until a
//! delete compacts the body. Vectors are copied out of the transient
//! scan buffer; metadata is joined in one batched fetch.

use crate::domain::errors::{Result, StoreError};
use crate::domain::models::PageItem;
use crate::domain::ports::MetadataStore;
use crate::infrastructure::vector::VectorFile;

/// Fetch the `[skip, skip + limit)` slice of records.
pub async fn get_page(
    file: &mut VectorFile,
    store: &dyn MetadataStore,
    skip: u64,
    limit: u64,
) -> Result<Vec<PageItem>> {
    if limit == 0 {
        return Err(StoreError::InvalidArgument("limit must be positive".into()));
    }

    let header = file.header();
    let count = u64::from(header.vector_count);
    if count == 0 || skip >= count {
        return Ok(Vec::new());
    }
    let limit = limit.min(count - skip);

    let mut items = Vec::with_capacity(usize::try_from(limit).unwrap_or_default());
    {
        let mut scanner = file.scan(skip)?;
        'outer: while let Some(batch) = scanner.next_batch()? {
            for (id, vector) in batch.records() {
                items.push(PageItem {
                    id,
                    vector: vector.to_vec(),
                    metadata: serde_json::json!({}),
                });
                if items.len() as u64 == limit {
                    break 'outer;
                }
            }
        }
    }

    let ids: Vec<i64> = items.iter().map(|item| item.id).collect();
    let mut payloads = store.fetch_metadata_batch(&ids).await?;
    for item in &mut items {
        if let Some(raw) = payloads.remove(&item.id) {
            item.metadata = serde_json::from_str(&raw).unwrap_or_else(|_| serde_json::json!({}));
        }
    }

    Ok(items)
}
