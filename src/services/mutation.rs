//! Insert, delete, and update.
//!
//! Every full rewrite of the vector file goes through a `.temp` sibling
//! that is renamed over the original once complete, so readers of the
//! path only ever observe a whole file. The metadata side runs under its
//! own transaction; a crash between the two leaves unreachable garbage,
//! never dangling references.

use serde_json::Value;
use std::collections::HashMap;

use crate::domain::errors::{Result, StoreError};
use crate::domain::models::{FilterNode, UpdateItem, VectorInsert};
use crate::domain::ports::MetadataStore;
use crate::infrastructure::database::sql::where_clause;
use crate::infrastructure::vector::{encode_record, normalize_in_place, VectorFile};

/// Insert a batch of records; returns how many made it in.
///
/// Records whose length disagrees with the fixed dimensions are skipped,
/// as are records whose metadata row fails to insert; the rest of the
/// batch proceeds. The first insert into an empty store fixes the
/// dimensionality for good.
pub async fn insert(
    file: &mut VectorFile,
    store: &dyn MetadataStore,
    records: &[VectorInsert],
) -> Result<u64> {
    if records.is_empty() {
        return Ok(0);
    }

    let header = file.header();
    let target_dims = if header.dimensions != 0 {
        header.dimensions
    } else {
        records
            .iter()
            .map(|r| r.vector.len() as u32)
            .find(|d| *d != 0)
            .unwrap_or(0)
    };
    if target_dims == 0 {
        return Err(StoreError::InvalidArgument(
            "cannot insert empty vectors".into(),
        ));
    }

    let valid: Vec<&VectorInsert> = records
        .iter()
        .filter(|r| {
            let ok = r.vector.len() == target_dims as usize;
            if !ok {
                tracing::warn!(
                    expected = target_dims,
                    got = r.vector.len(),
                    "dimension mismatch, skipping record"
                );
            }
            ok
        })
        .collect();
    if valid.is_empty() {
        return Ok(0);
    }

    let payloads: Vec<String> = valid
        .iter()
        .map(|r| serde_json::to_string(&r.metadata))
        .collect::<std::result::Result<_, _>>()?;
    let ids = store.insert_rows(&payloads).await?;

    let mut scratch = Vec::new();
    let mut inserted = 0u32;
    for (record, id) in valid.iter().zip(ids) {
        let Some(id) = id else { continue };
        let mut vector = record.vector.clone();
        normalize_in_place(&mut vector);
        encode_record(&mut scratch, id, &vector);
        inserted += 1;
    }
    if inserted == 0 {
        return Ok(0);
    }

    let mut temp = file.open_temp_copy()?;
    let mut header = temp.header();
    temp.append_records(&scratch)?;
    header.vector_count += inserted;
    if header.dimensions == 0 {
        header.dimensions = target_dims;
    }
    temp.write_header(header)?;
    file.replace_with(temp)?;

    tracing::debug!(inserted, total = header.vector_count, "records inserted");
    Ok(u64::from(inserted))
}

/// Remove records by id, compacting the vector file.
///
/// Returns the number of records actually removed from the file (ids
/// absent from the file contribute nothing to the count).
pub async fn delete_by_ids(
    file: &mut VectorFile,
    store: &dyn MetadataStore,
    ids: &[i64],
) -> Result<u64> {
    if ids.is_empty() {
        return Err(StoreError::InvalidArgument(
            "id list must not be empty".into(),
        ));
    }

    let mut sorted = ids.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let original_count = u64::from(file.header().vector_count);
    let mut temp = file.create_temp_empty()?;
    let mut kept = Vec::new();
    let mut preserved = 0u32;

    {
        let mut scanner = file.scan(0)?;
        while let Some(batch) = scanner.next_batch()? {
            kept.clear();
            for (id, vector) in batch.records() {
                if sorted.binary_search(&id).is_err() {
                    encode_record(&mut kept, id, vector);
                    preserved += 1;
                }
            }
            if !kept.is_empty() {
                temp.append_records(&kept)?;
            }
        }
    }

    let mut header = temp.header();
    header.vector_count = preserved;
    temp.write_header(header)?;

    store.delete_ids(&sorted).await?;
    file.replace_with(temp)?;

    let removed = original_count - u64::from(preserved);
    tracing::debug!(removed, preserved, "records deleted by id");
    Ok(removed)
}

/// Remove every record whose metadata matches `filter`.
pub async fn delete_by_filter(
    file: &mut VectorFile,
    store: &dyn MetadataStore,
    filter: &Value,
) -> Result<u64> {
    let node = FilterNode::parse(filter)?;
    let ids = store.select_ids_where(&where_clause(&node)).await?;
    if ids.is_empty() {
        return Ok(0);
    }
    delete_by_ids(file, store, &ids).await
}

/// Apply per-id updates; returns how many items had at least one change
/// written.
///
/// The vector component is rewritten in place at its record's offset;
/// metadata goes through a row UPDATE. Items whose id is not present in
/// the vector file are skipped, as are items carrying neither field.
pub async fn update(
    file: &mut VectorFile,
    store: &dyn MetadataStore,
    items: &[UpdateItem],
) -> Result<u64> {
    if items.is_empty() {
        return Ok(0);
    }

    let dims = file.header().dimensions as usize;

    // One streaming pass maps requested ids to their record positions
    // before any write happens.
    let mut wanted: Vec<i64> = items.iter().map(|i| i.id).collect();
    wanted.sort_unstable();
    wanted.dedup();
    let mut positions: HashMap<i64, u64> = HashMap::with_capacity(wanted.len());
    {
        let mut index = 0u64;
        let mut scanner = file.scan(0)?;
        while let Some(batch) = scanner.next_batch()? {
            for (id, _) in batch.records() {
                if wanted.binary_search(&id).is_ok() {
                    positions.entry(id).or_insert(index);
                }
                index += 1;
            }
        }
    }

    let mut applied = 0u64;
    let mut wrote_vectors = false;
    for item in items {
        let Some(&index) = positions.get(&item.id) else {
            tracing::warn!(id = item.id, "update target not in vector file, skipping");
            continue;
        };

        let mut changed = false;
        if let Some(vector) = &item.vector {
            if vector.len() == dims {
                let mut vector = vector.clone();
                normalize_in_place(&mut vector);
                file.overwrite_vector(index, &vector)?;
                wrote_vectors = true;
                changed = true;
            } else {
                tracing::warn!(
                    id = item.id,
                    expected = dims,
                    got = vector.len(),
                    "dimension mismatch, vector not updated"
                );
            }
        }
        if let Some(metadata) = &item.metadata {
            let payload = serde_json::to_string(metadata)?;
            if store.update_row(item.id, &payload).await? {
                changed = true;
            }
        }
        if changed {
            applied += 1;
        }
    }

    if wrote_vectors {
        file.sync()?;
    }
    tracing::debug!(applied, requested = items.len(), "records updated");
    Ok(applied)
}
