//! End-to-end mutation behavior: insert, delete, update, pagination.

use cosvec::{connect, Database, UpdateItem, VectorInsert};
use serde_json::json;
use std::collections::HashSet;
use std::path::PathBuf;
use tempfile::TempDir;

async fn fresh_db(dimensions: u32) -> (TempDir, PathBuf, Database) {
    let dir = tempfile::tempdir().expect("failed to create tempdir");
    let path = dir.path().join("store.vec");
    let db = connect(&path, Some(dimensions))
        .await
        .expect("failed to connect");
    (dir, path, db)
}

fn unit_vec(dimensions: usize, hot: usize) -> Vec<f32> {
    let mut v = vec![0.0; dimensions];
    v[hot % dimensions] = 1.0;
    v
}

#[tokio::test]
async fn test_count_invariant_and_file_size() {
    let (_dir, path, db) = fresh_db(4).await;

    let records: Vec<VectorInsert> = (0..10)
        .map(|i| VectorInsert::new(unit_vec(4, i), json!({"i": i})))
        .collect();
    let inserted = db.insert(&records).await.expect("insert failed");
    assert_eq!(inserted, 10);

    let deleted = db.delete_by_ids(&[1, 2, 3]).await.expect("delete failed");
    assert_eq!(deleted, 3);

    let stats = db.stats().await;
    assert_eq!(stats.vector_count, 7);
    assert_eq!(stats.dimensions, 4);

    let file_len = std::fs::metadata(&path).unwrap().len();
    assert_eq!(file_len, 8 + 7 * (4 + 1) * 4);
}

#[tokio::test]
async fn test_dimension_fixedness() {
    let (_dir, _path, db) = fresh_db(4).await;

    db.insert(&[VectorInsert::new(unit_vec(4, 0), json!({}))])
        .await
        .unwrap();

    // A wrong-length vector is skipped, not inserted.
    let inserted = db
        .insert(&[VectorInsert::new(vec![1.0, 0.0, 0.0], json!({}))])
        .await
        .unwrap();
    assert_eq!(inserted, 0);
    assert_eq!(db.stats().await.vector_count, 1);
}

#[tokio::test]
async fn test_mixed_batch_inserts_matching_records() {
    let (_dir, _path, db) = fresh_db(3).await;

    let inserted = db
        .insert(&[
            VectorInsert::new(vec![1.0, 0.0, 0.0], json!({"ok": 1})),
            VectorInsert::new(vec![1.0, 0.0], json!({"bad": true})),
            VectorInsert::new(vec![0.0, 1.0, 0.0], json!({"ok": 2})),
        ])
        .await
        .unwrap();

    assert_eq!(inserted, 2);
    assert_eq!(db.stats().await.vector_count, 2);
}

#[tokio::test]
async fn test_first_insert_fixes_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    let db = connect(dir.path().join("late.vec"), None)
        .await
        .expect("failed to connect");
    assert_eq!(db.stats().await.dimensions, 0);

    db.insert(&[VectorInsert::new(vec![0.0, 1.0, 0.0, 0.0, 0.0], json!({}))])
        .await
        .unwrap();

    let stats = db.stats().await;
    assert_eq!(stats.dimensions, 5);
    assert_eq!(stats.vector_count, 1);
}

#[tokio::test]
async fn test_delete_compacts_and_hides_ids() {
    let (_dir, _path, db) = fresh_db(2).await;

    let records: Vec<VectorInsert> = (0..10)
        .map(|i| VectorInsert::new(vec![1.0, i as f32 / 10.0], json!({"i": i})))
        .collect();
    db.insert(&records).await.unwrap();

    let deleted = db.delete_by_ids(&[2, 5, 7]).await.unwrap();
    assert_eq!(deleted, 3);
    assert_eq!(db.stats().await.vector_count, 7);

    let hits = db.search(&[1.0, 0.5], 10).await.unwrap();
    assert_eq!(hits.len(), 7);
    let ids: HashSet<i64> = hits.iter().map(|h| h.id).collect();
    assert!(!ids.contains(&2));
    assert!(!ids.contains(&5));
    assert!(!ids.contains(&7));
}

#[tokio::test]
async fn test_delete_ignores_unknown_ids() {
    let (_dir, _path, db) = fresh_db(2).await;

    db.insert(&[
        VectorInsert::new(vec![1.0, 0.0], json!({})),
        VectorInsert::new(vec![0.0, 1.0], json!({})),
    ])
    .await
    .unwrap();

    // Only id 1 exists in the file; the count reflects actual removals.
    let deleted = db.delete_by_ids(&[1, 100, 200]).await.unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(db.stats().await.vector_count, 1);
}

#[tokio::test]
async fn test_delete_requires_ids() {
    let (_dir, _path, db) = fresh_db(2).await;
    assert!(db.delete_by_ids(&[]).await.is_err());
}

#[tokio::test]
async fn test_delete_by_filter() {
    let (_dir, _path, db) = fresh_db(2).await;

    db.insert(&[
        VectorInsert::new(vec![1.0, 0.0], json!({"brand": "Pear"})),
        VectorInsert::new(vec![0.9, 0.1], json!({"brand": "Pear"})),
        VectorInsert::new(vec![0.0, 1.0], json!({"brand": "Nexus"})),
    ])
    .await
    .unwrap();

    let deleted = db
        .delete_by_filter(&json!({"brand": {"$eq": "Pear"}}))
        .await
        .unwrap();
    assert_eq!(deleted, 2);

    let hits = db.search(&[1.0, 0.0], 10).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].metadata["brand"], "Nexus");
}

#[tokio::test]
async fn test_delete_by_filter_without_matches() {
    let (_dir, _path, db) = fresh_db(2).await;
    db.insert(&[VectorInsert::new(vec![1.0, 0.0], json!({"brand": "Pear"}))])
        .await
        .unwrap();

    let deleted = db
        .delete_by_filter(&json!({"brand": {"$eq": "Nonesuch"}}))
        .await
        .unwrap();
    assert_eq!(deleted, 0);
    assert_eq!(db.stats().await.vector_count, 1);
}

#[tokio::test]
async fn test_pagination_after_deletes() {
    let (_dir, _path, db) = fresh_db(2).await;

    let records: Vec<VectorInsert> = (0..100)
        .map(|i| VectorInsert::new(vec![1.0, i as f32], json!({"i": i})))
        .collect();
    db.insert(&records).await.unwrap();

    // Drop twenty arbitrary ids.
    let doomed: Vec<i64> = (1..=100).filter(|id| id % 5 == 0).collect();
    assert_eq!(doomed.len(), 20);
    db.delete_by_ids(&doomed).await.unwrap();

    let mut seen = Vec::new();
    let mut sizes = Vec::new();
    let mut skip = 0;
    loop {
        let page = db.get_paginated(skip, 30).await.unwrap();
        if page.is_empty() {
            break;
        }
        sizes.push(page.len());
        seen.extend(page.iter().map(|item| item.id));
        skip += page.len() as u64;
    }

    assert_eq!(sizes, vec![30, 30, 20]);
    let unique: HashSet<i64> = seen.iter().copied().collect();
    assert_eq!(unique.len(), 80);
    assert!(doomed.iter().all(|id| !unique.contains(id)));
    // File order is preserved across the compaction.
    let mut sorted = seen.clone();
    sorted.sort_unstable();
    assert_eq!(seen, sorted);
}

#[tokio::test]
async fn test_pagination_returns_vectors_and_metadata() {
    let (_dir, _path, db) = fresh_db(2).await;

    db.insert(&[
        VectorInsert::new(vec![3.0, 4.0], json!({"name": "a"})),
        VectorInsert::new(vec![1.0, 0.0], json!({"name": "b"})),
    ])
    .await
    .unwrap();

    let page = db.get_paginated(0, 10).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].id, 1);
    assert_eq!(page[0].metadata, json!({"name": "a"}));
    // Stored vectors are normalized.
    assert!((page[0].vector[0] - 0.6).abs() < 1e-5);
    assert!((page[0].vector[1] - 0.8).abs() < 1e-5);
}

#[tokio::test]
async fn test_pagination_bounds() {
    let (_dir, _path, db) = fresh_db(2).await;
    db.insert(&[VectorInsert::new(vec![1.0, 0.0], json!({}))])
        .await
        .unwrap();

    assert!(db.get_paginated(0, 0).await.is_err());
    assert!(db.get_paginated(5, 10).await.unwrap().is_empty());
    assert_eq!(db.get_paginated(0, 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_vector_redirects_search() {
    let (_dir, _path, db) = fresh_db(2).await;

    db.insert(&[
        VectorInsert::new(vec![1.0, 0.0], json!({"n": 1})),
        VectorInsert::new(vec![0.0, 1.0], json!({"n": 2})),
    ])
    .await
    .unwrap();

    // Point record 1 the other way.
    let applied = db
        .update(&[UpdateItem::vector_only(1, vec![0.0, 1.0])])
        .await
        .unwrap();
    assert_eq!(applied, 1);

    let hits = db.search(&[0.0, 1.0], 2).await.unwrap();
    assert!((hits[0].similarity - 1.0).abs() < 1e-5);
    assert!((hits[1].similarity - 1.0).abs() < 1e-5);

    let hits = db.search(&[1.0, 0.0], 1).await.unwrap();
    assert!(hits[0].similarity.abs() < 1e-5);
}

#[tokio::test]
async fn test_update_metadata_only() {
    let (_dir, _path, db) = fresh_db(2).await;

    db.insert(&[VectorInsert::new(vec![1.0, 0.0], json!({"v": 1}))])
        .await
        .unwrap();

    let applied = db
        .update(&[UpdateItem::metadata_only(1, json!({"v": 2}))])
        .await
        .unwrap();
    assert_eq!(applied, 1);

    let hits = db.search(&[1.0, 0.0], 1).await.unwrap();
    assert_eq!(hits[0].metadata, json!({"v": 2}));
}

#[tokio::test]
async fn test_update_skips_missing_and_empty_items() {
    let (_dir, _path, db) = fresh_db(2).await;

    db.insert(&[VectorInsert::new(vec![1.0, 0.0], json!({}))])
        .await
        .unwrap();

    let applied = db
        .update(&[
            // Unknown id.
            UpdateItem::metadata_only(42, json!({"x": 1})),
            // Neither field set.
            UpdateItem {
                id: 1,
                vector: None,
                metadata: None,
            },
        ])
        .await
        .unwrap();
    assert_eq!(applied, 0);
}

#[tokio::test]
async fn test_update_both_fields() {
    let (_dir, _path, db) = fresh_db(2).await;

    db.insert(&[VectorInsert::new(vec![1.0, 0.0], json!({"gen": 1}))])
        .await
        .unwrap();

    let applied = db
        .update(&[UpdateItem {
            id: 1,
            vector: Some(vec![0.0, 2.0]),
            metadata: Some(json!({"gen": 2})),
        }])
        .await
        .unwrap();
    assert_eq!(applied, 1);

    let hits = db.search(&[0.0, 1.0], 1).await.unwrap();
    assert_eq!(hits[0].id, 1);
    assert!((hits[0].similarity - 1.0).abs() < 1e-5);
    assert_eq!(hits[0].metadata, json!({"gen": 2}));
}

#[tokio::test]
async fn test_ids_keep_growing_after_delete() {
    let (_dir, _path, db) = fresh_db(2).await;

    db.insert(&[
        VectorInsert::new(vec![1.0, 0.0], json!({})),
        VectorInsert::new(vec![0.0, 1.0], json!({})),
    ])
    .await
    .unwrap();
    db.delete_by_ids(&[2]).await.unwrap();

    db.insert(&[VectorInsert::new(vec![0.5, 0.5], json!({}))])
        .await
        .unwrap();

    // AUTOINCREMENT never hands id 2 back out.
    let ids: HashSet<i64> = db
        .search(&[1.0, 1.0], 10)
        .await
        .unwrap()
        .iter()
        .map(|h| h.id)
        .collect();
    assert_eq!(ids, HashSet::from([1, 3]));
}

#[tokio::test]
async fn test_reconnect_preserves_data() {
    let (_dir, path, db) = fresh_db(3).await;

    db.insert(&[VectorInsert::new(vec![1.0, 0.0, 0.0], json!({"keep": true}))])
        .await
        .unwrap();

    // Reconnecting to the same path must not truncate anything.
    let again = connect(&path, None).await.unwrap();
    let stats = again.stats().await;
    assert_eq!(stats.vector_count, 1);
    assert_eq!(stats.dimensions, 3);

    let hits = again.search(&[1.0, 0.0, 0.0], 1).await.unwrap();
    assert_eq!(hits[0].metadata, json!({"keep": true}));
}

#[tokio::test]
async fn test_no_temp_file_left_after_mutations() {
    let (_dir, path, db) = fresh_db(2).await;

    db.insert(&[VectorInsert::new(vec![1.0, 0.0], json!({}))])
        .await
        .unwrap();
    db.delete_by_ids(&[1]).await.unwrap();

    let mut temp = path.as_os_str().to_os_string();
    temp.push(".temp");
    assert!(!PathBuf::from(temp).exists());
}
