//! Core record and result types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One vector queued for insertion, with its JSON metadata payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorInsert {
    /// Vector components. Normalized in place before hitting disk.
    pub vector: Vec<f32>,
    /// Arbitrary JSON metadata stored alongside the vector.
    pub metadata: Value,
}

impl VectorInsert {
    pub fn new(vector: Vec<f32>, metadata: Value) -> Self {
        Self { vector, metadata }
    }
}

/// One similarity-search hit, ordered by descending similarity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Store-assigned id of the matching vector.
    pub id: i64,
    /// Cosine similarity to the query, in [-1, 1] within rounding.
    pub similarity: f32,
    /// Parsed metadata; `{}` when the row is missing.
    pub metadata: Value,
}

/// One item of a pagination slice, in file order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageItem {
    pub id: i64,
    /// Owned copy of the stored (normalized) vector.
    pub vector: Vec<f32>,
    /// Parsed metadata; `{}` when the row is missing.
    pub metadata: Value,
}

/// One update request. At least one of `vector` / `metadata` must be set
/// for the item to count as applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateItem {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl UpdateItem {
    pub fn vector_only(id: i64, vector: Vec<f32>) -> Self {
        Self {
            id,
            vector: Some(vector),
            metadata: None,
        }
    }

    pub fn metadata_only(id: i64, metadata: Value) -> Self {
        Self {
            id,
            vector: None,
            metadata: Some(metadata),
        }
    }
}

/// Snapshot of the vector file header plus derived layout info.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of records currently stored.
    pub vector_count: u32,
    /// Fixed dimensionality; 0 until the first insert fixes it.
    pub dimensions: u32,
    /// On-disk bytes per record: `(dimensions + 1) * 4`.
    pub record_stride: u32,
}
