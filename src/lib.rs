//! Cosvec - embedded cosine-similarity vector database
//!
//! An exact brute-force top-K store for moderate collections of
//! fixed-dimension f32 vectors with:
//! - A flat binary vector file streamed through SIMD dot-product kernels
//! - L2 normalization on write, so dot product equals cosine similarity
//! - A SQLite metadata sidecar (WAL mode) with MongoDB-style filtering
//! - Temp-file + rename mutations and a process-wide connection registry
//!
//! # Example
//!
//! ```no_run
//! use serde_json::json;
//!
//! # async fn demo() -> cosvec::Result<()> {
//! let db = cosvec::connect("products.vec", Some(4)).await?;
//! db.insert(&[cosvec::VectorInsert::new(
//!     vec![0.1, 0.9, 0.0, 0.2],
//!     json!({"brand": "Pear"}),
//! )])
//! .await?;
//!
//! let hits = db
//!     .search_filtered(&[0.1, 0.9, 0.0, 0.2], 5, &json!({"brand": {"$eq": "Pear"}}))
//!     .await?;
//! # let _ = hits;
//! # Ok(())
//! # }
//! ```

pub mod domain;
pub mod infrastructure;
pub mod services;

mod database;
mod registry;

// Re-export the public surface.
pub use database::Database;
pub use domain::errors::{Result, StoreError};
pub use domain::models::{IndexStats, PageItem, SearchResult, UpdateItem, VectorInsert};
pub use registry::connect;
