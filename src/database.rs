//! The public database handle.

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::errors::Result;
use crate::domain::models::{IndexStats, PageItem, SearchResult, UpdateItem, VectorInsert};
use crate::infrastructure::database::{MetadataDb, MetadataRepo};
use crate::infrastructure::vector::VectorFile;
use crate::services::{mutation, pagination, search};

/// Handle to one open store.
///
/// Cloning is cheap and every clone refers to the same underlying state.
/// The store is single-writer by construction: all operations serialize
/// on one internal lock around the vector file handle, so overlapping
/// calls on clones queue up rather than interleave.
#[derive(Clone)]
pub struct Database {
    inner: Arc<Inner>,
}

struct Inner {
    path: PathBuf,
    file: Mutex<VectorFile>,
    db: MetadataDb,
    repo: MetadataRepo,
}

impl Database {
    /// Open the vector file and its metadata sidecar. Used by
    /// [`crate::connect`]; not exposed directly so every open goes
    /// through the registry.
    pub(crate) async fn open(path: PathBuf, dimensions: u32) -> Result<Self> {
        let file = VectorFile::open(&path, dimensions)?;

        let mut db_path = path.as_os_str().to_os_string();
        db_path.push(".metadata.db");
        let db = MetadataDb::connect(Path::new(&db_path)).await?;
        db.migrate().await?;
        let repo = MetadataRepo::new(db.pool().clone());

        let header = file.header();
        tracing::info!(
            path = %path.display(),
            vector_count = header.vector_count,
            dimensions = header.dimensions,
            "store opened"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                path,
                file: Mutex::new(file),
                db,
                repo,
            }),
        })
    }

    /// Path of the vector file this handle refers to.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Insert records; returns how many were stored.
    pub async fn insert(&self, records: &[VectorInsert]) -> Result<u64> {
        let mut file = self.inner.file.lock().await;
        mutation::insert(&mut file, &self.inner.repo, records).await
    }

    /// Top-K cosine-similarity search, best first.
    pub async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        let mut file = self.inner.file.lock().await;
        search::search(&mut file, &self.inner.repo, query, top_k).await
    }

    /// Top-K search over records whose metadata matches `filter`.
    pub async fn search_filtered(
        &self,
        query: &[f32],
        top_k: usize,
        filter: &Value,
    ) -> Result<Vec<SearchResult>> {
        let mut file = self.inner.file.lock().await;
        search::search_filtered(&mut file, &self.inner.repo, query, top_k, filter).await
    }

    /// Delete records by id; returns the number removed from the file.
    pub async fn delete_by_ids(&self, ids: &[i64]) -> Result<u64> {
        let mut file = self.inner.file.lock().await;
        mutation::delete_by_ids(&mut file, &self.inner.repo, ids).await
    }

    /// Delete every record matching `filter`; returns the number removed.
    pub async fn delete_by_filter(&self, filter: &Value) -> Result<u64> {
        let mut file = self.inner.file.lock().await;
        mutation::delete_by_filter(&mut file, &self.inner.repo, filter).await
    }

    /// Apply per-id vector/metadata updates; returns how many applied.
    pub async fn update(&self, items: &[UpdateItem]) -> Result<u64> {
        let mut file = self.inner.file.lock().await;
        mutation::update(&mut file, &self.inner.repo, items).await
    }

    /// Fetch the `[skip, skip + limit)` slice in file order.
    pub async fn get_paginated(&self, skip: u64, limit: u64) -> Result<Vec<PageItem>> {
        let mut file = self.inner.file.lock().await;
        pagination::get_page(&mut file, &self.inner.repo, skip, limit).await
    }

    /// Current header snapshot.
    pub async fn stats(&self) -> IndexStats {
        let file = self.inner.file.lock().await;
        let header = file.header();
        IndexStats {
            vector_count: header.vector_count,
            dimensions: header.dimensions,
            record_stride: (header.dimensions + 1) * 4,
        }
    }

    /// Close the metadata pool. The vector file handle closes with the
    /// last clone of this handle.
    pub async fn close(&self) {
        self.inner.db.close().await;
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.inner.path)
            .finish_non_exhaustive()
    }
}
