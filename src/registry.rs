//! Process-wide connection registry.
//!
//! Open stores are multiplexed by absolute vector-file path: connecting
//! to the same path twice hands back a clone of the same [`Database`],
//! so two parts of a process never hold independent file handles to one
//! store. Entries live until process exit.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::sync::RwLock;

use crate::database::Database;
use crate::domain::errors::{Result, StoreError};

static REGISTRY: OnceLock<RwLock<HashMap<PathBuf, Database>>> = OnceLock::new();

fn registry() -> &'static RwLock<HashMap<PathBuf, Database>> {
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Open (or re-attach to) the store at `path`.
///
/// `dimensions`, when given, must be positive and fixes the store's
/// dimensionality if the file does not carry one yet; pass `None` to
/// adopt whatever is on disk (or defer fixing to the first insert).
/// Repeat calls with the same path return the already-open handle.
pub async fn connect(path: impl AsRef<Path>, dimensions: Option<u32>) -> Result<Database> {
    if dimensions == Some(0) {
        return Err(StoreError::InvalidArgument(
            "dimensions must be positive".into(),
        ));
    }
    let abs = absolute_path(path.as_ref())?;

    if let Some(db) = registry().read().await.get(&abs) {
        return Ok(db.clone());
    }

    let mut map = registry().write().await;
    // Lost the race: someone registered it between our read and write.
    if let Some(db) = map.get(&abs) {
        return Ok(db.clone());
    }
    let db = Database::open(abs.clone(), dimensions.unwrap_or(0)).await?;
    map.insert(abs, db.clone());
    Ok(db)
}

fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(StoreError::InvalidArgument("path must not be empty".into()));
    }
    Ok(std::path::absolute(path)?)
}
