//! Cache maintenance commands.
//!
//! # Usage
//!
//! ```bash
//! # Report cache size and entry count
//! kirana-cli cache stats
//!
//! # Drop every cached catalog entry
//! kirana-cli cache clear
//! ```
//!
//! # Environment Variables
//!
//! - `KIRANA_CACHE_DIR` - Cache directory (default: `.kirana/cache`)

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use kirana_client::cache::CatalogCache;
use kirana_client::storage::{FsStore, StorageError};

/// Errors that can occur during cache maintenance.
#[derive(Debug, Error)]
pub enum CacheCmdError {
    /// Cache directory could not be opened.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

fn cache_dir() -> PathBuf {
    dotenvy::dotenv().ok();
    std::env::var("KIRANA_CACHE_DIR")
        .map_or_else(|_| PathBuf::from(".kirana/cache"), PathBuf::from)
}

/// Report the catalog cache's total size in bytes.
pub async fn stats() -> Result<(), CacheCmdError> {
    let dir = cache_dir();
    let store = Arc::new(FsStore::open(&dir).await?);
    let cache = CatalogCache::new(store);

    let bytes = cache.cache_size().await;
    tracing::info!("Cache directory: {}", dir.display());
    tracing::info!("Catalog cache size: {bytes} bytes");
    Ok(())
}

/// Remove every cached catalog entry.
pub async fn clear() -> Result<(), CacheCmdError> {
    let dir = cache_dir();
    let store = Arc::new(FsStore::open(&dir).await?);
    let cache = CatalogCache::new(store);

    let removed = cache.clear_all().await;
    tracing::info!("Removed {removed} cached entries from {}", dir.display());
    Ok(())
}
