//! Persistent wallet profile cache
//!
//! A single keyed table: point lookup by address and upsert by address.
//! Upserts are single-row and atomic, so concurrent writers for the same
//! address simply resolve to last-writer-wins.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::address::Address;
use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;
use crate::profile::WalletProfile;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryProfileStore;
pub use sqlite::SqliteProfileStore;

/// Keyed profile storage shared by all enrichment workers
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Get the profile for an address, `None` if never stored
    async fn get(&self, address: &Address) -> Result<Option<WalletProfile>>;

    /// Insert or overwrite the profile for its address
    async fn upsert(&self, profile: &WalletProfile) -> Result<()>;

    /// Number of stored profiles
    async fn count(&self) -> Result<u64>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Open the store described by the configuration
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn ProfileStore>> {
    let store: Arc<dyn ProfileStore> = match config.backend {
        StorageBackend::Sqlite => {
            Arc::new(SqliteProfileStore::new(&config.db_path, config.pool_size).await?)
        }
        StorageBackend::Memory => Arc::new(MemoryProfileStore::new()),
    };

    info!(backend = store.backend_name(), "Profile store ready");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory_store() {
        let config = StorageConfig {
            backend: StorageBackend::Memory,
            ..Default::default()
        };
        let store = open_store(&config).await.unwrap();
        assert_eq!(store.backend_name(), "memory");
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_open_sqlite_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            backend: StorageBackend::Sqlite,
            db_path: dir.path().join("profiles.db").display().to_string(),
            pool_size: 2,
        };
        let store = open_store(&config).await.unwrap();
        assert_eq!(store.backend_name(), "sqlite");
    }
}
