//! SQLite profile store
//!
//! One `wallets` table keyed by address. Timestamps are stored as unix
//! milliseconds.

use async_trait::async_trait;
use chrono::DateTime;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::time::Duration;
use tracing::{debug, info};

use super::ProfileStore;
use crate::address::Address;
use crate::error::{Error, Result};
use crate::profile::WalletProfile;

/// Profile store persisted in a SQLite database file
pub struct SqliteProfileStore {
    pool: Pool<Sqlite>,
}

impl SqliteProfileStore {
    /// Open (or create) the database at `db_path`
    ///
    /// # Arguments
    /// * `db_path` - Path to the SQLite database file
    /// * `pool_size` - Maximum number of connections in the pool
    pub async fn new(db_path: &str, pool_size: u32) -> Result<Self> {
        info!(
            "Opening profile store at: {} with pool size: {}",
            db_path, pool_size
        );

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size.max(1))
            .acquire_timeout(Duration::from_secs(5))
            .connect(&format!("sqlite:{}?mode=rwc", db_path))
            .await
            .map_err(|e| Error::Storage(format!("Failed to open {}: {}", db_path, e)))?;

        let store = Self { pool };
        store.initialize_schema().await?;

        Ok(store)
    }

    async fn initialize_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS wallets (
                address TEXT PRIMARY KEY,
                label TEXT,
                pnl_usd REAL NOT NULL DEFAULT 0,
                is_notable INTEGER NOT NULL DEFAULT 0,
                last_updated INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Storage(format!("Failed to create wallets table: {}", e)))?;

        debug!("Profile store schema initialized");
        Ok(())
    }

    fn row_to_profile(row: &SqliteRow) -> Result<WalletProfile> {
        let address: String = row.try_get("address")?;
        let last_updated_ms: i64 = row.try_get("last_updated")?;

        let address = Address::parse(&address)
            .map_err(|e| Error::Storage(format!("Corrupt address in store: {}", e)))?;
        let last_updated = DateTime::from_timestamp_millis(last_updated_ms).ok_or_else(|| {
            Error::Storage(format!("Corrupt timestamp {} for {}", last_updated_ms, address))
        })?;

        Ok(WalletProfile {
            address,
            label: row.try_get("label")?,
            pnl_usd: row.try_get("pnl_usd")?,
            is_notable: row.try_get("is_notable")?,
            last_updated,
        })
    }
}

#[async_trait]
impl ProfileStore for SqliteProfileStore {
    async fn get(&self, address: &Address) -> Result<Option<WalletProfile>> {
        let row = sqlx::query(
            "SELECT address, label, pnl_usd, is_notable, last_updated FROM wallets WHERE address = ?",
        )
        .bind(address.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_profile).transpose()
    }

    async fn upsert(&self, profile: &WalletProfile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO wallets (address, label, pnl_usd, is_notable, last_updated)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(address) DO UPDATE SET
                label = excluded.label,
                pnl_usd = excluded.pnl_usd,
                is_notable = excluded.is_notable,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(profile.address.as_str())
        .bind(profile.label.as_deref())
        .bind(profile.pnl_usd)
        .bind(profile.is_notable)
        .bind(profile.last_updated.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count(&self) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM wallets")
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("count")?;
        Ok(count as u64)
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
