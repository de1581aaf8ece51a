//! Cache-first wallet enrichment
//!
//! Resolves candidate addresses to [`WalletProfile`]s. The store is consulted
//! first; on a miss both intelligence lookups are made and the result is
//! written back unconditionally, so a wallet is only ever fetched once under
//! the default refresh policy.

use chrono::Duration;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::address::Address;
use crate::error::Result;
use crate::intel::IntelClient;
use crate::profile::WalletProfile;
use crate::store::ProfileStore;

/// When a cached profile is considered too old to serve
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RefreshPolicy {
    /// Cached profiles are served forever
    #[default]
    Never,
    /// Profiles older than the bound are refetched
    MaxAge(Duration),
}

impl RefreshPolicy {
    fn is_fresh(&self, profile: &WalletProfile) -> bool {
        match self {
            Self::Never => true,
            Self::MaxAge(max_age) => !profile.is_stale(*max_age),
        }
    }
}

/// Cache statistics for monitoring
#[derive(Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub stale: AtomicU64,
}

impl CacheStats {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale(&self) {
        self.stale.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Cached profiles refetched because they were too old
    pub fn stale(&self) -> u64 {
        self.stale.load(Ordering::Relaxed)
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// Resolves wallets to intelligence profiles through the store
pub struct Enricher {
    store: Arc<dyn ProfileStore>,
    intel: Arc<IntelClient>,
    notability_marker: String,
    refresh: RefreshPolicy,
    max_concurrent: usize,
    stats: CacheStats,
}

impl Enricher {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        intel: Arc<IntelClient>,
        notability_marker: impl Into<String>,
        refresh: RefreshPolicy,
        max_concurrent: usize,
    ) -> Self {
        Self {
            store,
            intel,
            notability_marker: notability_marker.into(),
            refresh,
            max_concurrent: max_concurrent.max(1),
            stats: CacheStats::default(),
        }
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Resolve one wallet; `refresh` bypasses the cache lookup
    pub async fn resolve(&self, address: &Address, refresh: bool) -> Result<WalletProfile> {
        if !refresh {
            if let Some(cached) = self.store.get(address).await? {
                if self.refresh.is_fresh(&cached) {
                    self.stats.record_hit();
                    debug!(address = %address, "Profile cache hit");
                    return Ok(cached);
                }
                self.stats.record_stale();
                debug!(address = %address, updated = %cached.last_updated, "Cached profile is stale");
            }
        }
        self.stats.record_miss();

        let (pnl, label) = tokio::join!(
            self.intel.fetch_pnl(address),
            self.intel.fetch_label(address)
        );
        let profile =
            WalletProfile::from_lookups(address.clone(), pnl, label, &self.notability_marker);

        self.store.upsert(&profile).await?;
        debug!(
            address = %address,
            pnl_usd = profile.pnl_usd,
            label = ?profile.label,
            notable = profile.is_notable,
            "Profile fetched and cached"
        );

        Ok(profile)
    }

    /// Resolve many wallets with bounded concurrency, output in input order
    pub async fn resolve_all(
        &self,
        addresses: &[Address],
        refresh: bool,
    ) -> Result<Vec<WalletProfile>> {
        let profiles: Vec<WalletProfile> = stream::iter(addresses)
            .map(|address| self.resolve(address, refresh))
            .buffered(self.max_concurrent)
            .try_collect()
            .await?;

        info!(
            resolved = profiles.len(),
            hits = self.stats.hits(),
            misses = self.stats.misses(),
            stale = self.stats.stale(),
            hit_rate = self.stats.hit_rate(),
            "Enrichment complete"
        );

        Ok(profiles)
    }
}
