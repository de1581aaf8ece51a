//! In-memory profile store for tests and throwaway runs

use async_trait::async_trait;
use dashmap::DashMap;

use super::ProfileStore;
use crate::address::Address;
use crate::error::Result;
use crate::profile::WalletProfile;

/// Profile store backed by a concurrent hashmap
#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: DashMap<Address, WalletProfile>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all profiles
    pub fn clear(&self) {
        self.profiles.clear();
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get(&self, address: &Address) -> Result<Option<WalletProfile>> {
        Ok(self.profiles.get(address).map(|entry| entry.clone()))
    }

    async fn upsert(&self, profile: &WalletProfile) -> Result<()> {
        self.profiles
            .insert(profile.address.clone(), profile.clone());
        Ok(())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.profiles.len() as u64)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_overwrites() {
        let store = MemoryProfileStore::new();
        let addr = Address::parse("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").unwrap();

        let mut profile = WalletProfile::empty(addr.clone());
        store.upsert(&profile).await.unwrap();

        profile.pnl_usd = 42.0;
        profile.label = Some("Fund".into());
        store.upsert(&profile).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.get(&addr).await.unwrap(), Some(profile));

        store.clear();
        assert!(store.get(&addr).await.unwrap().is_none());
    }
}
