//! Early-buyer extraction
//!
//! Reduces a token's earliest transfers to the set of wallets that received
//! tokens. Any upstream failure collapses to an empty [`BuyerSet`], which
//! callers must read as "could not analyze" rather than "no buyers".

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::address::Address;
use crate::dexscreener::DexScreenerClient;
use crate::explorer::{ExplorerClient, TransferRecord};

/// Definition of "early" used when reducing transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarlyBuyerStrategy {
    /// Every qualifying destination among the first page of transfers
    FirstTransfers,
    /// Only transfers within `window` after the earliest pair creation
    CreationWindow { window: Duration },
}

/// Unique candidate addresses, in first-seen order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuyerSet {
    addresses: Vec<Address>,
}

impl BuyerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an address, returning false if it was already present
    fn insert(&mut self, seen: &mut HashSet<Address>, address: Address) -> bool {
        if seen.insert(address.clone()) {
            self.addresses.push(address);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.addresses.contains(address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.addresses.iter()
    }

    pub fn as_slice(&self) -> &[Address] {
        &self.addresses
    }
}

impl IntoIterator for BuyerSet {
    type Item = Address;
    type IntoIter = std::vec::IntoIter<Address>;

    fn into_iter(self) -> Self::IntoIter {
        self.addresses.into_iter()
    }
}

/// Check whether a transfer destination counts as a buyer of `token`
pub fn qualifying_buyer(token: &Address, record: &TransferRecord) -> Option<Address> {
    if !(record.amount > 0.0) {
        return None;
    }
    let buyer = Address::parse(&record.to).ok()?;
    if buyer.is_burn() || &buyer == token {
        return None;
    }
    Some(buyer)
}

/// Reduce transfers to a buyer set, optionally bounded to a time window
///
/// Records are expected in ascending chronological order; the window is
/// inclusive on both ends.
pub fn reduce_transfers(
    token: &Address,
    records: &[TransferRecord],
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,
) -> BuyerSet {
    let mut buyers = BuyerSet::new();
    let mut seen = HashSet::new();

    for record in records {
        if let Some((start, end)) = window {
            // untimestamped records cannot be placed in the window
            let Some(ts) = record.timestamp else {
                continue;
            };
            if ts < start.timestamp() || ts > end.timestamp() {
                continue;
            }
        }

        if let Some(buyer) = qualifying_buyer(token, record) {
            buyers.insert(&mut seen, buyer);
        }
    }

    buyers
}

/// Derives early buyers from the chain-data and market-data endpoints
pub struct EarlyBuyerExtractor {
    explorer: Arc<ExplorerClient>,
    market: Arc<DexScreenerClient>,
    strategy: EarlyBuyerStrategy,
}

impl EarlyBuyerExtractor {
    pub fn new(
        explorer: Arc<ExplorerClient>,
        market: Arc<DexScreenerClient>,
        strategy: EarlyBuyerStrategy,
    ) -> Self {
        Self {
            explorer,
            market,
            strategy,
        }
    }

    pub fn strategy(&self) -> EarlyBuyerStrategy {
        self.strategy
    }

    /// Earliest buyers of `token`; empty when the data could not be fetched
    pub async fn early_buyers(&self, token: &Address) -> BuyerSet {
        info!(
            token = %token.short(),
            page_size = self.explorer.page_size(),
            strategy = ?self.strategy,
            "Fetching earliest transfers"
        );

        let window = match self.strategy {
            EarlyBuyerStrategy::FirstTransfers => None,
            EarlyBuyerStrategy::CreationWindow { window } => {
                match self.market.pair_created_at(token).await {
                    Some(created) => Some((created, created + window)),
                    None => {
                        warn!(token = %token, "Pair creation time unknown, cannot bound window");
                        return BuyerSet::new();
                    }
                }
            }
        };

        let Some(records) = self.explorer.earliest_transfers(token).await else {
            warn!(token = %token, "Failed to fetch transfers (bad key or unsupported contract?)");
            return BuyerSet::new();
        };

        let buyers = reduce_transfers(token, &records, window);
        debug!(
            token = %token,
            transfers = records.len(),
            buyers = buyers.len(),
            "Reduced transfers to buyers"
        );
        info!(
            "Found {} unique buyers in the earliest {} transfers",
            buyers.len(),
            records.len()
        );

        buyers
    }
}
