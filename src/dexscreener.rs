// DexScreener API client for pair creation lookups
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::address::Address;
use crate::config::MarketDataConfig;
use crate::fetch::JsonFetcher;

/// Trading pair as listed by DexScreener; unused fields are not decoded
#[derive(Debug, Clone, Deserialize)]
pub struct DexPair {
    #[serde(rename = "chainId")]
    pub chain_id: String,
    /// Pair creation time in unix milliseconds
    #[serde(rename = "pairCreatedAt")]
    pub pair_created_at: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenPairsResponse {
    pub pairs: Option<Vec<DexPair>>,
}

pub struct DexScreenerClient {
    fetcher: Arc<dyn JsonFetcher>,
    base_url: String,
    chain_id: String,
}

impl DexScreenerClient {
    pub fn new(fetcher: Arc<dyn JsonFetcher>, config: &MarketDataConfig) -> Self {
        Self {
            fetcher,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            chain_id: config.chain_id.clone(),
        }
    }

    /// Fetch all pairs listed for a token
    pub async fn get_token_pairs(&self, token: &Address) -> Option<Vec<DexPair>> {
        let url = format!("{}/latest/dex/tokens/{}", self.base_url, token);
        let body = self.fetcher.get_json(&url, &[]).await?;

        match serde_json::from_value::<TokenPairsResponse>(body) {
            Ok(data) => data.pairs,
            Err(e) => {
                warn!(token = %token, error = %e, "Malformed DexScreener response");
                None
            }
        }
    }

    /// Earliest pair creation time for the token on the configured chain
    ///
    /// Absent when the token has no pairs or none report a creation time.
    pub async fn pair_created_at(&self, token: &Address) -> Option<DateTime<Utc>> {
        let pairs = self.get_token_pairs(token).await?;

        let earliest = pairs
            .iter()
            .filter(|p| p.chain_id == self.chain_id)
            .filter_map(|p| p.pair_created_at)
            .min()
            .and_then(DateTime::from_timestamp_millis);

        debug!(
            token = %token,
            pairs = pairs.len(),
            created_at = ?earliest,
            "Resolved pair creation time"
        );

        earliest
    }
}
