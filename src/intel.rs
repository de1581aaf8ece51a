//! Wallet intelligence API client
//!
//! Two lookups per wallet: realized PnL on the configured chain and the
//! entity label attached to the address. Both are best-effort; a missing
//! or malformed answer is reported as `None`.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::address::Address;
use crate::config::IntelConfig;
use crate::fetch::JsonFetcher;

/// Header carrying the intelligence API key
pub const API_KEY_HEADER: &str = "API-Key";

#[derive(Debug, Default, Deserialize)]
struct EntitiesResponse {
    #[serde(default)]
    entities: Vec<Entity>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Entity {
    #[serde(default)]
    arkham_label: Option<EntityLabel>,
}

#[derive(Debug, Default, Deserialize)]
struct EntityLabel {
    #[serde(default)]
    name: Option<String>,
}

/// Client for the wallet intelligence service
pub struct IntelClient {
    fetcher: Arc<dyn JsonFetcher>,
    base_url: String,
    api_key: String,
    chain: String,
}

impl IntelClient {
    pub fn new(fetcher: Arc<dyn JsonFetcher>, config: &IntelConfig) -> Self {
        Self {
            fetcher,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            chain: config.chain.clone(),
        }
    }

    fn headers(&self) -> [(&str, &str); 1] {
        [(API_KEY_HEADER, self.api_key.as_str())]
    }

    /// Realized PnL in USD on the configured chain
    pub async fn fetch_pnl(&self, address: &Address) -> Option<f64> {
        let url = format!(
            "{}/address/{}/pnl?chain={}",
            self.base_url, address, self.chain
        );
        let body = self.fetcher.get_json(&url, &self.headers()).await?;
        let pnl = parse_pnl(&body, &self.chain);

        debug!(address = %address, pnl = ?pnl, "Fetched wallet PnL");
        pnl
    }

    /// Name of the first entity label attached to the address
    pub async fn fetch_label(&self, address: &Address) -> Option<String> {
        let url = format!("{}/address/{}/entities", self.base_url, address);
        let body = self.fetcher.get_json(&url, &self.headers()).await?;
        let label = parse_label(body);

        debug!(address = %address, label = ?label, "Fetched wallet label");
        label
    }
}

/// Extract `<chain>.totalPnlUsd`, accepting numbers or numeric strings
pub fn parse_pnl(body: &Value, chain: &str) -> Option<f64> {
    let raw = body.get(chain)?.get("totalPnlUsd")?;
    let pnl = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    pnl.is_finite().then_some(pnl)
}

/// Extract `entities[0].arkhamLabel.name`, ignoring blank names
pub fn parse_label(body: Value) -> Option<String> {
    let response: EntitiesResponse = serde_json::from_value(body).ok()?;
    response
        .entities
        .into_iter()
        .next()?
        .arkham_label?
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}
