//! BscScan-compatible explorer client for token transfer history
//!
//! Only the first page of transfers is ever requested, in ascending order,
//! so the result is always the earliest activity of the token.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use crate::address::Address;
use crate::config::ChainDataConfig;
use crate::fetch::{redact_url, JsonFetcher};

/// One observed token transfer
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRecord {
    /// Raw destination, validated later by the extractor
    pub to: String,
    /// Transferred amount in the token's smallest unit
    pub amount: f64,
    /// Unix timestamp in seconds, only needed for windowed extraction
    pub timestamp: Option<i64>,
}

/// Explorer wire format for a single `tokentx` entry
#[derive(Debug, Deserialize)]
struct RawTransfer {
    #[serde(rename = "timeStamp", default)]
    time_stamp: Option<String>,
    to: String,
    value: String,
}

impl RawTransfer {
    fn into_record(self) -> Option<TransferRecord> {
        Some(TransferRecord {
            to: self.to.to_lowercase(),
            amount: self.value.trim().parse::<f64>().ok()?,
            timestamp: self.time_stamp.and_then(|ts| ts.trim().parse().ok()),
        })
    }
}

/// Explorer envelope; `result` is a string on errors and an array on success
#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    result: Value,
}

/// Chain-data endpoint client
pub struct ExplorerClient {
    fetcher: Arc<dyn JsonFetcher>,
    base_url: String,
    api_key: String,
    page_size: u32,
}

impl ExplorerClient {
    pub fn new(fetcher: Arc<dyn JsonFetcher>, config: &ChainDataConfig) -> Self {
        Self {
            fetcher,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            page_size: config.page_size,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Build the first-page, ascending `tokentx` request URL
    pub fn transfers_url(&self, token: &Address) -> Option<String> {
        let page_size = self.page_size.to_string();
        Url::parse_with_params(
            &self.base_url,
            &[
                ("module", "account"),
                ("action", "tokentx"),
                ("contractaddress", token.as_str()),
                ("page", "1"),
                ("offset", page_size.as_str()),
                ("sort", "asc"),
                ("apikey", self.api_key.as_str()),
            ],
        )
        .map(String::from)
        .map_err(|e| warn!(base_url = %self.base_url, error = %e, "Invalid explorer base URL"))
        .ok()
    }

    /// Earliest transfers of `token`, `None` if the explorer could not be used
    ///
    /// A non-success status is reported as `None` as well: the explorer uses
    /// it for both "no transfers" and "bad key / unsupported contract", and
    /// neither can be analyzed.
    pub async fn earliest_transfers(&self, token: &Address) -> Option<Vec<TransferRecord>> {
        let url = self.transfers_url(token)?;
        debug!(token = %token, url = %redact_url(&url), "Fetching earliest transfers");

        let body = self.fetcher.get_json(&url, &[]).await?;
        let records = parse_transfers(body, self.page_size as usize);
        if records.is_none() {
            warn!(token = %token, "Explorer returned no usable transfer list");
        }
        records
    }
}

/// Decode an explorer response into at most `limit` records
fn parse_transfers(body: Value, limit: usize) -> Option<Vec<TransferRecord>> {
    let response: ExplorerResponse = match serde_json::from_value(body) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "Malformed explorer response");
            return None;
        }
    };

    if response.status.as_deref() != Some("1") {
        debug!(
            status = ?response.status,
            message = ?response.message,
            "Explorer reported failure"
        );
        return None;
    }

    let entries = match response.result {
        Value::Array(entries) if !entries.is_empty() => entries,
        _ => return None,
    };

    let mut records = Vec::with_capacity(entries.len().min(limit));
    for entry in entries.into_iter().take(limit) {
        let decoded = serde_json::from_value::<RawTransfer>(entry)
            .ok()
            .and_then(RawTransfer::into_record);
        match decoded {
            Some(record) => records.push(record),
            None => warn!("Skipping undecodable transfer entry"),
        }
    }

    Some(records)
}
