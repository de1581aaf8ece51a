//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::enricher::RefreshPolicy;
use crate::extractor::EarlyBuyerStrategy;
use crate::fetch::{redact_url, BackoffKind, RetryPolicy};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub chain_data: ChainDataConfig,
    #[serde(default)]
    pub market_data: MarketDataConfig,
    #[serde(default)]
    pub intel: IntelConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Resilient fetcher settings shared by every upstream client
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Courtesy delay before every request
    #[serde(default = "default_pre_request_delay_ms")]
    pub pre_request_delay_ms: u64,
    /// Delay after a failed attempt (initial delay in exponential mode)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub backoff: BackoffMode,
    /// Ceiling for a single exponential delay
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackoffMode {
    #[default]
    Fixed,
    Exponential,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainDataConfig {
    #[serde(default = "default_chain_data_url")]
    pub base_url: String,
    #[serde(default = "default_chain_data_api_key")]
    pub api_key: String,
    /// Number of earliest transfers requested per token
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketDataConfig {
    #[serde(default = "default_market_data_url")]
    pub base_url: String,
    /// DexScreener chain id used to pick pairs
    #[serde(default = "default_chain_id")]
    pub chain_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntelConfig {
    #[serde(default = "default_intel_url")]
    pub base_url: String,
    #[serde(default = "default_intel_api_key")]
    pub api_key: String,
    /// Chain key used for the profit/loss lookup
    #[serde(default = "default_chain_id")]
    pub chain: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub strategy: StrategyMode,
    /// Window after pair creation, only used by `creation_window`
    #[serde(default = "default_window_minutes")]
    pub window_minutes: u64,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StrategyMode {
    #[default]
    FirstTransfers,
    CreationWindow,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentConfig {
    /// Maximum wallets resolved concurrently
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default)]
    pub refresh: RefreshMode,
    /// Maximum profile age, only used by `max_age`
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMode {
    #[default]
    Never,
    MaxAge,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_min_pnl_usd")]
    pub min_pnl_usd: f64,
    /// Label substring that marks a notable actor (case-insensitive)
    #[serde(default = "default_notability_marker")]
    pub notability_marker: String,
    #[serde(default)]
    pub ranking: RankingOrder,
}

/// How report survivors are ordered
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RankingOrder {
    /// Profit/loss descending, stable
    #[default]
    PnlDesc,
    /// Notable actors, then high profit, then labeled; PnL descending within each
    ReasonThenPnl,
}

impl RankingOrder {
    /// Operator-facing description shown in reports
    pub fn describe(&self) -> &'static str {
        match self {
            Self::PnlDesc => "profit/loss, highest first",
            Self::ReasonThenPnl => "notable, then high profit, then labeled; profit/loss within each",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Explorer link template, `{address}` is substituted
    #[serde(default = "default_explorer_url")]
    pub explorer_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            pre_request_delay_ms: default_pre_request_delay_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            timeout_ms: default_timeout_ms(),
            backoff: BackoffMode::default(),
            max_backoff_ms: default_max_backoff_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl FetchConfig {
    /// Retry policy described by this section
    pub fn retry_policy(&self) -> RetryPolicy {
        let backoff = match self.backoff {
            BackoffMode::Fixed => BackoffKind::Fixed,
            BackoffMode::Exponential => BackoffKind::Exponential {
                max_delay: Duration::from_millis(self.max_backoff_ms),
            },
        };

        RetryPolicy {
            attempts: self.max_attempts,
            pre_request_delay: Duration::from_millis(self.pre_request_delay_ms),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            backoff,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ChainDataConfig {
    fn default() -> Self {
        Self {
            base_url: default_chain_data_url(),
            api_key: default_chain_data_api_key(),
            page_size: default_page_size(),
        }
    }
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            base_url: default_market_data_url(),
            chain_id: default_chain_id(),
        }
    }
}

impl Default for IntelConfig {
    fn default() -> Self {
        Self {
            base_url: default_intel_url(),
            api_key: default_intel_api_key(),
            chain: default_chain_id(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyMode::default(),
            window_minutes: default_window_minutes(),
        }
    }
}

impl ExtractionConfig {
    pub fn strategy(&self) -> EarlyBuyerStrategy {
        match self.strategy {
            StrategyMode::FirstTransfers => EarlyBuyerStrategy::FirstTransfers,
            StrategyMode::CreationWindow => EarlyBuyerStrategy::CreationWindow {
                window: chrono::Duration::minutes(
                    self.window_minutes.min(MAX_WINDOW_MINUTES) as i64,
                ),
            },
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            refresh: RefreshMode::default(),
            max_age_secs: default_max_age_secs(),
        }
    }
}

impl EnrichmentConfig {
    pub fn refresh_policy(&self) -> RefreshPolicy {
        match self.refresh {
            RefreshMode::Never => RefreshPolicy::Never,
            RefreshMode::MaxAge => RefreshPolicy::MaxAge(chrono::Duration::seconds(
                self.max_age_secs.min(MAX_AGE_SECS) as i64,
            )),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_pnl_usd: default_min_pnl_usd(),
            notability_marker: default_notability_marker(),
            ranking: RankingOrder::default(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            explorer_url: default_explorer_url(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            db_path: default_db_path(),
            pool_size: default_pool_size(),
        }
    }
}

/// Upper bound for `extraction.window_minutes` (30 days)
pub const MAX_WINDOW_MINUTES: u64 = 30 * 24 * 60;

/// Upper bound for `enrichment.max_age_secs` (10 years)
pub const MAX_AGE_SECS: u64 = 10 * 365 * 24 * 60 * 60;

// Default value functions
fn default_max_attempts() -> u32 {
    3
}

fn default_pre_request_delay_ms() -> u64 {
    500
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_timeout_ms() -> u64 {
    15000
}

fn default_max_backoff_ms() -> u64 {
    8000
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/91.0.4472.124 Safari/537.36"
        .to_string()
}

fn default_chain_data_url() -> String {
    "https://api.bscscan.com/api".into()
}

fn default_chain_data_api_key() -> String {
    std::env::var("CHAIN_DATA_API_KEY")
        .or_else(|_| std::env::var("BSCSCAN_API_KEY"))
        .unwrap_or_default()
}

fn default_page_size() -> u32 {
    100
}

fn default_market_data_url() -> String {
    "https://api.dexscreener.com".into()
}

fn default_chain_id() -> String {
    "bsc".into()
}

fn default_intel_url() -> String {
    "https://api.arkham.com/v1".into()
}

fn default_intel_api_key() -> String {
    std::env::var("INTEL_API_KEY")
        .or_else(|_| std::env::var("ARKHAM_API_KEY"))
        .unwrap_or_default()
}

fn default_window_minutes() -> u64 {
    15
}

fn default_max_concurrent() -> usize {
    5
}

fn default_max_age_secs() -> u64 {
    86400
}

fn default_min_pnl_usd() -> f64 {
    100_000.0
}

fn default_notability_marker() -> String {
    "smart money".into()
}

fn default_explorer_url() -> String {
    "https://bscscan.com/address/{address}".into()
}

fn default_db_path() -> String {
    "wallet_intel.db".into()
}

fn default_pool_size() -> u32 {
    5
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Start with defaults
            .set_default("fetch.max_attempts", default_max_attempts() as i64)?
            .set_default("chain_data.page_size", default_page_size() as i64)?
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix ANALYZER_)
            .add_source(
                config::Environment::with_prefix("ANALYZER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.fetch.max_attempts == 0 {
            anyhow::bail!("fetch.max_attempts must be at least 1");
        }

        if self.chain_data.page_size == 0 || self.chain_data.page_size > 10_000 {
            anyhow::bail!(
                "chain_data.page_size must be between 1 and 10000, got {}",
                self.chain_data.page_size
            );
        }

        for (name, url) in [
            ("chain_data.base_url", &self.chain_data.base_url),
            ("market_data.base_url", &self.market_data.base_url),
            ("intel.base_url", &self.intel.base_url),
        ] {
            if url.trim().is_empty() {
                anyhow::bail!("{} must not be empty", name);
            }
        }

        if self.extraction.strategy == StrategyMode::CreationWindow
            && self.extraction.window_minutes == 0
        {
            anyhow::bail!("extraction.window_minutes must be positive");
        }

        if self.extraction.window_minutes > MAX_WINDOW_MINUTES {
            anyhow::bail!(
                "extraction.window_minutes must be at most {}, got {}",
                MAX_WINDOW_MINUTES,
                self.extraction.window_minutes
            );
        }

        if self.enrichment.max_age_secs > MAX_AGE_SECS {
            anyhow::bail!(
                "enrichment.max_age_secs must be at most {}, got {}",
                MAX_AGE_SECS,
                self.enrichment.max_age_secs
            );
        }

        if self.enrichment.max_concurrent == 0 {
            anyhow::bail!("enrichment.max_concurrent must be positive");
        }

        if self.scoring.min_pnl_usd < 0.0 {
            anyhow::bail!("scoring.min_pnl_usd cannot be negative");
        }

        if self.scoring.notability_marker.trim().is_empty() {
            anyhow::bail!("scoring.notability_marker must not be empty");
        }

        if !self.report.explorer_url.contains("{address}") {
            anyhow::bail!("report.explorer_url must contain an {{address}} placeholder");
        }

        if self.chain_data.api_key.is_empty() {
            tracing::warn!("chain_data.api_key is not set - transfer lookups will likely fail");
        }

        if self.intel.api_key.is_empty() {
            tracing::warn!("intel.api_key is not set - wallet lookups will return empty profiles");
        }

        Ok(())
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration:
  Fetch:
    attempts: {}
    pre_request_delay: {}ms
    retry_delay: {}ms
    timeout: {}ms
    backoff: {:?}
  Chain data:
    base_url: {}
    api_key: {}
    page_size: {}
  Market data:
    base_url: {}
    chain_id: {}
  Intel:
    base_url: {}
    api_key: {}
    chain: {}
  Extraction:
    strategy: {:?}
    window: {}min
  Enrichment:
    max_concurrent: {}
    refresh: {:?}
  Scoring:
    min_pnl: ${}
    marker: {}
    ranking: {:?}
  Storage:
    backend: {:?}
    db_path: {}
"#,
            self.fetch.max_attempts,
            self.fetch.pre_request_delay_ms,
            self.fetch.retry_delay_ms,
            self.fetch.timeout_ms,
            self.fetch.backoff,
            redact_url(&self.chain_data.base_url),
            mask_secret(&self.chain_data.api_key),
            self.chain_data.page_size,
            redact_url(&self.market_data.base_url),
            self.market_data.chain_id,
            redact_url(&self.intel.base_url),
            mask_secret(&self.intel.api_key),
            self.intel.chain,
            self.extraction.strategy,
            self.extraction.window_minutes,
            self.enrichment.max_concurrent,
            self.enrichment.refresh_policy(),
            self.scoring.min_pnl_usd,
            self.scoring.notability_marker,
            self.scoring.ranking,
            self.storage.backend,
            self.storage.db_path,
        )
    }
}

fn mask_secret(secret: &str) -> &'static str {
    if secret.is_empty() {
        "(not set)"
    } else {
        "***"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.fetch.max_attempts, 3);
        assert_eq!(config.chain_data.page_size, 100);
        assert_eq!(config.scoring.min_pnl_usd, 100_000.0);
        assert_eq!(config.scoring.ranking, RankingOrder::PnlDesc);
        assert_eq!(config.extraction.strategy(), EarlyBuyerStrategy::FirstTransfers);
        assert_eq!(config.enrichment.refresh_policy(), RefreshPolicy::Never);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_retry_policy_from_config() {
        let mut fetch = FetchConfig::default();
        let policy = fetch.retry_policy();
        assert_eq!(policy.attempts, 3);
        assert_eq!(policy.pre_request_delay, Duration::from_millis(500));
        assert_eq!(policy.retry_delay, Duration::from_millis(1000));
        assert_eq!(policy.backoff, BackoffKind::Fixed);

        fetch.backoff = BackoffMode::Exponential;
        assert_eq!(
            fetch.retry_policy().backoff,
            BackoffKind::Exponential {
                max_delay: Duration::from_millis(8000)
            }
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.fetch.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scoring.notability_marker = "  ".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.report.explorer_url = "https://bscscan.com/address/".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.extraction.strategy = StrategyMode::CreationWindow;
        config.extraction.window_minutes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[extraction]
strategy = "creation_window"
window_minutes = 30

[enrichment]
refresh = "max_age"
max_age_secs = 3600

[scoring]
min_pnl_usd = 250000.0
ranking = "reason_then_pnl"

[storage]
backend = "memory"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(
            config.extraction.strategy(),
            EarlyBuyerStrategy::CreationWindow {
                window: chrono::Duration::minutes(30)
            }
        );
        assert_eq!(
            config.enrichment.refresh_policy(),
            RefreshPolicy::MaxAge(chrono::Duration::seconds(3600))
        );
        assert_eq!(config.scoring.min_pnl_usd, 250_000.0);
        assert_eq!(config.scoring.ranking, RankingOrder::ReasonThenPnl);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        // untouched sections keep their defaults
        assert_eq!(config.fetch.max_attempts, 3);
    }

    #[test]
    fn test_masked_display_hides_keys() {
        let mut config = Config::default();
        config.chain_data.api_key = "super-secret-key".into();
        config.intel.api_key = String::new();

        let display = config.masked_display();
        assert!(!display.contains("super-secret-key"));
        assert!(display.contains("***"));
        assert!(display.contains("(not set)"));
    }

    #[test]
    fn test_masked_display_redacts_query_strings() {
        let mut config = Config::default();
        config.market_data.base_url = "https://api.example.com?key=secret".into();

        let display = config.masked_display();
        assert!(display.contains("https://api.example.com?***"));
        assert!(!display.contains("key=secret"));
    }

    #[test]
    fn test_oversized_durations_rejected() {
        let mut config = Config::default();
        config.extraction.strategy = StrategyMode::CreationWindow;
        config.extraction.window_minutes = 1_000_000_000_000_000;
        assert!(config.validate().is_err());
        // conversion saturates instead of panicking
        assert_eq!(
            config.extraction.strategy(),
            EarlyBuyerStrategy::CreationWindow {
                window: chrono::Duration::minutes(MAX_WINDOW_MINUTES as i64)
            }
        );

        let mut config = Config::default();
        config.enrichment.refresh = RefreshMode::MaxAge;
        config.enrichment.max_age_secs = u64::MAX / 2;
        assert!(config.validate().is_err());
        assert_eq!(
            config.enrichment.refresh_policy(),
            RefreshPolicy::MaxAge(chrono::Duration::seconds(MAX_AGE_SECS as i64))
        );

        let mut config = Config::default();
        config.extraction.window_minutes = MAX_WINDOW_MINUTES;
        config.enrichment.max_age_secs = MAX_AGE_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_oversized_window_from_file_fails_to_load() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[extraction]
strategy = "creation_window"
window_minutes = 1000000000000000
"#
        )
        .unwrap();

        assert!(Config::load(file.path()).is_err());
    }
}
