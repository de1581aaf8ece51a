//! Analysis pipeline
//!
//! validate token -> extract early buyers -> enrich -> score -> report.
//! An empty buyer set short-circuits to [`AnalysisOutcome::CouldNotAnalyze`]
//! without touching the enricher.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::address::Address;
use crate::config::{Config, ReportConfig, ScoringConfig};
use crate::dexscreener::DexScreenerClient;
use crate::enricher::Enricher;
use crate::error::{Error, Result};
use crate::explorer::ExplorerClient;
use crate::extractor::EarlyBuyerExtractor;
use crate::fetch::{HttpFetcher, JsonFetcher};
use crate::intel::IntelClient;
use crate::profile::WalletProfile;
use crate::report::AnalysisReport;
use crate::store::{self, ProfileStore};

/// Stage notifications emitted while a run is in flight
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    FetchingTransfers,
    CandidatesFound(usize),
    EnrichmentStarted(usize),
}

/// Receiver for progress events; formatting is the transport's job
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn notify(&self, progress: Progress);
}

/// Sink that drops every event
pub struct NoProgress;

#[async_trait]
impl ProgressSink for NoProgress {
    async fn notify(&self, _progress: Progress) {}
}

/// Result of one analysis run
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// No transfer data could be obtained for the token
    CouldNotAnalyze { token: Address },
    Report(AnalysisReport),
}

impl AnalysisOutcome {
    pub fn render(&self, explorer_url: &str) -> String {
        match self {
            Self::CouldNotAnalyze { token } => format!(
                "Could not analyze {}: no transfer data available. Check the contract address and try again.",
                token
            ),
            Self::Report(report) => report.render(explorer_url),
        }
    }
}

/// Wires the extractor, enricher and scorer into one request/response run
pub struct Analyzer {
    extractor: EarlyBuyerExtractor,
    enricher: Enricher,
    scoring: ScoringConfig,
    report: ReportConfig,
}

impl Analyzer {
    pub fn new(
        extractor: EarlyBuyerExtractor,
        enricher: Enricher,
        scoring: ScoringConfig,
        report: ReportConfig,
    ) -> Self {
        Self {
            extractor,
            enricher,
            scoring,
            report,
        }
    }

    /// Build every client over one shared fetcher and store
    pub fn with_parts(
        config: &Config,
        fetcher: Arc<dyn JsonFetcher>,
        store: Arc<dyn ProfileStore>,
    ) -> Self {
        let explorer = ExplorerClient::new(fetcher.clone(), &config.chain_data);
        let market = DexScreenerClient::new(fetcher.clone(), &config.market_data);
        let intel = IntelClient::new(fetcher, &config.intel);

        let extractor = EarlyBuyerExtractor::new(
            Arc::new(explorer),
            Arc::new(market),
            config.extraction.strategy(),
        );
        let enricher = Enricher::new(
            store,
            Arc::new(intel),
            config.scoring.notability_marker.clone(),
            config.enrichment.refresh_policy(),
            config.enrichment.max_concurrent,
        );

        Self::new(extractor, enricher, config.scoring.clone(), config.report.clone())
    }

    /// Build a production analyzer from configuration
    pub async fn from_config(config: &Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| Error::Config(e.to_string()))?;

        let fetcher = HttpFetcher::new(
            config.fetch.retry_policy(),
            config.fetch.timeout(),
            config.fetch.user_agent.clone(),
        )?;
        let store = store::open_store(&config.storage).await?;

        Ok(Self::with_parts(config, Arc::new(fetcher), store))
    }

    pub fn explorer_url(&self) -> &str {
        &self.report.explorer_url
    }

    pub fn enricher(&self) -> &Enricher {
        &self.enricher
    }

    /// Run one analysis; invalid input is rejected before any network call
    pub async fn analyze(
        &self,
        token_input: &str,
        refresh: bool,
        progress: &dyn ProgressSink,
    ) -> Result<AnalysisOutcome> {
        let token = Address::parse(token_input)?;
        info!(token = %token, refresh, "Starting analysis");

        progress.notify(Progress::FetchingTransfers).await;
        let buyers = self.extractor.early_buyers(&token).await;
        if buyers.is_empty() {
            warn!(token = %token, "No early buyers extracted");
            return Ok(AnalysisOutcome::CouldNotAnalyze { token });
        }
        progress.notify(Progress::CandidatesFound(buyers.len())).await;

        progress.notify(Progress::EnrichmentStarted(buyers.len())).await;
        let profiles = self.enricher.resolve_all(buyers.as_slice(), refresh).await?;

        let report = AnalysisReport::build(token, profiles, &self.scoring);
        info!(
            token = %report.token,
            checked = report.candidates_checked,
            notable = report.entries.len(),
            "Analysis complete"
        );

        Ok(AnalysisOutcome::Report(report))
    }

    /// Resolve a single wallet through the cache
    pub async fn profile(&self, address_input: &str, refresh: bool) -> Result<WalletProfile> {
        let address = Address::parse(address_input)?;
        self.enricher.resolve(&address, refresh).await
    }
}
