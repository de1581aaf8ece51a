//! CLI command implementations

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::config::Config;
use crate::pipeline::{AnalysisOutcome, Analyzer, Progress, ProgressSink};
use crate::session::{Input, Reply, Session};
use crate::store::{self, ProfileStore};

/// Prints progress events to stdout
pub struct ConsoleProgress;

#[async_trait]
impl ProgressSink for ConsoleProgress {
    async fn notify(&self, progress: Progress) {
        println!("{}", progress_line(&progress));
    }
}

/// Operator-facing text for a progress event
pub fn progress_line(progress: &Progress) -> String {
    match progress {
        Progress::FetchingTransfers => "Token received. Fetching the earliest transfers...".to_string(),
        Progress::CandidatesFound(n) => format!("Found {} unique early buyers.", n),
        Progress::EnrichmentStarted(n) => {
            format!("Checking {} wallets against the intelligence service (this may take a while)...", n)
        }
    }
}

/// Analyze a token once and print the report
pub async fn analyze(config: &Config, token: &str, refresh: bool) -> Result<()> {
    let analyzer = Analyzer::from_config(config).await?;

    let outcome = analyzer.analyze(token, refresh, &ConsoleProgress).await?;
    println!();
    println!("{}", outcome.render(analyzer.explorer_url()));

    if let AnalysisOutcome::CouldNotAnalyze { .. } = outcome {
        warn!("No transfer data; check the chain-data API key and that the address is a token contract");
    }
    Ok(())
}

/// Show the cached (or freshly fetched) profile of one wallet
pub async fn profile(config: &Config, address: &str, refresh: bool) -> Result<()> {
    let analyzer = Analyzer::from_config(config).await?;
    let profile = analyzer.profile(address, refresh).await?;

    println!("\n=== WALLET PROFILE ===\n");
    println!("Address:      {}", profile.address);
    println!("Label:        {}", profile.label.as_deref().unwrap_or("-"));
    println!("PnL (USD):    {:.2}", profile.pnl_usd);
    println!("Notable:      {}", if profile.is_notable { "yes" } else { "no" });
    println!("Last updated: {}", profile.last_updated.to_rfc3339());
    println!(
        "Explorer:     {}",
        analyzer
            .explorer_url()
            .replace("{address}", profile.address.as_str())
    );

    Ok(())
}

/// Interactive session over stdin/stdout
pub async fn console(config: &Config, refresh: bool) -> Result<()> {
    let analyzer = Arc::new(Analyzer::from_config(config).await?);
    let explorer_url = analyzer.explorer_url().to_string();
    let mut session = Session::new(analyzer).with_refresh(refresh);

    info!("Console session started (/analyze, /cancel, /start; Ctrl-D to quit)");
    print_replies(&session.handle(Input::Start, &ConsoleProgress).await, &explorer_url);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let replies = session.handle(Input::parse(&line), &ConsoleProgress).await;
        print_replies(&replies, &explorer_url);
    }

    info!("Console session closed");
    Ok(())
}

fn print_replies(replies: &[Reply], explorer_url: &str) {
    for reply in replies {
        println!("{}\n", reply.render(explorer_url));
    }
}

/// Show current configuration (secrets masked)
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}

/// Check the profile store and API key setup
pub async fn health(config: &Config) -> Result<()> {
    println!("\n=== SYSTEM HEALTH CHECK ===\n");

    let mut all_healthy = true;

    print!("Profile store... ");
    match store::open_store(&config.storage).await {
        Ok(store) => match store.count().await {
            Ok(n) => println!("OK ({}, {} cached profiles)", store.backend_name(), n),
            Err(e) => {
                println!("FAILED: {}", e);
                all_healthy = false;
            }
        },
        Err(e) => {
            println!("FAILED: {}", e);
            all_healthy = false;
        }
    }

    print!("Chain-data API key... ");
    if config.chain_data.api_key.is_empty() {
        println!("MISSING");
        all_healthy = false;
    } else {
        println!("OK");
    }

    print!("Intelligence API key... ");
    if config.intel.api_key.is_empty() {
        println!("MISSING");
        all_healthy = false;
    } else {
        println!("OK");
    }

    println!();
    if all_healthy {
        println!("All systems healthy!");
    } else {
        println!("Some checks failed. See above.");
    }

    Ok(())
}
