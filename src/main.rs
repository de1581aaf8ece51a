//! Smart-money analyzer - finds notable wallets among a token's earliest buyers

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

use smart_money_analyzer::cli::commands;
use smart_money_analyzer::config::Config;

/// Early-buyer smart-money analyzer
#[derive(Parser)]
#[command(name = "smart-money-analyzer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "ANALYZER_JSON_LOGS")]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the earliest buyers of a token
    Analyze {
        /// Token contract address
        token: String,

        /// Ignore cached wallet profiles and refetch
        #[arg(long)]
        refresh: bool,
    },

    /// Show the intelligence profile of a single wallet
    Profile {
        /// Wallet address
        address: String,

        /// Ignore the cached profile and refetch
        #[arg(long)]
        refresh: bool,
    },

    /// Interactive session on stdin/stdout
    Console {
        /// Ignore cached wallet profiles and refetch
        #[arg(long)]
        refresh: bool,
    },

    /// Show current configuration (secrets masked)
    Config,

    /// Check profile store and API key setup
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("smart_money_analyzer=info".parse()?);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);
    if cli.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Analyze { token, refresh } => commands::analyze(&config, &token, refresh).await,
        Commands::Profile { address, refresh } => {
            commands::profile(&config, &address, refresh).await
        }
        Commands::Console { refresh } => commands::console(&config, refresh).await,
        Commands::Config => commands::show_config(&config),
        Commands::Health => commands::health(&config).await,
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
