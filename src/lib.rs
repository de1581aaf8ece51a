//! Smart-money analyzer library
//!
//! Extracts a token's earliest buyers from a block explorer, enriches each
//! wallet with cached intelligence, and reports the notable ones.

pub mod address;
pub mod cli;
pub mod config;
pub mod dexscreener;
pub mod enricher;
pub mod error;
pub mod explorer;
pub mod extractor;
pub mod fetch;
pub mod intel;
pub mod pipeline;
pub mod profile;
pub mod report;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use address::Address;
pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{AnalysisOutcome, Analyzer};
