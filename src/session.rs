//! Conversational session over the analysis pipeline
//!
//! Two states: idle, and awaiting a token address after the operator asked
//! for an analysis. Every completed run, successful or not, returns the
//! session to idle. Transport-agnostic; the console front end lives in
//! `cli::commands`.

use std::sync::Arc;
use tracing::{error, info};

use crate::pipeline::{AnalysisOutcome, Analyzer, ProgressSink};

pub const WELCOME: &str = "Early-buyer analyzer ready.\n\
    Send /analyze, then a token contract address, to check its earliest buyers for notable wallets.";
pub const ASK_FOR_TOKEN: &str = "Send the token contract address now (0x followed by 40 hex digits).";
pub const INVALID_TOKEN: &str =
    "That is not a valid token address. Send a 42-character 0x address, or /cancel.";
pub const CANCELLED: &str = "Cancelled.";
pub const ANALYSIS_FAILED: &str = "Analysis failed due to an internal error. Check the logs for details.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingToken,
}

/// One operator message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Start,
    Analyze,
    Cancel,
    Text(String),
}

impl Input {
    /// Classify a raw line of operator text
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed.to_lowercase().as_str() {
            "/start" => Self::Start,
            "/analyze" | "analyze" => Self::Analyze,
            "/cancel" => Self::Cancel,
            _ => Self::Text(trimmed.to_string()),
        }
    }
}

/// Message sent back to the operator
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Outcome(AnalysisOutcome),
}

impl Reply {
    fn text(s: &str) -> Self {
        Self::Text(s.to_string())
    }

    /// Plain-text form for transports without richer formatting
    pub fn render(&self, explorer_url: &str) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Outcome(outcome) => outcome.render(explorer_url),
        }
    }
}

pub struct Session {
    analyzer: Arc<Analyzer>,
    state: SessionState,
    refresh: bool,
}

impl Session {
    pub fn new(analyzer: Arc<Analyzer>) -> Self {
        Self {
            analyzer,
            state: SessionState::Idle,
            refresh: false,
        }
    }

    /// Bypass the profile cache for every run in this session
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Advance the state machine by one operator message
    pub async fn handle(&mut self, input: Input, progress: &dyn ProgressSink) -> Vec<Reply> {
        match (self.state, input) {
            (_, Input::Start) => {
                self.state = SessionState::Idle;
                vec![Reply::text(WELCOME)]
            }
            (_, Input::Cancel) => {
                self.state = SessionState::Idle;
                vec![Reply::text(CANCELLED), Reply::text(WELCOME)]
            }
            (_, Input::Analyze) => {
                self.state = SessionState::AwaitingToken;
                vec![Reply::text(ASK_FOR_TOKEN)]
            }
            (SessionState::Idle, Input::Text(_)) => vec![Reply::text(WELCOME)],
            (SessionState::AwaitingToken, Input::Text(token)) => {
                self.run_analysis(&token, progress).await
            }
        }
    }

    async fn run_analysis(&mut self, token: &str, progress: &dyn ProgressSink) -> Vec<Reply> {
        let reply = match self.analyzer.analyze(token, self.refresh, progress).await {
            Ok(outcome) => Reply::Outcome(outcome),
            Err(e) if e.is_operator_error() => {
                info!(input = %token, error = %e, "Rejected token input");
                return vec![Reply::text(INVALID_TOKEN)];
            }
            Err(e) => {
                error!(token = %token, error = %e, "Analysis failed");
                Reply::text(ANALYSIS_FAILED)
            }
        };

        self.state = SessionState::Idle;
        vec![reply, Reply::text(WELCOME)]
    }
}
