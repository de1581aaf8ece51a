//! Resilient JSON fetcher
//!
//! Best-effort HTTP GET used by every upstream client. Transport errors,
//! non-2xx statuses and malformed bodies all count as a failed attempt;
//! once the retry budget is spent the caller gets `None`, never an error.

use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::ExponentialBackoffBuilder;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Source of decoded JSON documents
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    /// Fetch `url` and decode the body, `None` once every attempt failed
    async fn get_json(&self, url: &str, headers: &[(&str, &str)]) -> Option<Value>;
}

/// Delay schedule applied after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackoffKind {
    /// Same `retry_delay` after every failure
    Fixed,
    /// Jittered exponential growth from `retry_delay`, never above `max_delay`
    Exponential { max_delay: Duration },
}

/// Retry policy injected into the fetcher
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,
    /// Courtesy wait before every attempt (rate limiting, not backoff)
    pub pre_request_delay: Duration,
    /// Wait after a failed attempt
    pub retry_delay: Duration,
    pub backoff: BackoffKind,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            pre_request_delay: Duration::from_millis(500),
            retry_delay: Duration::from_secs(1),
            backoff: BackoffKind::Fixed,
        }
    }
}

impl RetryPolicy {
    /// Zero-delay policy with the given attempt budget
    pub fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            pre_request_delay: Duration::ZERO,
            retry_delay: Duration::ZERO,
            backoff: BackoffKind::Fixed,
        }
    }

    fn schedule(&self) -> RetrySchedule {
        match self.backoff {
            BackoffKind::Fixed => RetrySchedule::Fixed(self.retry_delay),
            BackoffKind::Exponential { max_delay } => RetrySchedule::Exponential {
                inner: ExponentialBackoffBuilder::new()
                    .with_initial_interval(self.retry_delay)
                    .with_max_interval(max_delay)
                    .with_max_elapsed_time(None)
                    .build(),
                max_delay,
            },
        }
    }
}

/// Per-request iterator over post-failure delays
enum RetrySchedule {
    Fixed(Duration),
    Exponential {
        inner: backoff::ExponentialBackoff,
        max_delay: Duration,
    },
}

impl RetrySchedule {
    fn next_delay(&mut self) -> Duration {
        match self {
            RetrySchedule::Fixed(delay) => *delay,
            RetrySchedule::Exponential { inner, max_delay } => {
                // jitter is applied on top of the interval cap
                inner.next_backoff().unwrap_or(*max_delay).min(*max_delay)
            }
        }
    }
}

/// HTTP implementation of [`JsonFetcher`]
pub struct HttpFetcher {
    client: Client,
    policy: RetryPolicy,
    user_agent: String,
}

impl HttpFetcher {
    /// Create a fetcher with a per-request timeout
    pub fn new(policy: RetryPolicy, timeout: Duration, user_agent: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            policy,
            user_agent: user_agent.into(),
        })
    }

    /// Single request, no retry
    async fn attempt(&self, url: &str, headers: &[(&str, &str)]) -> Result<Value> {
        let mut request = self.client.get(url);

        let has_user_agent = headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case(USER_AGENT.as_str()));
        if !has_user_agent {
            request = request.header(USER_AGENT, &self.user_agent);
        }
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Http(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http(format!("upstream returned {}", status)));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| Error::Serialization(format!("malformed JSON body: {}", e)))
    }
}

#[async_trait]
impl JsonFetcher for HttpFetcher {
    async fn get_json(&self, url: &str, headers: &[(&str, &str)]) -> Option<Value> {
        let mut schedule = self.policy.schedule();
        let display_url = redact_url(url);

        for attempt in 1..=self.policy.attempts {
            tokio::time::sleep(self.policy.pre_request_delay).await;

            match self.attempt(url, headers).await {
                Ok(body) => {
                    debug!(url = %display_url, attempt, "Fetch succeeded");
                    return Some(body);
                }
                Err(e) => {
                    warn!(
                        url = %display_url,
                        attempt,
                        max_attempts = self.policy.attempts,
                        error = %e,
                        "Fetch attempt failed"
                    );
                }
            }

            if attempt < self.policy.attempts {
                tokio::time::sleep(schedule.next_delay()).await;
            }
        }

        warn!(url = %display_url, "Giving up after {} attempts", self.policy.attempts);
        None
    }
}

/// Strip the query string so API keys never reach the logs
pub fn redact_url(url: &str) -> String {
    match url.find('?') {
        Some(idx) => format!("{}?***", &url[..idx]),
        None => url.to_string(),
    }
}

#[cfg(test)]
pub mod testing {
    //! Scripted in-process fetcher for tests

    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    pub struct RecordedCall {
        pub url: String,
        pub headers: Vec<(String, String)>,
    }

    /// Answers each URL from the first route whose fragment it contains;
    /// unmatched URLs behave like an exhausted retry budget.
    #[derive(Default)]
    pub struct ScriptedFetcher {
        routes: Vec<(String, Option<Value>)>,
        calls: Mutex<Vec<RecordedCall>>,
    }

    impl ScriptedFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn route(mut self, fragment: &str, response: Value) -> Self {
            self.routes.push((fragment.to_string(), Some(response)));
            self
        }

        pub fn fail(mut self, fragment: &str) -> Self {
            self.routes.push((fragment.to_string(), None));
            self
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn calls_matching(&self, fragment: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.url.contains(fragment))
                .count()
        }
    }

    #[async_trait]
    impl JsonFetcher for ScriptedFetcher {
        async fn get_json(&self, url: &str, headers: &[(&str, &str)]) -> Option<Value> {
            self.calls.lock().unwrap().push(RecordedCall {
                url: url.to_string(),
                headers: headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            });

            self.routes
                .iter()
                .find(|(fragment, _)| url.contains(fragment.as_str()))
                .and_then(|(_, response)| response.clone())
        }
    }
}
