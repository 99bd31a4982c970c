//! the-odds-api v4 client with retry.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::Config;
use crate::error::FeedError;
use crate::metrics;

use super::types::SportInfo;

/// Source of raw per-sport event payloads.
#[async_trait]
pub trait OddsFeed: Send + Sync {
    /// Fetch the raw event payloads for one sport.
    async fn fetch_odds(&self, sport: &str) -> Result<Vec<Value>, FeedError>;
}

/// Retry schedule for odds requests.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Backoff multiplier (e.g., 2.0 for exponential).
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Create from config values.
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            initial_delay: Duration::from_secs(config.retry_wait_s),
            max_delay: Duration::from_secs(config.retry_max_wait_s),
            ..Default::default()
        }
    }

    /// Calculate the delay after a failed attempt (0-based) with exponential backoff.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let delay_ms =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        let clamped_ms = delay_ms.min(self.max_delay.as_millis() as f64) as u64;
        Duration::from_millis(clamped_ms)
    }
}

/// Request parameters that only matter upstream.
#[derive(Debug, Clone)]
pub struct OddsQuery {
    /// Bookmaker regions.
    pub regions: Vec<String>,
    /// Market keys.
    pub markets: Vec<String>,
    /// Odds format, always "decimal" for the engine.
    pub odds_format: String,
    /// Date format.
    pub date_format: String,
    /// Request deep links.
    pub include_links: bool,
}

impl OddsQuery {
    /// Build from config values.
    pub fn from_config(config: &Config) -> Self {
        Self {
            regions: config.regions.clone(),
            markets: config.markets.clone(),
            odds_format: config.odds_format.clone(),
            date_format: config.date_format.clone(),
            include_links: config.include_links,
        }
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("regions", self.regions.join(",")),
            ("markets", self.markets.join(",")),
            ("oddsFormat", self.odds_format.clone()),
            ("dateFormat", self.date_format.clone()),
        ];
        if self.include_links {
            params.push(("includeLinks", "true".to_string()));
        }
        params
    }
}

/// Odds API client.
#[derive(Debug, Clone)]
pub struct OddsApiClient {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// Base URL, always ending in '/'.
    base_url: Url,
    /// API key sent as `apiKey`.
    api_key: String,
    /// Odds request parameters.
    query: OddsQuery,
    /// Retry schedule.
    retry: RetryPolicy,
}

/// What to do after a failed attempt.
enum Attempt {
    Retry { reason: String, wait: Option<Duration> },
    Fail(FeedError),
}

impl OddsApiClient {
    /// Create a client from config.
    pub fn new(config: &Config) -> Result<Self, FeedError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .connect_timeout(Duration::from_secs(5))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Self::with_http(
            http,
            &config.odds_api_url,
            config.api_key.clone(),
            OddsQuery::from_config(config),
            RetryPolicy::from_config(config),
        )
    }

    /// Create a client around an existing HTTP client.
    pub fn with_http(
        http: reqwest::Client,
        base_url: &str,
        api_key: String,
        query: OddsQuery,
        retry: RetryPolicy,
    ) -> Result<Self, FeedError> {
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{base_url}/"))?
        };

        Ok(Self {
            http,
            base_url,
            api_key,
            query,
            retry,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// List sports known to the API.
    #[instrument(skip(self))]
    pub async fn list_sports(&self) -> Result<Vec<SportInfo>, FeedError> {
        self.get_json("sports", &[]).await
    }

    /// GET an endpoint relative to the base URL, retrying transient failures.
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&'static str, String)],
    ) -> Result<T, FeedError> {
        let url = self.base_url.join(endpoint)?;
        let mut last_error = String::new();

        for attempt in 0..self.retry.max_attempts {
            let start = Instant::now();
            let result = self
                .http
                .get(url.clone())
                .query(&[("apiKey", self.api_key.as_str())])
                .query(params)
                .send()
                .await;
            metrics::record_http_latency(start, endpoint);

            let outcome = match result {
                Ok(response) if response.status().is_success() => {
                    log_quota(&response);
                    return response.json::<T>().await.map_err(|e| FeedError::Parse {
                        endpoint: endpoint.to_string(),
                        reason: e.to_string(),
                    });
                }
                Ok(response) => classify_status(endpoint, &response),
                Err(e) if e.is_timeout() || e.is_connect() || e.is_request() => Attempt::Retry {
                    reason: e.to_string(),
                    wait: None,
                },
                Err(e) => Attempt::Fail(FeedError::Http(e)),
            };

            match outcome {
                Attempt::Fail(err) => return Err(err),
                Attempt::Retry { reason, wait } => {
                    last_error = reason;
                    if attempt + 1 < self.retry.max_attempts {
                        let delay = wait
                            .unwrap_or_else(|| self.retry.next_delay(attempt))
                            .min(self.retry.max_delay);
                        warn!(
                            endpoint,
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            error = %last_error,
                            "Odds request failed, retrying"
                        );
                        metrics::inc_fetch_retries();
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(FeedError::RetriesExhausted {
            endpoint: endpoint.to_string(),
            attempts: self.retry.max_attempts,
            last_error,
        })
    }
}

#[async_trait]
impl OddsFeed for OddsApiClient {
    #[instrument(skip(self))]
    async fn fetch_odds(&self, sport: &str) -> Result<Vec<Value>, FeedError> {
        let endpoint = format!("sports/{sport}/odds");
        let events: Vec<Value> = self.get_json(&endpoint, &self.query.params()).await?;
        debug!(sport, events = events.len(), "Fetched odds");
        Ok(events)
    }
}

fn classify_status(endpoint: &str, response: &Response) -> Attempt {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let wait = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        return Attempt::Retry {
            reason: format!("HTTP {status}"),
            wait,
        };
    }

    if status.is_server_error() {
        return Attempt::Retry {
            reason: format!("HTTP {status}"),
            wait: None,
        };
    }

    Attempt::Fail(FeedError::Status {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
    })
}

fn log_quota(response: &Response) {
    let header = |name: &str| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    if let (Some(remaining), Some(used)) = (header("x-requests-remaining"), header("x-requests-used")) {
        debug!(remaining = %remaining, used = %used, "Odds API quota");
    }
}
