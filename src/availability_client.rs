// Availability sources: the only asynchronous boundary of the engine.
// A source turns a destination id into an AvailabilityMap; callers treat any error as "no availability".

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Local, NaiveDate};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::availability::AvailabilityMap;
use crate::error::AvailabilityError;
use crate::wire::AvailableDatesResponse;

pub const AVAILABLE_DATES_PATH: &str = "/api/destinations/available-dates";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

// Exponential backoff with jitter
pub fn calculate_backoff(retry_attempt: u32, config: &RetryConfig) -> Duration {
    let base_backoff_ms = (config.initial_backoff_ms as f64
        * config.backoff_multiplier.powf(retry_attempt as f64))
    .min(config.max_backoff_ms as f64);

    let jitter = rand::random::<f64>() * config.jitter_factor * base_backoff_ms;
    let backoff_ms = base_backoff_ms * (1.0 - config.jitter_factor / 2.0) + jitter;

    Duration::from_millis(backoff_ms as u64)
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ClientStats {
    pub requests_sent: usize,
    pub requests_succeeded: usize,
    pub requests_failed: usize,
    pub requests_retried: usize,
    pub requests_timeout: usize,
}

#[async_trait]
pub trait AvailabilitySource: Send + Sync + 'static {
    async fn fetch(&self, destination_id: &str) -> Result<AvailabilityMap, AvailabilityError>;
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub retry_config: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout_ms: 5000,
            retry_config: RetryConfig::default(),
        }
    }
}

// Fetches availability from the site's available-dates endpoint
pub struct HttpAvailabilitySource {
    client: reqwest::Client,
    config: ClientConfig,
    stats: Mutex<ClientStats>,
}

impl HttpAvailabilitySource {
    pub fn new(config: ClientConfig) -> Result<Self, AvailabilityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AvailabilityError::NetworkError(e.to_string()))?;

        Ok(Self {
            client,
            config,
            stats: Mutex::new(ClientStats::default()),
        })
    }

    pub fn stats(&self) -> ClientStats {
        self.stats.lock().clone()
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            AVAILABLE_DATES_PATH
        )
    }

    async fn fetch_once(&self, destination_id: &str) -> Result<AvailabilityMap, AvailabilityError> {
        self.stats.lock().requests_sent += 1;

        let response = self
            .client
            .get(self.endpoint())
            .query(&[("destinationId", destination_id)])
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AvailabilityError::ApiResponseError {
                status_code: status.as_u16(),
                message: status.canonical_reason().unwrap_or("unknown").to_string(),
                is_retryable: status.is_server_error() || status.as_u16() == 429,
            });
        }

        let body: Bytes = response.bytes().await.map_err(|e| self.map_request_error(e))?;
        let parsed: AvailableDatesResponse = serde_json::from_slice(&body)?;
        if !parsed.success {
            return Err(AvailabilityError::Unsuccessful(destination_id.to_string()));
        }

        Ok(AvailabilityMap::from_wire(parsed.dates))
    }

    fn map_request_error(&self, err: reqwest::Error) -> AvailabilityError {
        if err.is_timeout() {
            self.stats.lock().requests_timeout += 1;
            AvailabilityError::Timeout(self.config.timeout_ms)
        } else {
            AvailabilityError::NetworkError(err.to_string())
        }
    }
}

#[async_trait]
impl AvailabilitySource for HttpAvailabilitySource {
    async fn fetch(&self, destination_id: &str) -> Result<AvailabilityMap, AvailabilityError> {
        let retry_config = &self.config.retry_config;
        let mut attempt = 0;

        loop {
            match self.fetch_once(destination_id).await {
                Ok(map) => {
                    self.stats.lock().requests_succeeded += 1;
                    debug!(destination_id, dates = map.len(), "Fetched availability");
                    return Ok(map);
                }
                Err(err) if err.is_retryable() && attempt < retry_config.max_retries => {
                    let backoff = calculate_backoff(attempt, retry_config);
                    warn!(
                        destination_id,
                        attempt,
                        "Availability fetch failed ({}), retrying in {:?}",
                        err,
                        backoff
                    );
                    self.stats.lock().requests_retried += 1;
                    attempt += 1;
                    sleep(backoff).await;
                }
                Err(err) => {
                    self.stats.lock().requests_failed += 1;
                    warn!(destination_id, "Availability fetch failed: {}", err);
                    return Err(err);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticSourceConfig {
    pub days_ahead: u32,
    pub max_slots: i64,
    pub seed: u64,
}

impl Default for StaticSourceConfig {
    fn default() -> Self {
        Self {
            days_ahead: 90,
            max_slots: 20,
            seed: 7,
        }
    }
}

// Generates availability locally for pages that have no backend endpoint.
// Output depends only on the start date, the seed and the destination id.
pub struct StaticAvailabilitySource {
    start: NaiveDate,
    config: StaticSourceConfig,
}

impl StaticAvailabilitySource {
    pub fn new(start: NaiveDate, config: StaticSourceConfig) -> Self {
        Self { start, config }
    }

    pub fn starting_today(config: StaticSourceConfig) -> Self {
        Self::new(Local::now().date_naive(), config)
    }

    pub fn generate(&self, destination_id: &str) -> AvailabilityMap {
        let id_seed = destination_id
            .bytes()
            .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b)));
        let mut rng = StdRng::seed_from_u64(self.config.seed ^ id_seed);
        let max_slots = self.config.max_slots.max(0);

        self.start
            .iter_days()
            .take(self.config.days_ahead as usize)
            .map(|date| (date, rng.gen_range(0..=max_slots)))
            .collect()
    }
}

#[async_trait]
impl AvailabilitySource for StaticAvailabilitySource {
    async fn fetch(&self, destination_id: &str) -> Result<AvailabilityMap, AvailabilityError> {
        let map = self.generate(destination_id);
        info!(destination_id, dates = map.len(), "Generated static availability");
        Ok(map)
    }
}
