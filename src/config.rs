// Engine configuration: availability endpoint, retry, cache and an optional package catalog file
use std::fmt::Display;
use std::fs::read_to_string;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::availability_cache::{AvailabilityCache, CacheConfig};
use crate::availability_client::{
    ClientConfig, HttpAvailabilitySource, RetryConfig, StaticAvailabilitySource, StaticSourceConfig,
};
use crate::error::{AvailabilityError, ConfigError};
use crate::packages::PackageCatalog;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub api_base_url: String,
    pub timeout_ms: u64,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub static_source: StaticSourceConfig,
    // JSON package catalog; the built-in catalog is used when unset
    pub catalog_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            timeout_ms: 5000,
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
            static_source: StaticSourceConfig::default(),
            catalog_path: None,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    // Read BOOKING_* environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            api_base_url: try_load(&lookup, "BOOKING_API_BASE_URL", defaults.api_base_url)?,
            timeout_ms: try_load(&lookup, "BOOKING_TIMEOUT_MS", defaults.timeout_ms)?,
            retry: RetryConfig {
                max_retries: try_load(&lookup, "BOOKING_MAX_RETRIES", defaults.retry.max_retries)?,
                initial_backoff_ms: try_load(
                    &lookup,
                    "BOOKING_INITIAL_BACKOFF_MS",
                    defaults.retry.initial_backoff_ms,
                )?,
                ..defaults.retry
            },
            cache: CacheConfig {
                max_entries: try_load(
                    &lookup,
                    "BOOKING_CACHE_MAX_ENTRIES",
                    defaults.cache.max_entries,
                )?,
                default_ttl_seconds: try_load(
                    &lookup,
                    "BOOKING_CACHE_TTL_SECONDS",
                    defaults.cache.default_ttl_seconds,
                )?,
                ..defaults.cache
            },
            static_source: StaticSourceConfig {
                days_ahead: try_load(
                    &lookup,
                    "BOOKING_STATIC_DAYS_AHEAD",
                    defaults.static_source.days_ahead,
                )?,
                ..defaults.static_source
            },
            catalog_path: lookup("BOOKING_CATALOG_PATH").map(PathBuf::from),
        })
    }

    pub fn load_catalog(&self) -> Result<PackageCatalog, ConfigError> {
        match &self.catalog_path {
            Some(path) => {
                info!(path = %path.display(), "Loading package catalog");
                PackageCatalog::from_json(&read_to_string(path)?)
            }
            None => Ok(PackageCatalog::standard()),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api_base_url.clone(),
            timeout_ms: self.timeout_ms,
            retry_config: self.retry.clone(),
        }
    }

    pub fn http_source(&self) -> Result<HttpAvailabilitySource, AvailabilityError> {
        HttpAvailabilitySource::new(self.client_config())
    }

    pub fn static_availability_source(&self) -> StaticAvailabilitySource {
        StaticAvailabilitySource::starting_today(self.static_source.clone())
    }

    pub fn cache(&self) -> Arc<AvailabilityCache> {
        Arc::new(AvailabilityCache::new(self.cache.clone()))
    }
}

fn try_load<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
