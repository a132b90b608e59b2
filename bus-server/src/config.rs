//! Application configuration from environment variables.

use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::feed::FeedConfig;
use crate::store::StoreConfig;

/// Error for an environment variable that is set but unusable.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set unless BUS_MOCK_DATA is used")]
    Missing(&'static str),
}

/// Where bus documents come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    /// The live document store.
    Store {
        url: String,
        collection: String,
        api_key: String,
    },
    /// A JSON file served by the mock store.
    Mock { path: PathBuf },
}

/// Everything the server reads from its environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub source: SourceConfig,
    pub subscription: bool,
    pub refresh_interval: Duration,
    pub static_dir: PathBuf,
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to read variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let source = match get("BUS_MOCK_DATA") {
            Some(path) => SourceConfig::Mock { path: path.into() },
            None => SourceConfig::Store {
                url: get("BUS_STORE_URL").ok_or(ConfigError::Missing("BUS_STORE_URL"))?,
                collection: get("BUS_STORE_COLLECTION").unwrap_or_else(|| "buses".to_string()),
                api_key: get("BUS_STORE_API_KEY").unwrap_or_else(|| {
                    tracing::warn!("BUS_STORE_API_KEY not set, store requests may be rejected");
                    String::new()
                }),
            },
        };

        let refresh_secs: u64 = parse_or(&get, "BUS_REFRESH_SECS", 300)?;
        if refresh_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "BUS_REFRESH_SECS",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }

        let defaults = CacheConfig::default();
        let cache_ttl = parse_or(&get, "BUS_CACHE_TTL_SECS", defaults.ttl.as_secs())?;
        let cache_capacity = parse_or(&get, "BUS_CACHE_CAPACITY", defaults.max_capacity)?;
        let cache = defaults
            .with_ttl(Duration::from_secs(cache_ttl))
            .with_max_capacity(cache_capacity);

        let default_addr = SocketAddr::from(([127, 0, 0, 1], 3000));
        Ok(Self {
            bind_addr: parse_or(&get, "BUS_BIND_ADDR", default_addr)?,
            source,
            subscription: parse_bool_or(&get, "BUS_SUBSCRIPTION", true)?,
            refresh_interval: Duration::from_secs(refresh_secs),
            static_dir: get("BUS_STATIC_DIR")
                .unwrap_or_else(|| "static".to_string())
                .into(),
            cache,
        })
    }

    /// Store client configuration, when running against the live store.
    pub fn store_config(&self) -> Option<StoreConfig> {
        match &self.source {
            SourceConfig::Store {
                url,
                collection,
                api_key,
            } => Some(StoreConfig::new(url, api_key).with_collection(collection)),
            SourceConfig::Mock { .. } => None,
        }
    }

    pub fn feed_config(&self) -> FeedConfig {
        FeedConfig::new(self.subscription, self.refresh_interval)
    }
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match get(key) {
        None => {
            tracing::info!("{key} not set, using default: {default}");
            Ok(default)
        }
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

fn parse_bool_or(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(value) = get(key) else {
        return Ok(default);
    };
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value,
            reason: "expected true or false".into(),
        }),
    }
}
