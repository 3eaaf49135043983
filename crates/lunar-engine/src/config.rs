//! Process configuration for the engine.

use std::time::Duration;

use chrono::FixedOffset;
use serde::Serialize;

use crate::cache::{CacheConfig, DEFAULT_CAPACITY, DEFAULT_TTL};
use crate::error::{LunarError, Result};
use crate::extract::DEFAULT_MAX_INTERVALS;
use crate::resolve::source_offset;

/// Calendar page URL template; `{date}` becomes the ISO date.
pub const DEFAULT_BASE_URL: &str = "https://horoscopes.rambler.ru/moon/calendar/{date}/";

/// Default page fetch timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Default number of retries for connection failures and 429/5xx answers.
pub const DEFAULT_MAX_RETRIES: usize = 2;

/// Engine settings. Every field can come from the environment, see
/// [`EngineConfig::from_env`].
#[derive(Debug, Clone, Serialize)]
pub struct EngineConfig {
    /// `LUNAR_BASE_URL`
    pub base_url: String,
    /// `HTTP_TIMEOUT`, in seconds.
    pub http_timeout: Duration,
    /// `HTTP_MAX_RETRIES`
    pub max_retries: usize,
    /// `CACHE_TTL_SECONDS`
    pub cache_ttl: Duration,
    /// `CACHE_MAX_ENTRIES`
    pub cache_capacity: usize,
    /// `LUNAR_MAX_INTERVALS`
    pub max_intervals: usize,
    /// Offset of the wall-clock times on the page; fixed at UTC+3.
    #[serde(serialize_with = "serialize_offset")]
    pub source_offset: FixedOffset,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            cache_ttl: DEFAULT_TTL,
            cache_capacity: DEFAULT_CAPACITY,
            max_intervals: DEFAULT_MAX_INTERVALS,
            source_offset: source_offset(),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by whichever environment variables are set.
    ///
    /// # Errors
    ///
    /// Returns [`LunarError::InvalidConfig`] naming the variable if a value is
    /// not a number, or is zero where zero makes no sense.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`EngineConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = EngineConfig::default();

        if let Some(url) = lookup("LUNAR_BASE_URL") {
            config.base_url = url;
        }
        if let Some(secs) = parse_var(&lookup, "HTTP_TIMEOUT", 1)? {
            config.http_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = parse_var(&lookup, "HTTP_MAX_RETRIES", 0)? {
            config.max_retries = n as usize;
        }
        if let Some(secs) = parse_var(&lookup, "CACHE_TTL_SECONDS", 1)? {
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(n) = parse_var(&lookup, "CACHE_MAX_ENTRIES", 1)? {
            config.cache_capacity = n as usize;
        }
        if let Some(n) = parse_var(&lookup, "LUNAR_MAX_INTERVALS", 1)? {
            config.max_intervals = n as usize;
        }

        Ok(config)
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: self.cache_ttl,
            capacity: self.cache_capacity,
        }
    }
}

fn parse_var<F>(lookup: &F, key: &str, min: u64) -> Result<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let value: u64 = raw
        .trim()
        .parse()
        .map_err(|_| LunarError::InvalidConfig(format!("{key}='{raw}' is not a whole number")))?;
    if value < min {
        return Err(LunarError::InvalidConfig(format!(
            "{key}={value} must be at least {min}"
        )));
    }
    Ok(Some(value))
}

fn serialize_offset<S: serde::Serializer>(offset: &FixedOffset, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.collect_str(offset)
}
