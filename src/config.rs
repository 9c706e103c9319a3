//! Paginator Configuration
//!
//! Tunes the pauses a [`Paginator`](crate::paginate::Paginator) makes between
//! pages and between rate-limit lookups. Config can be given inline, read
//! from a YAML file, or overridden from the environment.
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Environment variables (`APIARY_PAGE_DELAY_MS`, `APIARY_LIMIT_FETCH_ATTEMPTS`)
//! 2. Config file
//! 3. Defaults (no delay, 3 lookup attempts)
//!
//! ```yaml
//! page_delay_ms: 250
//! limit_fetch_attempts: 5
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ApiaryError, Result};

pub const ENV_PAGE_DELAY_MS: &str = "APIARY_PAGE_DELAY_MS";
pub const ENV_LIMIT_FETCH_ATTEMPTS: &str = "APIARY_LIMIT_FETCH_ATTEMPTS";

const DEFAULT_LIMIT_FETCH_ATTEMPTS: usize = 3;

/// Paginator tuning knobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaginatorConfig {
    /// Pause after every page, also used between rate-limit lookups
    #[serde(rename = "page_delay_ms", with = "millis")]
    pub page_delay: Duration,

    /// How many extra times to ask the oracle for a missing rate limit
    pub limit_fetch_attempts: usize,
}

impl Default for PaginatorConfig {
    fn default() -> Self {
        Self {
            page_delay: Duration::ZERO,
            limit_fetch_attempts: DEFAULT_LIMIT_FETCH_ATTEMPTS,
        }
    }
}

impl PaginatorConfig {
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn with_limit_fetch_attempts(mut self, attempts: usize) -> Self {
        self.limit_fetch_attempts = attempts;
        self
    }

    /// Parse configuration from YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| ApiaryError::Config {
            reason: format!("Failed to parse paginator config: {}", e),
        })
    }

    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ApiaryError::Config {
            reason: format!("Failed to read config file {}: {}", path.display(), e),
        })?;
        Self::from_yaml_str(&content)
    }

    /// Merge with environment variables
    ///
    /// Environment variables take precedence over file values. Empty
    /// variables are ignored; unparsable ones are an error.
    pub fn with_env(self) -> Result<Self> {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// [`with_env`](Self::with_env) over an arbitrary variable source
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(ms) = read_var(&lookup, ENV_PAGE_DELAY_MS)? {
            self.page_delay = Duration::from_millis(ms);
        }
        if let Some(attempts) = read_var(&lookup, ENV_LIMIT_FETCH_ATTEMPTS)? {
            self.limit_fetch_attempts = attempts;
        }
        Ok(self)
    }
}

fn read_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map(Some).map_err(|e| ApiaryError::Config {
            reason: format!("{}={:?} is not valid: {}", key, raw, e),
        }),
        _ => Ok(None),
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
