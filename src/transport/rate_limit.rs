//! Rate-limit windows reported by transports
//!
//! A transport that tracks quotas exposes a [`RateLimitOracle`]. The
//! paginator asks it for the latest window of a binding before every page.
//! [`RateLimitStore`] is a ready-made bookkeeping map a transport can record
//! windows into as responses arrive.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// What a rate limit counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitKind {
    /// Number of requests per window
    Requests,
    /// Number of resources (items) fetched per window
    Resources,
}

/// One quota window for a binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub reset: DateTime<Utc>,
    pub remaining: u64,
    pub used: u64,
    pub kind: RateLimitKind,
}

impl RateLimit {
    pub fn requests(reset: DateTime<Utc>, remaining: u64, used: u64) -> Self {
        Self {
            reset,
            remaining,
            used,
            kind: RateLimitKind::Requests,
        }
    }

    pub fn resources(reset: DateTime<Utc>, remaining: u64, used: u64) -> Self {
        Self {
            reset,
            remaining,
            used,
            kind: RateLimitKind::Resources,
        }
    }

    /// Time left until the window resets, `None` if it already has
    pub fn time_until_reset(&self, now: DateTime<Utc>) -> Option<std::time::Duration> {
        (self.reset - now).to_std().ok().filter(|d| !d.is_zero())
    }
}

/// Rate-limit capability of a transport
pub trait RateLimitOracle: Send + Sync {
    /// Latest known window for the binding, if any has been observed
    fn latest_limit(&self, binding: &str) -> Option<RateLimit>;

    /// Sink for the paginator's throttling messages
    fn log(&self, _message: &str) {}
}

/// Concurrent binding-name to window map.
///
/// Keeps, per binding, the window that resets last.
#[derive(Debug, Default)]
pub struct RateLimitStore {
    limits: DashMap<String, RateLimit>,
}

impl RateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a window, unless a later-resetting one is already known
    pub fn add(&self, binding: &str, limit: RateLimit) {
        self.limits
            .entry(binding.to_string())
            .and_modify(|current| {
                if limit.reset >= current.reset {
                    *current = limit.clone();
                }
            })
            .or_insert(limit);
    }

    pub fn latest(&self, binding: &str) -> Option<RateLimit> {
        self.limits.get(binding).map(|entry| entry.value().clone())
    }

    pub fn clear(&self) {
        self.limits.clear();
    }

    pub fn len(&self) -> usize {
        self.limits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }
}

impl RateLimitOracle for RateLimitStore {
    fn latest_limit(&self, binding: &str) -> Option<RateLimit> {
        self.latest(binding)
    }
}
