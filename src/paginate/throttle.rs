//! Rate-limit coordination between pages
//!
//! Before each page the paginator asks the transport's oracle for the
//! binding's latest window and sleeps until it resets when the next request
//! would overrun it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::{ApiaryError, Result};
use crate::param::Param;
use crate::transport::{RateLimit, RateLimitKind, RateLimitOracle};
use crate::value::Value;

/// Params whose value is the number of items a request asks for
const LIMIT_PARAM_NAMES: [&str; 2] = ["limit", "count"];

/// Outcome of looking at the latest window
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Decision {
    Proceed,
    /// Sleep this long, then proceed
    Wait { duration: Duration, reason: &'static str },
    /// Page one without a known window; a failure may be retried once
    FirstRequestIgnored,
    /// The window already reset; proceed without throttling
    Stale { expired_for: Duration },
    /// No window past page one: the transport is not recording limits
    Unavailable,
}

/// What the throttle knows about the upcoming page
#[derive(Debug, Clone, Copy)]
pub(crate) struct PageState<'a> {
    pub binding: &'a str,
    pub page: usize,
    /// Item count of the page just fetched
    pub last_items: Option<usize>,
    pub params: &'a [Param],
    /// Arguments of the upcoming request, paging value included
    pub args: &'a [Value],
}

#[derive(Debug, Clone)]
pub(crate) struct Throttle {
    page_delay: Duration,
    fetch_attempts: usize,
    /// First numeric `limit`/`count` argument, once found
    limit_arg: Option<f64>,
}

impl Throttle {
    pub fn new(page_delay: Duration, fetch_attempts: usize) -> Self {
        Self {
            page_delay,
            fetch_attempts,
            limit_arg: None,
        }
    }

    /// Waits as the oracle demands.
    ///
    /// Returns `true` when the request goes out on page one without a
    /// known window.
    pub async fn check(&mut self, oracle: &dyn RateLimitOracle, state: PageState<'_>) -> Result<bool> {
        let limit = self.latest_limit(oracle, &state).await;

        match self.decide(limit.as_ref(), Utc::now(), &state) {
            Decision::Proceed => Ok(false),
            Decision::Wait { duration, reason } => {
                let message = format!(
                    "{} for '{}' on page no. {}. Sleeping for {:?}",
                    reason, state.binding, state.page, duration
                );
                info!(binding = state.binding, page = state.page, wait = ?duration, "{}", reason);
                oracle.log(&message);
                tokio::time::sleep(duration).await;
                Ok(false)
            }
            Decision::FirstRequestIgnored => {
                debug!(binding = state.binding, "no rate limit known yet, sending first request anyway");
                Ok(true)
            }
            Decision::Stale { expired_for } => {
                let message = format!(
                    "Latest rate limit for '{}' reset {:?} ago, executing anyway",
                    state.binding, expired_for
                );
                debug!(binding = state.binding, page = state.page, "{}", message);
                oracle.log(&message);
                Ok(false)
            }
            Decision::Unavailable => {
                let message = format!(
                    "Could not get the latest rate limit for '{}' on page no. {}",
                    state.binding, state.page
                );
                warn!(binding = state.binding, page = state.page, "{}", message);
                oracle.log(&message);
                Err(ApiaryError::RateLimitUnavailable {
                    binding: state.binding.to_string(),
                    page: state.page,
                })
            }
        }
    }

    /// Asks the oracle, retrying with the page delay while it has nothing
    async fn latest_limit(&self, oracle: &dyn RateLimitOracle, state: &PageState<'_>) -> Option<RateLimit> {
        let mut limit = oracle.latest_limit(state.binding);
        let mut tries_left = self.fetch_attempts;
        while limit.is_none() && tries_left > 0 {
            oracle.log(&format!(
                "Could not get latest rate limit for '{}' on page no. {}. Trying again in {:?} ({} tries left)...",
                state.binding, state.page, self.page_delay, tries_left
            ));
            tokio::time::sleep(self.page_delay).await;
            limit = oracle.latest_limit(state.binding);
            tries_left -= 1;
        }
        limit
    }

    pub fn decide(&mut self, limit: Option<&RateLimit>, now: DateTime<Utc>, state: &PageState<'_>) -> Decision {
        let Some(limit) = limit else {
            return if state.page == 1 {
                Decision::FirstRequestIgnored
            } else {
                Decision::Unavailable
            };
        };

        let Some(until_reset) = limit.time_until_reset(now) else {
            return Decision::Stale {
                expired_for: (now - limit.reset).to_std().unwrap_or_default(),
            };
        };

        let wait = |reason| Decision::Wait {
            duration: until_reset,
            reason,
        };

        match limit.kind {
            RateLimitKind::Requests if limit.remaining == 0 => wait("Request rate limit exhausted"),
            RateLimitKind::Requests => Decision::Proceed,
            RateLimitKind::Resources => {
                let remaining = limit.remaining as f64;
                if limit.remaining == 0 || state.last_items.is_some_and(|n| n as f64 > remaining) {
                    return wait("Resource rate limit exhausted");
                }
                if state.page == 1 {
                    if let Some(requested) = self.limit_arg(state) {
                        if requested > remaining {
                            return wait("Requested resources exceed the remaining rate limit");
                        }
                    }
                }
                Decision::Proceed
            }
        }
    }

    /// Effective `limit`/`count` argument: explicit arg, else the default
    fn limit_arg(&mut self, state: &PageState<'_>) -> Option<f64> {
        if self.limit_arg.is_none() {
            self.limit_arg = state
                .params
                .iter()
                .enumerate()
                .filter(|(_, p)| LIMIT_PARAM_NAMES.contains(&p.name()))
                .find_map(|(i, p)| match state.args.get(i) {
                    Some(arg) => arg.as_f64(),
                    None if !p.is_required() && !p.is_variadic() => p.default_value().as_f64(),
                    None => None,
                });
        }
        self.limit_arg
    }
}
