//! # Pagination
//!
//! A [`Paginator`] drives a paginated [`Binding`] page by page:
//!
//! 1. pick the paging value from the detected [`PageConvention`]
//! 2. insert it into the caller's arguments
//! 3. throttle against the transport's rate-limit oracle, if it has one
//! 4. execute the binding, retrying once on page one when no limit was known
//! 5. record the page, advance, and pause for the configured delay
//!
//! ```rust,ignore
//! let mut pages = Paginator::new(transport, Duration::ZERO, &list_users, vec![])?;
//! let users = pages.all().await?;
//! ```

mod convention;
mod page;
mod throttle;

pub use convention::PageConvention;
pub use page::{AfterCursor, MergeKind, PageResult};

use std::any::type_name;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::binding::Binding;
use crate::config::PaginatorConfig;
use crate::error::{ApiaryError, Result};
use crate::transport::{CallContext, Transport};
use crate::value::Value;

use convention::CursorState;
use throttle::{PageState, Throttle};

// ============================================================================
// INTERRUPTED
// ============================================================================

/// A collector failed part way; `partial` holds the pages merged so far
pub struct Interrupted<Ret> {
    pub partial: Ret,
    pub source: ApiaryError,
}

impl<Ret> Interrupted<Ret> {
    pub fn into_parts(self) -> (Ret, ApiaryError) {
        (self.partial, self.source)
    }
}

impl<Ret> fmt::Debug for Interrupted<Ret> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interrupted")
            .field("partial", &type_name::<Ret>())
            .field("source", &self.source)
            .finish()
    }
}

impl<Ret> fmt::Display for Interrupted<Ret> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.source.fmt(f)
    }
}

impl<Ret> std::error::Error for Interrupted<Ret> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl<Ret> From<Interrupted<Ret>> for ApiaryError {
    fn from(interrupted: Interrupted<Ret>) -> Self {
        interrupted.source
    }
}

// ============================================================================
// PAGINATOR
// ============================================================================

/// What is kept of the last fetched page once it has been taken
#[derive(Debug, Clone, Copy)]
struct PageSummary {
    items: usize,
    has_more: bool,
}

/// Fetches the pages of one paginated binding
pub struct Paginator<Res, Ret> {
    transport: Arc<dyn Transport>,
    binding: Binding<Res, Ret>,
    convention: PageConvention,
    args: Vec<Value>,
    config: PaginatorConfig,
    throttle: Throttle,
    page: usize,
    current: Option<Ret>,
    last: Option<PageSummary>,
    cursor: CursorState,
}

impl<Res, Ret> Paginator<Res, Ret>
where
    Res: DeserializeOwned + Send + 'static,
    Ret: PageResult,
{
    /// Paginator pausing `wait` after every page
    pub fn new(
        transport: Arc<dyn Transport>,
        wait: Duration,
        binding: &Binding<Res, Ret>,
        args: Vec<Value>,
    ) -> Result<Self> {
        Self::from_config(
            transport,
            PaginatorConfig::default().with_page_delay(wait),
            binding,
            args,
        )
    }

    pub fn from_config(
        transport: Arc<dyn Transport>,
        config: PaginatorConfig,
        binding: &Binding<Res, Ret>,
        args: Vec<Value>,
    ) -> Result<Self> {
        let name = binding.name();
        if !binding.paginated() {
            return Err(ApiaryError::NotPaginated {
                binding: name.to_string(),
            });
        }
        binding.check_params()?;

        let convention = PageConvention::detect(binding.schema()).ok_or_else(|| ApiaryError::NoPaginationParams {
            binding: name.to_string(),
            expected: PageConvention::PARAM_NAMES.join(", "),
        })?;

        info!(binding = name, convention = %convention, wait = ?config.page_delay, "created paginator");

        Ok(Self {
            transport,
            binding: binding.clone(),
            convention,
            args,
            throttle: Throttle::new(config.page_delay, config.limit_fetch_attempts),
            config,
            page: 1,
            current: None,
            last: None,
            cursor: CursorState::Start,
        })
    }

    /// Replaces the configuration; only affects pages not yet fetched
    pub fn with_config(mut self, config: PaginatorConfig) -> Self {
        self.throttle = Throttle::new(config.page_delay, config.limit_fetch_attempts);
        self.config = config;
        self
    }

    // ═══════════════════════════════════════════
    // STATE
    // ═══════════════════════════════════════════

    /// Number of the page the next call to [`next`](Self::next) fetches
    pub fn page_no(&self) -> usize {
        self.page
    }

    /// The last fetched page, if it has not been taken
    pub fn page(&self) -> Option<&Ret> {
        self.current.as_ref()
    }

    pub fn take_page(&mut self) -> Option<Ret> {
        self.current.take()
    }

    pub fn convention(&self) -> &PageConvention {
        &self.convention
    }

    pub fn binding(&self) -> &Binding<Res, Ret> {
        &self.binding
    }

    pub fn config(&self) -> &PaginatorConfig {
        &self.config
    }

    /// Whether another page should be fetched
    pub fn continue_(&self) -> bool {
        let Some(last) = self.last else {
            return true;
        };
        if self.cursor == CursorState::Exhausted {
            return false;
        }
        match Ret::KIND {
            MergeKind::Sequence => last.items > 0,
            MergeKind::Mergeable => last.has_more,
        }
    }

    // ═══════════════════════════════════════════
    // FETCHING
    // ═══════════════════════════════════════════

    /// Fetches the next page into [`page`](Self::page)
    pub async fn next(&mut self) -> Result<()> {
        let page = self.page;
        let value = self.convention.value_for(page, &self.cursor, type_name::<Ret>())?;
        let args = self.convention.insert(self.binding.params(), &self.args, value, page)?;
        debug!(binding = self.binding.name(), page, args = args.len(), "fetching page");

        let first_ignored = self.throttle_page(page, &args).await.map_err(|e| wrap_page(page, e))?;

        let result = match self.execute(page, 1, args.clone()).await {
            Ok(result) => result,
            Err(err) if first_ignored => {
                warn!(
                    binding = self.binding.name(),
                    error = %err,
                    "first request failed without a known rate limit, retrying once"
                );
                let retry = match self.throttle_page(page, &args).await {
                    Ok(_) => self.execute(page, 2, args).await,
                    Err(e) => Err(e),
                };
                retry.map_err(|e| ApiaryError::PageRetry {
                    page,
                    source: Box::new(e),
                })?
            }
            Err(err) => return Err(wrap_page(page, err)),
        };

        self.record(result);
        self.page += 1;

        if !self.config.page_delay.is_zero() {
            tokio::time::sleep(self.config.page_delay).await;
        }
        Ok(())
    }

    async fn throttle_page(&mut self, page: usize, args: &[Value]) -> Result<bool> {
        let Some(oracle) = self.transport.rate_limits() else {
            return Ok(false);
        };
        let state = PageState {
            binding: self.binding.name(),
            page,
            last_items: self.last.map(|last| last.items),
            params: self.binding.params(),
            args,
        };
        self.throttle.check(oracle, state).await
    }

    async fn execute(&self, page: usize, attempt: usize, args: Vec<Value>) -> Result<Ret> {
        let ctx = CallContext::for_page(page, attempt);
        self.binding.execute_in(&ctx, self.transport.as_ref(), args).await
    }

    fn record(&mut self, result: Ret) {
        if matches!(self.convention, PageConvention::After { .. }) {
            self.cursor = match result.as_after_cursor() {
                None => CursorState::Unsupported,
                Some(cursor) => cursor.after_cursor().map_or(CursorState::Exhausted, CursorState::Next),
            };
        }
        let summary = PageSummary {
            items: result.item_count(),
            has_more: result.has_more(),
        };
        debug!(
            binding = self.binding.name(),
            page = self.page,
            items = summary.items,
            has_more = summary.has_more,
            "fetched page"
        );
        self.last = Some(summary);
        self.current = Some(result);
    }

    // ═══════════════════════════════════════════
    // COLLECTORS
    // ═══════════════════════════════════════════

    /// Fetches and merges every remaining page
    pub async fn all(&mut self) -> std::result::Result<Ret, Interrupted<Ret>> {
        self.collect(|_, _| true).await
    }

    /// Fetches and merges pages up to and including page `last`
    pub async fn pages(&mut self, last: usize) -> std::result::Result<Ret, Interrupted<Ret>> {
        self.collect(move |paginator, _| paginator.page <= last).await
    }

    /// Fetches and merges pages while `keep_going` holds.
    ///
    /// The predicate sees the paginator and the pages merged so far, and is
    /// asked before every page.
    pub async fn until<F>(&mut self, keep_going: F) -> std::result::Result<Ret, Interrupted<Ret>>
    where
        F: FnMut(&Self, &Ret) -> bool,
    {
        self.collect(keep_going).await
    }

    async fn collect<F>(&mut self, mut keep_going: F) -> std::result::Result<Ret, Interrupted<Ret>>
    where
        F: FnMut(&Self, &Ret) -> bool,
    {
        let mut total: Option<Ret> = None;
        let empty = Ret::default();

        while self.continue_() && keep_going(self, total.as_ref().unwrap_or(&empty)) {
            if let Err(source) = self.next().await {
                return Err(Interrupted {
                    partial: total.unwrap_or_default(),
                    source,
                });
            }

            let Some(page) = self.take_page() else {
                continue;
            };
            match total.as_mut() {
                None => total = Some(page),
                Some(merged) => {
                    if let Err(source) = merged.merge_from(page) {
                        return Err(Interrupted {
                            partial: total.unwrap_or_default(),
                            source: ApiaryError::Merge {
                                page: self.page - 1,
                                source,
                            },
                        });
                    }
                }
            }
        }

        Ok(total.unwrap_or_default())
    }
}

impl<Res, Ret> fmt::Debug for Paginator<Res, Ret> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Paginator")
            .field("binding", &self.binding)
            .field("convention", &self.convention)
            .field("page", &self.page)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn wrap_page(page: usize, source: ApiaryError) -> ApiaryError {
    ApiaryError::Page {
        page,
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;
    use crate::transport::{HttpRequest, MockTransport};
    use serde_json::json;

    fn numbers() -> Binding<Vec<u32>, Vec<u32>> {
        Binding::new()
            .with_name("numbers")
            .with_paginated(true)
            .with_params(|| params!["page", 1, true])
            .with_request(|cx| Ok(Box::new(HttpRequest::get(format!("/numbers?page={}", cx.args[0])))))
    }

    #[test]
    fn construction_requires_paginated_binding() {
        let transport: Arc<dyn Transport> = Arc::new(MockTransport::new());
        let err = Paginator::new(transport.clone(), Duration::ZERO, &numbers().with_paginated(false), vec![]).unwrap_err();
        assert!(matches!(err, ApiaryError::NotPaginated { .. }));

        let no_params = numbers().with_params(|| params!["q", ""]);
        let err = Paginator::new(transport, Duration::ZERO, &no_params, vec![]).unwrap_err();
        assert!(matches!(err, ApiaryError::NoPaginationParams { ref expected, .. } if expected == "page, after"));
    }

    #[test]
    fn construction_reports_schema_errors() {
        let transport: Arc<dyn Transport> = Arc::new(MockTransport::new());
        let bad = numbers().with_params(|| params!["page", 1, "page", 2]);
        let err = Paginator::new(transport, Duration::ZERO, &bad, vec![]).unwrap_err();
        assert!(err.param_error().is_some_and(|e| e.is_schema_error()));
    }

    #[tokio::test]
    async fn next_passes_page_numbers_and_context() {
        let mock = Arc::new(MockTransport::with_replies([json!([1, 2]), json!([3])]));
        let mut p = Paginator::new(mock.clone(), Duration::ZERO, &numbers(), vec![]).unwrap();

        assert!(p.continue_());
        p.next().await.unwrap();
        assert_eq!(p.page(), Some(&vec![1, 2]));
        p.next().await.unwrap();
        assert_eq!(p.take_page(), Some(vec![3]));
        assert_eq!(p.page_no(), 3);

        let calls = mock.calls();
        assert_eq!(calls[0].url.as_deref(), Some("/numbers?page=1"));
        assert_eq!(calls[1].url.as_deref(), Some("/numbers?page=2"));
        assert_eq!(calls[1].ctx, CallContext::for_page(2, 1));
    }

    #[tokio::test]
    async fn empty_page_stops_sequence() {
        let mock = Arc::new(MockTransport::with_replies([json!([1]), json!([])]));
        let mut p = Paginator::new(mock.clone(), Duration::ZERO, &numbers(), vec![]).unwrap();
        assert_eq!(p.all().await.unwrap(), vec![1]);
        assert!(!p.continue_());
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn transport_failure_is_wrapped_with_page() {
        let mock = Arc::new(MockTransport::with_replies([json!([1])]));
        mock.push_error("boom");
        let mut p = Paginator::new(mock.clone(), Duration::ZERO, &numbers(), vec![]).unwrap();

        let interrupted = p.all().await.unwrap_err();
        assert_eq!(interrupted.partial, vec![1]);
        assert!(matches!(interrupted.source, ApiaryError::Page { page: 2, .. }));
        assert!(matches!(interrupted.source.root_cause(), ApiaryError::Transport { .. }));
    }
}
