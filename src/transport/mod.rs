//! # Transport Abstraction Layer
//!
//! Bindings never talk to the network themselves. They build a [`Request`],
//! hand it to a [`Transport`] together with an empty response container, and
//! read the populated container back.
//!
//! - [`Transport`] - Core trait for running a binding's request
//! - [`HttpRequest`] / [`GraphQlRequest`] - Request shapes
//! - [`RateLimitOracle`] - Optional capability reporting quota windows
//! - [`MockTransport`] - Scripted transport for tests
//!
//! ## Transport Trait
//!
//! ```rust,ignore
//! #[async_trait]
//! pub trait Transport: Send + Sync {
//!     async fn run(&self, ctx: &CallContext, binding: &str, attrs: &Attrs,
//!                  request: &dyn Request, response: &mut dyn ResponseContainer) -> anyhow::Result<()>;
//!     fn rate_limits(&self) -> Option<&dyn RateLimitOracle> { None }
//!     fn setting(&self, key: &str) -> Option<serde_json::Value> { None }
//! }
//! ```

mod mock;
mod rate_limit;

pub use mock::{MockTransport, RecordedCall};
pub use rate_limit::{RateLimit, RateLimitKind, RateLimitOracle, RateLimitStore};

use std::any::Any;
use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::binding::{Attrs, ResponseContainer};

// ============================================================================
// CALL CONTEXT
// ============================================================================

/// Per-call information passed to the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// Page being fetched, when driven by a paginator
    pub page: Option<usize>,
    /// 1 for the first attempt, 2 for the page-one retry
    pub attempt: usize,
}

impl CallContext {
    pub fn new() -> Self {
        Self {
            page: None,
            attempt: 1,
        }
    }

    pub fn for_page(page: usize, attempt: usize) -> Self {
        Self {
            page: Some(page),
            attempt,
        }
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// REQUESTS
// ============================================================================

/// A transport-agnostic request value.
///
/// The engine only touches headers; everything else is for the transport.
pub trait Request: Send + Sync + fmt::Debug {
    fn headers(&self) -> &HeaderMap;

    fn headers_mut(&mut self) -> &mut HeaderMap;

    fn as_any(&self) -> &dyn Any;

    /// Sets a header, ignoring names or values that are not valid HTTP
    fn set_header(&mut self, name: &str, value: &str) {
        match (HeaderName::try_from(name), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                self.headers_mut().insert(name, value);
            }
            _ => tracing::debug!(header = name, "skipping invalid header"),
        }
    }
}

/// A REST request
#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<serde_json::Value>,
    pub headers: HeaderMap,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

impl Request for HttpRequest {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A GraphQL query with its variables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphQlRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub variables: serde_json::Map<String, serde_json::Value>,
    #[serde(skip)]
    pub headers: HeaderMap,
}

impl GraphQlRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn var(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }
}

impl Request for GraphQlRequest {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// TRANSPORT TRAIT
// ============================================================================

/// Runs a binding's request and populates its response container
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs the call. Must populate `response` on success.
    async fn run(
        &self,
        ctx: &CallContext,
        binding: &str,
        attrs: &Attrs,
        request: &dyn Request,
        response: &mut dyn ResponseContainer,
    ) -> Result<()>;

    /// Rate-limit capability, if the transport tracks quotas
    fn rate_limits(&self) -> Option<&dyn RateLimitOracle> {
        None
    }

    /// Transport-level setting, read by attribute thunks
    fn setting(&self, _key: &str) -> Option<serde_json::Value> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_http_request_is_an_empty_get() {
        let req = HttpRequest::default();
        assert_eq!(req.method, Method::GET);
        assert!(req.url.is_empty());
        assert!(req.headers().is_empty());
    }

    #[test]
    fn set_header_skips_invalid_names() {
        let mut req = HttpRequest::get("https://api.example.com/users");
        req.set_header("Accept", "application/json");
        req.set_header("bad header", "x");
        assert_eq!(req.headers().len(), 1);
        assert_eq!(req.headers()["accept"], "application/json");
    }

    #[test]
    fn graphql_request_serializes_without_headers() {
        let mut req = GraphQlRequest::new("query { viewer { login } }").var("first", serde_json::json!(10));
        req.set_header("Authorization", "bearer x");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["variables"]["first"], 10);
        assert!(json.get("headers").is_none());
        assert!(req.as_any().downcast_ref::<GraphQlRequest>().is_some());
    }

    #[test]
    fn call_context_defaults() {
        assert_eq!(CallContext::new().attempt, 1);
        assert_eq!(CallContext::for_page(3, 2).page, Some(3));
    }
}
