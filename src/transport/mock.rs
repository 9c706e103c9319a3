//! Mock transport for testing
//!
//! Replays scripted replies without making real API calls and records every
//! call for assertions. Optionally acts as a rate-limit oracle backed by a
//! [`RateLimitStore`].

use std::collections::{HashMap, VecDeque};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;

use super::{CallContext, GraphQlRequest, HttpRequest, RateLimit, RateLimitOracle, RateLimitStore, Request, Transport};
use crate::binding::{Attrs, ResponseContainer};

/// One scripted reply
#[derive(Debug, Clone)]
struct Reply {
    outcome: std::result::Result<serde_json::Value, String>,
    /// Window recorded for the binding once the call completes
    limit: Option<RateLimit>,
}

/// A call seen by the mock
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub binding: String,
    pub ctx: CallContext,
    pub attrs: Attrs,
    /// URL of an [`HttpRequest`]
    pub url: Option<String>,
    /// Body of an [`HttpRequest`], or the variables of a [`GraphQlRequest`]
    pub body: Option<serde_json::Value>,
}

/// Transport that returns predefined replies
#[derive(Debug, Default)]
pub struct MockTransport {
    /// Queue of replies (FIFO)
    replies: Mutex<VecDeque<Reply>>,
    /// Reply when the queue is empty
    default_reply: Option<serde_json::Value>,
    calls: Mutex<Vec<RecordedCall>>,
    settings: HashMap<String, serde_json::Value>,
    rate_limits: Option<RateLimitStore>,
    logs: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with a queue of successful replies
    pub fn with_replies(replies: impl IntoIterator<Item = serde_json::Value>) -> Self {
        let mock = Self::new();
        for reply in replies {
            mock.push_reply(reply);
        }
        mock
    }

    /// Reply used once the queue runs dry
    pub fn with_default(mut self, reply: serde_json::Value) -> Self {
        self.default_reply = Some(reply);
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.settings.insert(key.into(), value);
        self
    }

    /// Turns on the rate-limit oracle
    pub fn with_rate_limits(mut self) -> Self {
        self.rate_limits.get_or_insert_with(RateLimitStore::new);
        self
    }

    pub fn push_reply(&self, reply: serde_json::Value) {
        self.replies.lock().push_back(Reply {
            outcome: Ok(reply),
            limit: None,
        });
    }

    /// Queues a reply that also records `limit` for the calling binding
    pub fn push_reply_with_limit(&self, reply: serde_json::Value, limit: RateLimit) {
        self.replies.lock().push_back(Reply {
            outcome: Ok(reply),
            limit: Some(limit),
        });
    }

    pub fn push_error(&self, message: impl Into<String>) {
        self.replies.lock().push_back(Reply {
            outcome: Err(message.into()),
            limit: None,
        });
    }

    /// Records a window directly (no-op unless the oracle is on)
    pub fn set_rate_limit(&self, binding: &str, limit: RateLimit) {
        if let Some(store) = &self.rate_limits {
            store.add(binding, limit);
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn last_call(&self) -> Option<RecordedCall> {
        self.calls.lock().last().cloned()
    }

    /// Messages the paginator sent to the oracle's log sink
    pub fn logs(&self) -> Vec<String> {
        self.logs.lock().clone()
    }

    fn record(&self, ctx: &CallContext, binding: &str, attrs: &Attrs, request: &dyn Request) {
        let any = request.as_any();
        let (url, body) = if let Some(http) = any.downcast_ref::<HttpRequest>() {
            (Some(http.url.clone()), http.body.clone())
        } else if let Some(gql) = any.downcast_ref::<GraphQlRequest>() {
            (None, Some(serde_json::Value::Object(gql.variables.clone())))
        } else {
            (None, None)
        };

        self.calls.lock().push(RecordedCall {
            binding: binding.to_string(),
            ctx: *ctx,
            attrs: attrs.clone(),
            url,
            body,
        });
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn run(
        &self,
        ctx: &CallContext,
        binding: &str,
        attrs: &Attrs,
        request: &dyn Request,
        response: &mut dyn ResponseContainer,
    ) -> Result<()> {
        self.record(ctx, binding, attrs, request);

        let reply = self.replies.lock().pop_front();
        let reply = match (reply, &self.default_reply) {
            (Some(reply), _) => reply,
            (None, Some(default)) => Reply {
                outcome: Ok(default.clone()),
                limit: None,
            },
            (None, None) => return Err(anyhow!("mock transport has no reply for '{}'", binding)),
        };

        if let Some(limit) = reply.limit {
            self.set_rate_limit(binding, limit);
        }

        let body = reply.outcome.map_err(|message| anyhow!(message))?;
        response.populate(body)?;
        Ok(())
    }

    fn rate_limits(&self) -> Option<&dyn RateLimitOracle> {
        self.rate_limits.as_ref().map(|_| self as &dyn RateLimitOracle)
    }

    fn setting(&self, key: &str) -> Option<serde_json::Value> {
        self.settings.get(key).cloned()
    }
}

impl RateLimitOracle for MockTransport {
    fn latest_limit(&self, binding: &str) -> Option<RateLimit> {
        self.rate_limits.as_ref().and_then(|store| store.latest(binding))
    }

    fn log(&self, message: &str) {
        self.logs.lock().push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::Slot;
    use chrono::Utc;
    use serde_json::json;

    async fn run(mock: &MockTransport) -> Result<Vec<u32>> {
        let mut slot = Slot::<Vec<u32>>::new();
        mock.run(
            &CallContext::new(),
            "numbers",
            &Attrs::new(),
            &HttpRequest::get("/numbers"),
            &mut slot,
        )
        .await?;
        Ok(slot.get().cloned().unwrap_or_default())
    }

    #[tokio::test]
    async fn replies_in_order_then_default() {
        let mock = MockTransport::with_replies([json!([1]), json!([2])]).with_default(json!([]));
        assert_eq!(run(&mock).await.unwrap(), vec![1]);
        assert_eq!(run(&mock).await.unwrap(), vec![2]);
        assert_eq!(run(&mock).await.unwrap(), Vec::<u32>::new());
        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.last_call().unwrap().url.as_deref(), Some("/numbers"));
    }

    #[tokio::test]
    async fn errors_and_empty_queue() {
        let mock = MockTransport::new();
        mock.push_error("boom");
        assert_eq!(run(&mock).await.unwrap_err().to_string(), "boom");
        assert!(run(&mock).await.unwrap_err().to_string().contains("no reply"));
    }

    #[tokio::test]
    async fn undecodable_reply_is_an_error() {
        let mock = MockTransport::with_replies([json!({"not": "a list"})]);
        assert!(run(&mock).await.is_err());
    }

    #[tokio::test]
    async fn oracle_only_when_enabled() {
        let plain = MockTransport::new();
        assert!(plain.rate_limits().is_none());

        let mock = MockTransport::new().with_rate_limits();
        let limit = RateLimit::requests(Utc::now(), 5, 0);
        mock.push_reply_with_limit(json!([]), limit.clone());
        run(&mock).await.unwrap();

        let oracle = mock.rate_limits().unwrap();
        assert_eq!(oracle.latest_limit("numbers"), Some(limit));
        oracle.log("hello");
        assert_eq!(mock.logs(), vec!["hello".to_string()]);
    }
}
