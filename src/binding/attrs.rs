//! Lazily evaluated binding attributes
//!
//! An attribute is a keyed thunk. Thunks that need the transport (an API
//! token, a base URL) fail while none is available and stay pending; every
//! `execute` gives them another chance. Failures are never reported.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use tracing::trace;

use crate::transport::Transport;

/// Resolved attributes, as seen by pipeline steps and transports
pub type Attrs = HashMap<String, serde_json::Value>;

type Thunk = Arc<dyn Fn(Option<&dyn Transport>) -> Result<serde_json::Value> + Send + Sync>;

/// A keyed attribute producer
#[derive(Clone)]
pub struct Attr {
    key: String,
    thunk: Thunk,
}

impl Attr {
    pub fn new<F>(key: impl Into<String>, thunk: F) -> Self
    where
        F: Fn(Option<&dyn Transport>) -> Result<serde_json::Value> + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            thunk: Arc::new(thunk),
        }
    }

    /// Attribute with a fixed value
    pub fn value(key: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(key, move |_| Ok(value.clone()))
    }

    /// Attribute copied from a transport setting
    pub fn from_transport(key: impl Into<String>, setting: impl Into<String>) -> Self {
        let setting = setting.into();
        Self::new(key, move |transport| {
            transport
                .ok_or_else(|| anyhow!("no transport yet"))?
                .setting(&setting)
                .ok_or_else(|| anyhow!("transport has no setting '{}'", setting))
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Debug for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attr").field("key", &self.key).finish_non_exhaustive()
    }
}

#[derive(Clone)]
enum AttrEntry {
    Pending(Thunk),
    Resolved(serde_json::Value),
}

/// Attribute map shared by one binding snapshot
#[derive(Default)]
pub struct AttrStore {
    entries: Mutex<HashMap<String, AttrEntry>>,
}

impl AttrStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Independent copy of the current entries
    pub fn fork(&self) -> Self {
        Self {
            entries: Mutex::new(self.entries.lock().clone()),
        }
    }

    /// Adds attributes as pending, replacing any entry with the same key
    pub fn add(&self, attrs: impl IntoIterator<Item = Attr>) {
        let mut entries = self.entries.lock();
        for attr in attrs {
            entries.insert(attr.key, AttrEntry::Pending(attr.thunk));
        }
    }

    /// Evaluates every pending thunk; returns how many resolved.
    ///
    /// Thunks run without the lock held. A result is only stored if its key
    /// still holds the same pending thunk.
    pub fn reconcile(&self, transport: Option<&dyn Transport>) -> usize {
        let pending: Vec<(String, Thunk)> = self
            .entries
            .lock()
            .iter()
            .filter_map(|(key, entry)| match entry {
                AttrEntry::Pending(thunk) => Some((key.clone(), Arc::clone(thunk))),
                AttrEntry::Resolved(_) => None,
            })
            .collect();

        if pending.is_empty() {
            return 0;
        }

        let evaluated: Vec<(String, Thunk, serde_json::Value)> = pending
            .into_iter()
            .filter_map(|(key, thunk)| match thunk(transport) {
                Ok(value) => Some((key, thunk, value)),
                Err(e) => {
                    trace!(attr = %key, error = %e, "attribute deferred");
                    None
                }
            })
            .collect();

        let mut entries = self.entries.lock();
        let mut resolved = 0;
        for (key, thunk, value) in evaluated {
            let still_pending = matches!(
                entries.get(&key),
                Some(AttrEntry::Pending(current)) if Arc::ptr_eq(current, &thunk)
            );
            if still_pending {
                entries.insert(key, AttrEntry::Resolved(value));
                resolved += 1;
            }
        }
        resolved
    }

    /// Resolved attributes only
    pub fn snapshot(&self) -> Attrs {
        self.entries
            .lock()
            .iter()
            .filter_map(|(key, entry)| match entry {
                AttrEntry::Resolved(value) => Some((key.clone(), value.clone())),
                AttrEntry::Pending(_) => None,
            })
            .collect()
    }

    /// Keys still waiting for a successful evaluation
    pub fn pending_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .iter()
            .filter(|(_, entry)| matches!(entry, AttrEntry::Pending(_)))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }
}

impl fmt::Debug for AttrStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttrStore")
            .field("resolved", &self.snapshot().len())
            .field("pending", &self.pending_keys())
            .finish()
    }
}
