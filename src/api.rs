//! Action registry
//!
//! An [`Api`] owns a transport and a set of named bindings. Bindings of any
//! response and return type can sit side by side: the registry talks to them
//! through [`ErasedBinding`] and hands back typed copies on request.

use std::any::{type_name, Any};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::binding::Binding;
use crate::error::{ApiaryError, Result};
use crate::paginate::{PageResult, Paginator};
use crate::param::Param;
use crate::transport::Transport;
use crate::value::Value;

/// Type-erased view of a [`Binding`]
#[async_trait]
pub trait ErasedBinding: Send + Sync {
    fn name(&self) -> &str;

    fn params(&self) -> &[Param];

    fn paginated(&self) -> bool;

    fn args_from_strings(&self, strings: &[String]) -> Result<Vec<Value>>;

    /// Executes once and serializes the return value
    async fn execute_json(&self, transport: &dyn Transport, args: Vec<Value>) -> Result<serde_json::Value>;

    /// Copy returning raw JSON, see [`Binding::to_json`]
    fn to_json(&self) -> Binding<serde_json::Value, serde_json::Value>;

    fn as_any(&self) -> &dyn Any;
}

#[async_trait]
impl<Res, Ret> ErasedBinding for Binding<Res, Ret>
where
    Res: DeserializeOwned + Send + 'static,
    Ret: Serialize + Send + 'static,
{
    fn name(&self) -> &str {
        Binding::name(self)
    }

    fn params(&self) -> &[Param] {
        Binding::params(self)
    }

    fn paginated(&self) -> bool {
        Binding::paginated(self)
    }

    fn args_from_strings(&self, strings: &[String]) -> Result<Vec<Value>> {
        Binding::args_from_strings(self, strings)
    }

    async fn execute_json(&self, transport: &dyn Transport, args: Vec<Value>) -> Result<serde_json::Value> {
        let ret = self.execute(transport, args).await?;
        serde_json::to_value(ret).map_err(|source| ApiaryError::Encode {
            binding: Binding::name(self).to_string(),
            source,
        })
    }

    fn to_json(&self) -> Binding<serde_json::Value, serde_json::Value> {
        Binding::to_json(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Named bindings sharing one transport
pub struct Api {
    transport: Arc<dyn Transport>,
    bindings: BTreeMap<String, Arc<dyn ErasedBinding>>,
}

impl Api {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            bindings: BTreeMap::new(),
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Registers `binding` under `name`, renaming it; replaces any previous
    /// binding of that name
    pub fn register<Res, Ret>(&mut self, name: impl Into<String>, binding: &Binding<Res, Ret>) -> &mut Self
    where
        Res: DeserializeOwned + Send + 'static,
        Ret: Serialize + Send + 'static,
    {
        let name = name.into();
        let binding = binding.with_name(name.clone());
        debug!(binding = %name, params = binding.params().len(), paginated = binding.paginated(), "registered binding");
        self.bindings.insert(name, Arc::new(binding));
        self
    }

    /// Registered names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<&dyn ErasedBinding> {
        self.bindings
            .get(name)
            .map(|b| &**b)
            .ok_or_else(|| ApiaryError::UnknownBinding { name: name.to_string() })
    }

    /// Typed copy of a registered binding
    pub fn binding<Res, Ret>(&self, name: &str) -> Result<Binding<Res, Ret>>
    where
        Res: 'static,
        Ret: 'static,
    {
        self.get(name)?
            .as_any()
            .downcast_ref::<Binding<Res, Ret>>()
            .cloned()
            .ok_or_else(|| ApiaryError::BindingTypeMismatch {
                name: name.to_string(),
                expected: type_name::<Binding<Res, Ret>>().to_string(),
            })
    }

    pub async fn execute(&self, name: &str, args: Vec<Value>) -> Result<serde_json::Value> {
        self.get(name)?.execute_json(self.transport.as_ref(), args).await
    }

    pub fn args_from_strings<S: AsRef<str>>(&self, name: &str, strings: &[S]) -> Result<Vec<Value>> {
        let strings: Vec<String> = strings.iter().map(|s| s.as_ref().to_string()).collect();
        self.get(name)?.args_from_strings(&strings)
    }

    /// Paginator over a registered binding, sharing the registry's transport
    pub fn paginator<Res, Ret>(&self, name: &str, wait: Duration, args: Vec<Value>) -> Result<Paginator<Res, Ret>>
    where
        Res: DeserializeOwned + Send + 'static,
        Ret: PageResult,
    {
        let binding = self.binding::<Res, Ret>(name)?;
        Paginator::new(Arc::clone(&self.transport), wait, &binding, args)
    }

    /// Paginator over a registered binding of any type, yielding its pages as
    /// JSON. Array pages are joined end to end; bindings paging by `after`
    /// cursor need the typed [`paginator`](Self::paginator).
    pub fn paginator_json(
        &self,
        name: &str,
        wait: Duration,
        args: Vec<Value>,
    ) -> Result<Paginator<serde_json::Value, serde_json::Value>> {
        let binding = self.get(name)?.to_json();
        Paginator::new(Arc::clone(&self.transport), wait, &binding, args)
    }
}

impl fmt::Debug for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Api")
            .field("bindings", &self.bindings.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
