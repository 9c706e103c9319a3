//! # Bindings
//!
//! A [`Binding`] is one executable API action. Every execution runs the same
//! pipeline:
//!
//! 1. check the param schema (once) and validate the arguments
//! 2. resolve pending attributes against the transport
//! 3. **request** step builds the request
//! 4. **wrap** step builds an empty response container
//! 5. the transport runs the request and fills the container
//! 6. **unwrap** step takes the response out of the container
//! 7. **convert** step turns the response into the return value
//!
//! Every step has a default, so a binding whose response and return types
//! coincide only needs a request step. Setters never mutate: each returns a
//! new snapshot sharing everything it did not replace.
//!
//! ```rust,ignore
//! let list_users = Binding::<Vec<User>, Vec<User>>::new()
//!     .with_name("list_users")
//!     .with_params(|| params!["page", 1, true])
//!     .with_paginated(true)
//!     .with_request(|cx| Ok(Box::new(HttpRequest::get(format!("/users?page={}", cx.args[0])))));
//! ```

mod attrs;
mod container;

pub use attrs::{Attr, AttrStore, Attrs};
pub use container::{ResponseContainer, Slot};

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use once_cell::sync::OnceCell;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{ApiaryError, PipelineStep, Result};
use crate::param::{parse_args, Param, Schema};
use crate::transport::{CallContext, HttpRequest, Request, Transport};
use crate::value::Value;

// ============================================================================
// STEPS
// ============================================================================

/// What every pipeline step can see
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub name: &'a str,
    pub attrs: &'a Attrs,
    /// Normalised arguments
    pub args: &'a [Value],
}

impl<'a> StepContext<'a> {
    pub fn arg(&self, index: usize) -> Option<&'a Value> {
        self.args.get(index)
    }

    pub fn attr(&self, key: &str) -> Option<&'a serde_json::Value> {
        self.attrs.get(key)
    }
}

pub type RequestStep = Arc<dyn Fn(&StepContext<'_>) -> anyhow::Result<Box<dyn Request>> + Send + Sync>;
pub type WrapStep = Arc<dyn Fn(&StepContext<'_>) -> anyhow::Result<Box<dyn ResponseContainer>> + Send + Sync>;
pub type UnwrapStep<Res> =
    Arc<dyn Fn(&StepContext<'_>, Box<dyn ResponseContainer>) -> anyhow::Result<Res> + Send + Sync>;
pub type ConvertStep<Res, Ret> = Arc<dyn Fn(&StepContext<'_>, Res) -> anyhow::Result<Ret> + Send + Sync>;
pub type ParamsStep = Arc<dyn Fn() -> Vec<Param> + Send + Sync>;

// ============================================================================
// BINDING
// ============================================================================

/// An executable API action decoding into `Res` and returning `Ret`
pub struct Binding<Res, Ret> {
    name: Option<Arc<str>>,
    paginated: bool,
    request: Option<RequestStep>,
    wrap: Option<WrapStep>,
    unwrap: Option<UnwrapStep<Res>>,
    convert: Option<ConvertStep<Res, Ret>>,
    params: Option<ParamsStep>,
    schema: Arc<OnceCell<Schema>>,
    attrs: Arc<AttrStore>,
}

impl<Res, Ret> Clone for Binding<Res, Ret> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            paginated: self.paginated,
            request: self.request.clone(),
            wrap: self.wrap.clone(),
            unwrap: self.unwrap.clone(),
            convert: self.convert.clone(),
            params: self.params.clone(),
            schema: Arc::clone(&self.schema),
            attrs: Arc::clone(&self.attrs),
        }
    }
}

impl<Res, Ret> Default for Binding<Res, Ret> {
    fn default() -> Self {
        Self {
            name: None,
            paginated: false,
            request: None,
            wrap: None,
            unwrap: None,
            convert: None,
            params: None,
            schema: Arc::new(OnceCell::new()),
            attrs: Arc::new(AttrStore::new()),
        }
    }
}

impl<Res, Ret> Binding<Res, Ret>
where
    Res: DeserializeOwned + Send + 'static,
    Ret: Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    // ═══════════════════════════════════════════
    // SETTERS (copy-on-write)
    // ═══════════════════════════════════════════

    pub fn with_name(&self, name: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.name = Some(Arc::from(name.into()));
        next
    }

    pub fn with_paginated(&self, paginated: bool) -> Self {
        let mut next = self.clone();
        next.paginated = paginated;
        next
    }

    pub fn with_request<F>(&self, step: F) -> Self
    where
        F: Fn(&StepContext<'_>) -> anyhow::Result<Box<dyn Request>> + Send + Sync + 'static,
    {
        let mut next = self.clone();
        next.request = Some(Arc::new(step));
        next
    }

    pub fn with_wrap<F>(&self, step: F) -> Self
    where
        F: Fn(&StepContext<'_>) -> anyhow::Result<Box<dyn ResponseContainer>> + Send + Sync + 'static,
    {
        let mut next = self.clone();
        next.wrap = Some(Arc::new(step));
        next
    }

    pub fn with_unwrap<F>(&self, step: F) -> Self
    where
        F: Fn(&StepContext<'_>, Box<dyn ResponseContainer>) -> anyhow::Result<Res> + Send + Sync + 'static,
    {
        let mut next = self.clone();
        next.unwrap = Some(Arc::new(step));
        next
    }

    pub fn with_convert<F>(&self, step: F) -> Self
    where
        F: Fn(&StepContext<'_>, Res) -> anyhow::Result<Ret> + Send + Sync + 'static,
    {
        let mut next = self.clone();
        next.convert = Some(Arc::new(step));
        next
    }

    /// Replaces the param supplier. The new schema is checked on first use.
    pub fn with_params<F>(&self, step: F) -> Self
    where
        F: Fn() -> Vec<Param> + Send + Sync + 'static,
    {
        let mut next = self.clone();
        next.params = Some(Arc::new(step));
        next.schema = Arc::new(OnceCell::new());
        next
    }

    /// Adds attributes to a fork of the attribute store and evaluates what it
    /// can without a transport.
    pub fn with_attrs(&self, attrs: impl IntoIterator<Item = Attr>) -> Self {
        let mut next = self.clone();
        let store = self.attrs.fork();
        store.add(attrs);
        store.reconcile(None);
        next.attrs = Arc::new(store);
        next
    }

    // ═══════════════════════════════════════════
    // GETTERS
    // ═══════════════════════════════════════════

    /// Name given with [`with_name`](Self::with_name), else the Rust type name
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| type_name::<Self>())
    }

    pub fn paginated(&self) -> bool {
        self.paginated
    }

    pub fn request_step(&self) -> Option<RequestStep> {
        self.request.clone()
    }

    pub fn wrap_step(&self) -> Option<WrapStep> {
        self.wrap.clone()
    }

    pub fn unwrap_step(&self) -> Option<UnwrapStep<Res>> {
        self.unwrap.clone()
    }

    pub fn convert_step(&self) -> Option<ConvertStep<Res, Ret>> {
        self.convert.clone()
    }

    pub fn params_step(&self) -> Option<ParamsStep> {
        self.params.clone()
    }

    /// Schema of this snapshot, built and checked on first use
    pub fn schema(&self) -> &Schema {
        self.schema.get_or_init(|| Schema::new(self.params.as_ref().map(|step| step()).unwrap_or_default()))
    }

    pub fn params(&self) -> &[Param] {
        self.schema().params()
    }

    /// Cached structural error of the schema, if any
    pub fn check_params(&self) -> Result<()> {
        self.schema().check().map_err(|source| self.params_error(source))
    }

    /// Resolved attributes
    pub fn attrs(&self) -> Attrs {
        self.attrs.snapshot()
    }

    pub fn pending_attrs(&self) -> Vec<String> {
        self.attrs.pending_keys()
    }

    /// Parses string arguments against the declared param types
    pub fn args_from_strings<S: AsRef<str>>(&self, strings: &[S]) -> Result<Vec<Value>> {
        self.check_params()?;
        parse_args(self.params(), strings).map_err(|source| self.params_error(source))
    }

    fn params_error(&self, source: crate::error::ParamError) -> ApiaryError {
        ApiaryError::Params {
            binding: self.name().to_string(),
            source,
        }
    }

    fn step_error(&self, step: PipelineStep) -> impl FnOnce(anyhow::Error) -> ApiaryError + '_ {
        move |source| ApiaryError::Step {
            binding: self.name().to_string(),
            step,
            source,
        }
    }

    // ═══════════════════════════════════════════
    // EXECUTION
    // ═══════════════════════════════════════════

    pub async fn execute(&self, transport: &dyn Transport, args: Vec<Value>) -> Result<Ret> {
        self.execute_in(&CallContext::new(), transport, args).await
    }

    /// Runs the pipeline with an explicit call context
    pub async fn execute_in(&self, ctx: &CallContext, transport: &dyn Transport, args: Vec<Value>) -> Result<Ret> {
        let name = self.name();
        let args = self.schema().validate(args).map_err(|source| self.params_error(source))?;

        self.attrs.reconcile(Some(transport));
        let attrs = self.attrs.snapshot();
        debug!(binding = name, args = args.len(), page = ?ctx.page, attempt = ctx.attempt, "executing binding");

        let cx = StepContext {
            name,
            attrs: &attrs,
            args: &args,
        };

        let request = match &self.request {
            Some(step) => step(&cx),
            None => Ok(Box::new(HttpRequest::default()) as Box<dyn Request>),
        }
        .map_err(self.step_error(PipelineStep::Request))?;

        let mut container = match &self.wrap {
            Some(step) => step(&cx),
            None => Ok(Box::new(Slot::<Res>::new()) as Box<dyn ResponseContainer>),
        }
        .map_err(self.step_error(PipelineStep::Wrap))?;

        transport
            .run(ctx, name, &attrs, request.as_ref(), container.as_mut())
            .await
            .map_err(|source| ApiaryError::Transport {
                binding: name.to_string(),
                source,
            })?;

        let response = match &self.unwrap {
            Some(step) => step(&cx, container),
            None => Slot::<Res>::take(container),
        }
        .map_err(self.step_error(PipelineStep::Unwrap))?;

        match &self.convert {
            Some(step) => step(&cx, response),
            None => identity(response),
        }
        .map_err(self.step_error(PipelineStep::Convert))
    }
}

impl<Res, Ret> Binding<Res, Ret>
where
    Res: DeserializeOwned + Send + 'static,
    Ret: Serialize + Send + 'static,
{
    /// The same action returning raw JSON.
    ///
    /// The response still goes through this binding's unwrap and convert
    /// steps and is serialized afterwards. The copy shares the schema and
    /// the attribute store.
    pub fn to_json(&self) -> Binding<serde_json::Value, serde_json::Value> {
        let wrap = self.wrap.clone();
        let unwrap = self.unwrap.clone();
        let convert = self.convert.clone();

        Binding {
            name: Some(Arc::from(self.name())),
            paginated: self.paginated,
            request: self.request.clone(),
            wrap: Some(Arc::new(move |cx: &StepContext<'_>| -> anyhow::Result<Box<dyn ResponseContainer>> {
                match &wrap {
                    Some(step) => step(cx),
                    None => Ok(Box::new(Slot::<Res>::new())),
                }
            })),
            unwrap: Some(Arc::new(
                move |cx: &StepContext<'_>, container: Box<dyn ResponseContainer>| -> anyhow::Result<serde_json::Value> {
                    let response = match &unwrap {
                        Some(step) => step(cx, container)?,
                        None => Slot::<Res>::take(container)?,
                    };
                    let ret: Ret = match &convert {
                        Some(step) => step(cx, response)?,
                        None => identity(response)?,
                    };
                    Ok(serde_json::to_value(ret)?)
                },
            )),
            convert: None,
            params: self.params.clone(),
            schema: Arc::clone(&self.schema),
            attrs: Arc::clone(&self.attrs),
        }
    }
}

/// Default convert step; only succeeds when `Res` and `Ret` are the same type
fn identity<Res: 'static, Ret: 'static>(response: Res) -> anyhow::Result<Ret> {
    let boxed: Box<dyn Any> = Box::new(response);
    boxed.downcast::<Ret>().map(|ret| *ret).map_err(|_| {
        anyhow!(
            "no convert step and {} is not {}",
            type_name::<Res>(),
            type_name::<Ret>()
        )
    })
}

impl<Res, Ret> fmt::Debug for Binding<Res, Ret> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("name", &self.name)
            .field("paginated", &self.paginated)
            .field("params", &self.schema.get().map(|s| s.params().len()))
            .field("attrs", &self.attrs)
            .finish_non_exhaustive()
    }
}
