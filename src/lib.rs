//! Apiary - typed API action bindings
//!
//! - [`param`] - parameter schemas, the `params!` notation, argument checks
//! - [`binding`] - the request / wrap / unwrap / convert pipeline
//! - [`paginate`] - page-by-page driving with rate-limit throttling
//! - [`api`] - a registry of named bindings over one transport
//! - [`transport`] - the seam to the network, plus a scripted mock

pub mod api;
pub mod binding;
pub mod config;
pub mod error;
pub mod paginate;
pub mod param;
pub mod transport;
pub mod value;

pub use api::{Api, ErasedBinding};
pub use binding::{Attr, Binding, StepContext};
pub use config::PaginatorConfig;
pub use error::{ApiaryError, ErrorCategory, FixSuggestion, ParamError, Result};
pub use paginate::{AfterCursor, Interrupted, MergeKind, PageConvention, PageResult, Paginator};
pub use param::{Example, Param, ParamSignature, Schema};
pub use transport::{
    CallContext, GraphQlRequest, HttpRequest, MockTransport, RateLimit, RateLimitKind, RateLimitOracle, Request,
    Transport,
};
pub use value::{Object, TypeDesc, Typed, Value};
