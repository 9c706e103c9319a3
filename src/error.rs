//! Error types with error codes and fix suggestions
//!
//! Error code ranges:
//! - APIARY-010-019: Parameter schema errors (structural, cached per schema)
//! - APIARY-020-029: Argument validation / parsing errors
//! - APIARY-030-039: Pipeline errors (steps, transport, encoding)
//! - APIARY-040-049: Pagination errors
//! - APIARY-050-059: Rate-limit errors
//! - APIARY-060-069: Registry errors
//! - APIARY-070-079: Configuration errors

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiaryError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Whether a [`ParamError`] comes from the schema itself or from a call's arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamErrorKind {
    Schema,
    Validation,
}

/// Errors raised while checking a parameter schema or the arguments given to it.
///
/// Cloneable so a structural error can be cached once and handed out on
/// every later call against the same schema.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamError {
    // ═══════════════════════════════════════════
    // SCHEMA ERRORS (010-019)
    // ═══════════════════════════════════════════
    #[error("[APIARY-010] Param '{name}' (no. {index}) has the same name as param no. {first_index}")]
    DuplicateName {
        name: String,
        index: usize,
        first_index: usize,
    },

    #[error("[APIARY-011] Required param '{name}' (no. {index}) comes after a non-required param")]
    RequiredAfterOptional { name: String, index: usize },

    #[error("[APIARY-012] Variadic param '{name}' (no. {index}) must be the last param (currently {from_end} to last)")]
    VariadicNotLast {
        name: String,
        index: usize,
        from_end: String,
    },

    #[error("[APIARY-013] Variadic param '{name}' (no. {index}) must not be required")]
    VariadicRequired { name: String, index: usize },

    #[error("[APIARY-014] Variadic param '{name}' (no. {index}) must default to a list, not {found}")]
    VariadicDefaultNotList {
        name: String,
        index: usize,
        found: String,
    },

    #[error("[APIARY-015] Variadic param '{name}' (no. {index}) must default to an empty list, not one with {len} elements")]
    VariadicDefaultNotEmpty {
        name: String,
        index: usize,
        len: usize,
    },

    // ═══════════════════════════════════════════
    // VALIDATION ERRORS (020-029)
    // ═══════════════════════════════════════════
    #[error("[APIARY-020] Required param '{name}' (no. {index}) was not provided as an argument")]
    MissingRequired { name: String, index: usize },

    #[error("[APIARY-021] Param '{name}' expects {expected}, but arg no. {index} is {actual}")]
    TypeMismatch {
        name: String,
        index: usize,
        expected: String,
        actual: String,
    },

    #[error("[APIARY-022] Variadic param '{name}' expects elements of {expected}, but arg no. {index} is {actual}")]
    VariadicTypeMismatch {
        name: String,
        index: usize,
        expected: String,
        actual: String,
    },

    #[error("[APIARY-023] Could not parse arg no. {index} ({arg:?}) for param '{name}': {reason}")]
    Unparsable {
        name: String,
        index: usize,
        arg: String,
        reason: String,
    },
}

impl ParamError {
    pub fn kind(&self) -> ParamErrorKind {
        match self {
            ParamError::DuplicateName { .. }
            | ParamError::RequiredAfterOptional { .. }
            | ParamError::VariadicNotLast { .. }
            | ParamError::VariadicRequired { .. }
            | ParamError::VariadicDefaultNotList { .. }
            | ParamError::VariadicDefaultNotEmpty { .. } => ParamErrorKind::Schema,
            ParamError::MissingRequired { .. }
            | ParamError::TypeMismatch { .. }
            | ParamError::VariadicTypeMismatch { .. }
            | ParamError::Unparsable { .. } => ParamErrorKind::Validation,
        }
    }

    pub fn is_schema_error(&self) -> bool {
        self.kind() == ParamErrorKind::Schema
    }

    /// Name of the offending parameter
    pub fn param_name(&self) -> &str {
        match self {
            ParamError::DuplicateName { name, .. }
            | ParamError::RequiredAfterOptional { name, .. }
            | ParamError::VariadicNotLast { name, .. }
            | ParamError::VariadicRequired { name, .. }
            | ParamError::VariadicDefaultNotList { name, .. }
            | ParamError::VariadicDefaultNotEmpty { name, .. }
            | ParamError::MissingRequired { name, .. }
            | ParamError::TypeMismatch { name, .. }
            | ParamError::VariadicTypeMismatch { name, .. }
            | ParamError::Unparsable { name, .. } => name,
        }
    }
}

/// Pipeline step that failed during `Binding::execute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    Request,
    Wrap,
    Unwrap,
    Convert,
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStep::Request => write!(f, "request"),
            PipelineStep::Wrap => write!(f, "wrap"),
            PipelineStep::Unwrap => write!(f, "unwrap"),
            PipelineStep::Convert => write!(f, "convert"),
        }
    }
}

/// Broad grouping of [`ApiaryError`] variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Schema,
    Validation,
    Pipeline,
    Pagination,
    RateLimit,
    Registry,
    Config,
}

/// All error variants are part of the public API.
#[derive(Error, Debug)]
pub enum ApiaryError {
    #[error("Binding '{binding}': {source}")]
    Params {
        binding: String,
        #[source]
        source: ParamError,
    },

    // ═══════════════════════════════════════════
    // PIPELINE ERRORS (030-039)
    // ═══════════════════════════════════════════
    #[error("[APIARY-030] Binding '{binding}' failed in its {step} step: {source}")]
    Step {
        binding: String,
        step: PipelineStep,
        #[source]
        source: anyhow::Error,
    },

    #[error("[APIARY-031] Transport could not run binding '{binding}': {source}")]
    Transport {
        binding: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("[APIARY-032] Result of binding '{binding}' could not be encoded as JSON: {source}")]
    Encode {
        binding: String,
        #[source]
        source: serde_json::Error,
    },

    // ═══════════════════════════════════════════
    // PAGINATION ERRORS (040-049)
    // ═══════════════════════════════════════════
    #[error("[APIARY-040] Binding '{binding}' is not paginated")]
    NotPaginated { binding: String },

    #[error("[APIARY-041] Binding '{binding}' has no pagination params, need one of: {expected}")]
    NoPaginationParams { binding: String, expected: String },

    #[error("[APIARY-042] Cannot find the next 'after' value on page {page}: {type_name} has no after cursor")]
    CursorUnsupported { page: usize, type_name: String },

    #[error("[APIARY-043] Required param '{name}' (no. {index}) cannot be defaulted before pagination args are inserted on page {page} ({remaining} remaining)")]
    UnfilledPaginationSlot {
        page: usize,
        name: String,
        index: usize,
        remaining: String,
    },

    #[error("[APIARY-044] Error occurred on page no. {page}: {source}")]
    Page {
        page: usize,
        #[source]
        source: Box<ApiaryError>,
    },

    #[error("[APIARY-045] Error occurred on page no. {page}, after ignoring the first request due to no rate limit: {source}")]
    PageRetry {
        page: usize,
        #[source]
        source: Box<ApiaryError>,
    },

    #[error("[APIARY-046] Could not merge page no. {page}: {source}")]
    Merge {
        page: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("[APIARY-047] No further 'after' cursor after page {page}")]
    CursorExhausted { page: usize },

    // ═══════════════════════════════════════════
    // RATE LIMIT ERRORS (050-059)
    // ═══════════════════════════════════════════
    #[error("[APIARY-050] No rate limit reported for '{binding}' but paginator is on page {page}")]
    RateLimitUnavailable { binding: String, page: usize },

    // ═══════════════════════════════════════════
    // REGISTRY ERRORS (060-069)
    // ═══════════════════════════════════════════
    #[error("[APIARY-060] Could not find binding for action '{name}'")]
    UnknownBinding { name: String },

    #[error("[APIARY-061] Binding '{name}' is not a {expected}")]
    BindingTypeMismatch { name: String, expected: String },

    // ═══════════════════════════════════════════
    // CONFIG ERRORS (070-079)
    // ═══════════════════════════════════════════
    #[error("[APIARY-070] Invalid configuration: {reason}")]
    Config { reason: String },
}

impl ApiaryError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ApiaryError::Params { source, .. } => match source.kind() {
                ParamErrorKind::Schema => ErrorCategory::Schema,
                ParamErrorKind::Validation => ErrorCategory::Validation,
            },
            ApiaryError::Step { .. } | ApiaryError::Transport { .. } | ApiaryError::Encode { .. } => {
                ErrorCategory::Pipeline
            }
            ApiaryError::NotPaginated { .. }
            | ApiaryError::NoPaginationParams { .. }
            | ApiaryError::CursorUnsupported { .. }
            | ApiaryError::CursorExhausted { .. }
            | ApiaryError::UnfilledPaginationSlot { .. }
            | ApiaryError::Page { .. }
            | ApiaryError::PageRetry { .. }
            | ApiaryError::Merge { .. } => ErrorCategory::Pagination,
            ApiaryError::RateLimitUnavailable { .. } => ErrorCategory::RateLimit,
            ApiaryError::UnknownBinding { .. } | ApiaryError::BindingTypeMismatch { .. } => {
                ErrorCategory::Registry
            }
            ApiaryError::Config { .. } => ErrorCategory::Config,
        }
    }

    /// Strips page wrappers and returns the error that started it all.
    pub fn root_cause(&self) -> &ApiaryError {
        match self {
            ApiaryError::Page { source, .. } | ApiaryError::PageRetry { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }

    /// The wrapped parameter error, if the root cause is one.
    pub fn param_error(&self) -> Option<&ParamError> {
        match self.root_cause() {
            ApiaryError::Params { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Error code, e.g. `APIARY-044`
    pub fn code(&self) -> &'static str {
        match self {
            ApiaryError::Params { source, .. } => source.code(),
            ApiaryError::Step { .. } => "APIARY-030",
            ApiaryError::Transport { .. } => "APIARY-031",
            ApiaryError::Encode { .. } => "APIARY-032",
            ApiaryError::NotPaginated { .. } => "APIARY-040",
            ApiaryError::NoPaginationParams { .. } => "APIARY-041",
            ApiaryError::CursorUnsupported { .. } => "APIARY-042",
            ApiaryError::UnfilledPaginationSlot { .. } => "APIARY-043",
            ApiaryError::Page { .. } => "APIARY-044",
            ApiaryError::PageRetry { .. } => "APIARY-045",
            ApiaryError::Merge { .. } => "APIARY-046",
            ApiaryError::CursorExhausted { .. } => "APIARY-047",
            ApiaryError::RateLimitUnavailable { .. } => "APIARY-050",
            ApiaryError::UnknownBinding { .. } => "APIARY-060",
            ApiaryError::BindingTypeMismatch { .. } => "APIARY-061",
            ApiaryError::Config { .. } => "APIARY-070",
        }
    }
}

impl ParamError {
    pub fn code(&self) -> &'static str {
        match self {
            ParamError::DuplicateName { .. } => "APIARY-010",
            ParamError::RequiredAfterOptional { .. } => "APIARY-011",
            ParamError::VariadicNotLast { .. } => "APIARY-012",
            ParamError::VariadicRequired { .. } => "APIARY-013",
            ParamError::VariadicDefaultNotList { .. } => "APIARY-014",
            ParamError::VariadicDefaultNotEmpty { .. } => "APIARY-015",
            ParamError::MissingRequired { .. } => "APIARY-020",
            ParamError::TypeMismatch { .. } => "APIARY-021",
            ParamError::VariadicTypeMismatch { .. } => "APIARY-022",
            ParamError::Unparsable { .. } => "APIARY-023",
        }
    }
}

impl FixSuggestion for ParamError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            ParamError::DuplicateName { .. } => Some("Give every param in the schema a unique name"),
            ParamError::RequiredAfterOptional { .. } => {
                Some("Move required params before all optional and variadic params")
            }
            ParamError::VariadicNotLast { .. } => Some("Declare the variadic param last"),
            ParamError::VariadicRequired { .. } => Some("Variadic params accept zero args; drop the required flag"),
            ParamError::VariadicDefaultNotList { .. } | ParamError::VariadicDefaultNotEmpty { .. } => {
                Some("Use an empty list of the element type as the variadic example, e.g. Vec::<i64>::new()")
            }
            ParamError::MissingRequired { .. } => Some("Pass a value for every required param"),
            ParamError::TypeMismatch { .. } | ParamError::VariadicTypeMismatch { .. } => {
                Some("Check the argument's type against the binding's params")
            }
            ParamError::Unparsable { .. } => Some("Arguments are parsed as JSON literals of the param's type"),
        }
    }
}

impl FixSuggestion for ApiaryError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            ApiaryError::Params { source, .. } => source.fix_suggestion(),
            ApiaryError::Step { .. } => Some("Check the binding's step callbacks for this input"),
            ApiaryError::Transport { .. } => Some("Check the transport's connectivity and the request it was given"),
            ApiaryError::Encode { .. } => Some("Make sure the binding's return type serializes to JSON"),
            ApiaryError::NotPaginated { .. } => Some("Mark the binding with with_paginated(true)"),
            ApiaryError::NoPaginationParams { .. } => Some("Declare a 'page' or 'after' param on the binding"),
            ApiaryError::CursorUnsupported { .. } => {
                Some("Implement AfterCursor for the result and return it from PageResult::as_after_cursor")
            }
            ApiaryError::CursorExhausted { .. } => Some("Stop once continue_() returns false"),
            ApiaryError::UnfilledPaginationSlot { .. } => {
                Some("Pass every required param that comes before the pagination param")
            }
            ApiaryError::Page { source, .. } | ApiaryError::PageRetry { source, .. } => source.fix_suggestion(),
            ApiaryError::Merge { .. } => Some("Check the result type's merge_from implementation"),
            ApiaryError::RateLimitUnavailable { .. } => {
                Some("The transport must record a rate limit for every binding it runs")
            }
            ApiaryError::UnknownBinding { .. } => Some("Register the binding with Api::register first"),
            ApiaryError::BindingTypeMismatch { .. } => {
                Some("Use the response/return types the binding was registered with")
            }
            ApiaryError::Config { .. } => Some("Check the YAML keys and environment overrides"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_error_kinds() {
        let schema = ParamError::DuplicateName {
            name: "a".into(),
            index: 1,
            first_index: 0,
        };
        let validation = ParamError::MissingRequired {
            name: "a".into(),
            index: 0,
        };
        assert!(schema.is_schema_error());
        assert!(!validation.is_schema_error());
        assert_eq!(validation.param_name(), "a");
    }

    #[test]
    fn display_carries_code_and_context() {
        let err = ParamError::TypeMismatch {
            name: "limit".into(),
            index: 2,
            expected: "int".into(),
            actual: "string".into(),
        };
        assert_eq!(
            err.to_string(),
            "[APIARY-021] Param 'limit' expects int, but arg no. 2 is string"
        );
    }

    #[test]
    fn root_cause_strips_page_wrappers() {
        let inner = ApiaryError::RateLimitUnavailable {
            binding: "users".into(),
            page: 2,
        };
        let wrapped = ApiaryError::Page {
            page: 2,
            source: Box::new(ApiaryError::PageRetry {
                page: 2,
                source: Box::new(inner),
            }),
        };
        assert_eq!(wrapped.category(), ErrorCategory::Pagination);
        assert_eq!(wrapped.root_cause().category(), ErrorCategory::RateLimit);
        assert_eq!(wrapped.root_cause().code(), "APIARY-050");
    }

    #[test]
    fn params_category_follows_param_kind() {
        let err = ApiaryError::Params {
            binding: "users".into(),
            source: ParamError::VariadicRequired {
                name: "ids".into(),
                index: 0,
            },
        };
        assert_eq!(err.category(), ErrorCategory::Schema);
        assert_eq!(err.code(), "APIARY-013");
        assert!(err.fix_suggestion().is_some());
        assert!(err.param_error().is_some());
    }

    #[test]
    fn every_param_error_has_a_suggestion() {
        let errors = vec![
            ParamError::RequiredAfterOptional {
                name: String::new(),
                index: 0,
            },
            ParamError::VariadicNotLast {
                name: String::new(),
                index: 0,
                from_end: "2nd".into(),
            },
            ParamError::Unparsable {
                name: String::new(),
                index: 0,
                arg: String::new(),
                reason: String::new(),
            },
        ];
        for err in &errors {
            assert!(err.fix_suggestion().is_some(), "missing suggestion for {:?}", err);
            assert!(err.code().starts_with("APIARY-"));
        }
    }
}
