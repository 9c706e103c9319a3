//! # Parameter Schemas
//!
//! A binding declares the arguments it accepts as an ordered list of [`Param`]s:
//!
//! - [`Param::required`] - must be passed by every call
//! - [`Param::optional`] - falls back to its default when omitted
//! - [`Param::variadic`] - trailing param taking zero or more values
//!
//! Each constructor takes an [`Example`] from which the declared type and the
//! default are derived. Schemas can also be declared in bulk with the
//! [`params!`](crate::params) notation:
//!
//! ```rust
//! use apiary::params;
//!
//! let schema = params!["owner", "", true, "per_page", 30, "tags", Vec::<String>::new(), false, true];
//! assert_eq!(schema.len(), 3);
//! assert_eq!(schema[0].to_string(), "owner: string");
//! assert_eq!(schema[1].to_string(), "per_page: int? = 30");
//! assert_eq!(schema[2].to_string(), "tags: []string?... = []");
//! ```

mod notation;
mod parse;
mod validate;

pub use notation::{params, Token};
pub use parse::parse_args;
pub use validate::{check_schema, validate_args, Schema};

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ParamError;
use crate::value::{TypeDesc, Typed, Value};

// ============================================================================
// EXAMPLES
// ============================================================================

/// Source of a param's declared type and default value
#[derive(Debug, Clone, PartialEq)]
pub enum Example {
    /// Type is taken from the value, which is also the default
    Value(Value),
    /// Bare type with no default
    Type(TypeDesc),
    /// Capability-typed param, optionally with a default object
    Interface {
        capability: String,
        default: Option<Value>,
    },
}

impl Example {
    pub fn interface(capability: impl Into<String>) -> Self {
        Example::Interface {
            capability: capability.into(),
            default: None,
        }
    }

    pub fn interface_with(capability: impl Into<String>, default: impl Into<Value>) -> Self {
        Example::Interface {
            capability: capability.into(),
            default: Some(default.into()),
        }
    }

    fn resolve(self) -> (TypeDesc, Value) {
        match self {
            Example::Value(v) => (v.type_desc().unwrap_or(TypeDesc::Any), v),
            Example::Type(t) => (t, Value::Null),
            Example::Interface { capability, default } => (
                TypeDesc::Capability(capability),
                default.unwrap_or(Value::Null),
            ),
        }
    }
}

macro_rules! example_from_value {
    ($($t:ty),* $(,)?) => {
        $(impl From<$t> for Example {
            fn from(v: $t) -> Self {
                Example::Value(Value::from(v))
            }
        })*
    };
}

example_from_value!(bool, i32, i64, u32, u64, usize, f64, &str, String, Value);

impl<T: Into<Value> + Typed> From<Vec<T>> for Example {
    fn from(items: Vec<T>) -> Self {
        Example::Value(Value::from(items))
    }
}

impl From<TypeDesc> for Example {
    fn from(t: TypeDesc) -> Self {
        Example::Type(t)
    }
}

// ============================================================================
// PARAMS
// ============================================================================

/// One argument slot of a binding
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    name: String,
    required: bool,
    variadic: bool,
    declared_type: TypeDesc,
    default_value: Value,
}

impl Param {
    fn build(name: impl Into<String>, example: impl Into<Example>, required: bool, variadic: bool) -> Self {
        let (declared_type, default_value) = example.into().resolve();
        Self {
            name: name.into(),
            required,
            variadic,
            declared_type,
            default_value,
        }
    }

    /// Non-required param; the example doubles as its default
    pub fn optional(name: impl Into<String>, example: impl Into<Example>) -> Self {
        Self::build(name, example, false, false)
    }

    pub fn required(name: impl Into<String>, example: impl Into<Example>) -> Self {
        Self::build(name, example, true, false)
    }

    /// Trailing param; the example must be an empty list of the element type
    pub fn variadic(name: impl Into<String>, example: impl Into<Example>) -> Self {
        Self::build(name, example, false, true)
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_variadic(mut self, variadic: bool) -> Self {
        self.variadic = variadic;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    pub fn declared_type(&self) -> &TypeDesc {
        &self.declared_type
    }

    /// Type each actual argument is checked against.
    ///
    /// For variadic params this is the element type of the declared list.
    pub fn arg_type(&self) -> &TypeDesc {
        if self.variadic {
            self.declared_type.elem().unwrap_or(&self.declared_type)
        } else {
            &self.declared_type
        }
    }

    pub fn is_interface(&self) -> bool {
        self.declared_type.is_capability()
    }

    pub fn default_value(&self) -> &Value {
        &self.default_value
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.name)?;
        if self.is_interface() {
            write!(f, "[I]")?;
        }
        write!(f, "{}", self.declared_type)?;
        if !self.required {
            write!(f, "?")?;
        }
        if self.variadic {
            write!(f, "...")?;
        }
        if !self.required {
            write!(f, " = {}", self.default_value)?;
        }
        Ok(())
    }
}

// ============================================================================
// SIGNATURES
// ============================================================================

static SIGNATURE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<name>[^:\s]+):\s*(?P<iface>\[I\])?(?P<ty>[\w:.\[\]<>, ]+?)(?P<opt>\?)?(?P<var>\.\.\.)?(?:\s*=\s*(?P<def>.*))?$",
    )
    .expect("signature regex is valid")
});

/// A param re-parsed from its rendered form.
///
/// ```rust
/// use apiary::param::{Param, ParamSignature};
///
/// let sig: ParamSignature = Param::optional("page", 1).to_string().parse().unwrap();
/// assert_eq!(sig.name, "page");
/// assert!(!sig.required);
/// assert_eq!(sig.default.as_deref(), Some("1"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSignature {
    pub name: String,
    pub interface: bool,
    pub type_name: String,
    pub required: bool,
    pub variadic: bool,
    /// Raw default literal, as rendered
    pub default: Option<String>,
}

impl ParamSignature {
    /// Declared type of the signature, if it names one
    pub fn declared_type(&self) -> Option<TypeDesc> {
        if self.interface {
            return Some(TypeDesc::Capability(self.type_name.clone()));
        }
        TypeDesc::parse(&self.type_name)
    }
}

impl FromStr for ParamSignature {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = SIGNATURE_RE
            .captures(s.trim())
            .ok_or_else(|| ParamError::Unparsable {
                name: "signature".to_string(),
                index: 0,
                arg: s.to_string(),
                reason: "expected `name: [I]Type[?][...][ = default]`".to_string(),
            })?;

        Ok(Self {
            name: caps["name"].to_string(),
            interface: caps.name("iface").is_some(),
            type_name: caps["ty"].to_string(),
            required: caps.name("opt").is_none(),
            variadic: caps.name("var").is_some(),
            default: caps.name("def").map(|m| m.as_str().to_string()),
        })
    }
}

impl From<&Param> for ParamSignature {
    fn from(param: &Param) -> Self {
        Self {
            name: param.name.clone(),
            interface: param.is_interface(),
            type_name: param.declared_type.to_string(),
            required: param.required,
            variadic: param.variadic,
            default: (!param.required).then(|| param.default_value.to_string()),
        }
    }
}

/// Declares a schema with the compact notation of [`params`].
#[macro_export]
macro_rules! params {
    ($($token:expr),* $(,)?) => {
        $crate::param::params(vec![
            $($crate::param::Token::from($crate::param::Example::from($token))),*
        ])
    };
}
