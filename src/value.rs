//! Dynamic argument values and their type descriptors
//!
//! Bindings accept heterogeneous arguments, so every argument travels as a
//! [`Value`]. Parameter schemas declare what they accept with a [`TypeDesc`],
//! compared structurally:
//!
//! ```rust
//! use apiary::value::{TypeDesc, Value};
//!
//! assert!(TypeDesc::Int.accepts(&Value::from(5)));
//! assert!(!TypeDesc::Int.accepts(&Value::from("5")));
//! assert_eq!(Value::from(vec![1, 2]).type_desc(), Some(TypeDesc::list(TypeDesc::Int)));
//! ```

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ============================================================================
// TYPE DESCRIPTORS
// ============================================================================

/// Semantic type of a parameter or value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDesc {
    /// Accepts anything, including `null`
    Any,
    Bool,
    Int,
    Uint,
    Float,
    Str,
    Map,
    List(Box<TypeDesc>),
    /// A concrete caller-defined type, matched by name
    Object(String),
    /// A behavioural contract; satisfied by objects that implement it
    Capability(String),
}

impl TypeDesc {
    pub fn list(elem: TypeDesc) -> Self {
        TypeDesc::List(Box::new(elem))
    }

    pub fn capability(name: impl Into<String>) -> Self {
        TypeDesc::Capability(name.into())
    }

    pub fn object(name: impl Into<String>) -> Self {
        TypeDesc::Object(name.into())
    }

    /// Element type of a list descriptor
    pub fn elem(&self) -> Option<&TypeDesc> {
        match self {
            TypeDesc::List(elem) => Some(elem),
            _ => None,
        }
    }

    pub fn is_capability(&self) -> bool {
        matches!(self, TypeDesc::Capability(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, TypeDesc::Int | TypeDesc::Uint | TypeDesc::Float)
    }

    /// Whether `value` can be passed where this type is declared.
    ///
    /// Concrete types require an exact match; capabilities accept any
    /// object that implements them.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            TypeDesc::Any => true,
            TypeDesc::Capability(cap) => match value {
                Value::Object(obj) => obj.implements(cap),
                _ => false,
            },
            _ => value.type_desc().as_ref() == Some(self),
        }
    }

    /// Zero value of the type (`null` for types without one)
    pub fn zero_value(&self) -> Value {
        match self {
            TypeDesc::Bool => Value::Bool(false),
            TypeDesc::Int => Value::Int(0),
            TypeDesc::Uint => Value::Uint(0),
            TypeDesc::Float => Value::Float(0.0),
            TypeDesc::Str => Value::Str(String::new()),
            TypeDesc::Map => Value::Map(BTreeMap::new()),
            TypeDesc::List(elem) => Value::List((**elem).clone(), Vec::new()),
            TypeDesc::Any | TypeDesc::Object(_) | TypeDesc::Capability(_) => Value::Null,
        }
    }

    /// Parses the rendered form produced by `Display`
    pub fn parse(s: &str) -> Option<TypeDesc> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix("[]") {
            return TypeDesc::parse(rest).map(TypeDesc::list);
        }
        Some(match s {
            "" => return None,
            "any" => TypeDesc::Any,
            "bool" => TypeDesc::Bool,
            "int" => TypeDesc::Int,
            "uint" => TypeDesc::Uint,
            "float" => TypeDesc::Float,
            "string" => TypeDesc::Str,
            "map" => TypeDesc::Map,
            other => TypeDesc::Object(other.to_string()),
        })
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Any => write!(f, "any"),
            TypeDesc::Bool => write!(f, "bool"),
            TypeDesc::Int => write!(f, "int"),
            TypeDesc::Uint => write!(f, "uint"),
            TypeDesc::Float => write!(f, "float"),
            TypeDesc::Str => write!(f, "string"),
            TypeDesc::Map => write!(f, "map"),
            TypeDesc::List(elem) => write!(f, "[]{}", elem),
            TypeDesc::Object(name) | TypeDesc::Capability(name) => write!(f, "{}", name),
        }
    }
}

/// Rust types with a fixed descriptor, used to type empty lists
pub trait Typed {
    fn type_desc() -> TypeDesc;
}

macro_rules! typed {
    ($($t:ty => $desc:expr),* $(,)?) => {
        $(impl Typed for $t {
            fn type_desc() -> TypeDesc {
                $desc
            }
        })*
    };
}

typed! {
    bool => TypeDesc::Bool,
    i32 => TypeDesc::Int,
    i64 => TypeDesc::Int,
    u32 => TypeDesc::Uint,
    u64 => TypeDesc::Uint,
    usize => TypeDesc::Uint,
    f64 => TypeDesc::Float,
    String => TypeDesc::Str,
    &str => TypeDesc::Str,
    Value => TypeDesc::Any,
}

impl<T: Typed> Typed for Vec<T> {
    fn type_desc() -> TypeDesc {
        TypeDesc::list(T::type_desc())
    }
}

// ============================================================================
// OBJECTS
// ============================================================================

/// Opaque caller-defined value passed as an argument
pub trait Object: Any + Send + Sync + fmt::Debug {
    fn type_name(&self) -> &str;

    /// Whether this object satisfies the named capability
    fn implements(&self, _capability: &str) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;

    fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}

// ============================================================================
// VALUES
// ============================================================================

/// A single argument value
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(String),
    /// Homogeneous list; the element type survives when the list is empty
    List(TypeDesc, Vec<Value>),
    Map(BTreeMap<String, Value>),
    Object(Arc<dyn Object>),
}

impl Value {
    pub fn object(obj: impl Object) -> Self {
        Value::Object(Arc::new(obj))
    }

    pub fn list(elem: TypeDesc, items: Vec<Value>) -> Self {
        Value::List(elem, items)
    }

    /// Concrete type of the value; `None` for `null`
    pub fn type_desc(&self) -> Option<TypeDesc> {
        Some(match self {
            Value::Null => return None,
            Value::Bool(_) => TypeDesc::Bool,
            Value::Int(_) => TypeDesc::Int,
            Value::Uint(_) => TypeDesc::Uint,
            Value::Float(_) => TypeDesc::Float,
            Value::Str(_) => TypeDesc::Str,
            Value::List(elem, _) => TypeDesc::list(elem.clone()),
            Value::Map(_) => TypeDesc::Map,
            Value::Object(obj) => TypeDesc::Object(obj.type_name().to_string()),
        })
    }

    /// Type name for error messages
    pub fn type_name(&self) -> String {
        self.type_desc()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "null".to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Uint(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Uint(u) => Some(*u as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(_, items) => Some(items),
            _ => None,
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Object(obj) => obj.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Page number `n` typed as `ty` (integer kinds only)
    pub(crate) fn page_number(ty: &TypeDesc, n: usize) -> Option<Value> {
        match ty {
            TypeDesc::Int => i64::try_from(n).ok().map(Value::Int),
            TypeDesc::Uint => Some(Value::Uint(n as u64)),
            TypeDesc::Float => Some(Value::Float(n as f64)),
            TypeDesc::Any => i64::try_from(n).ok().map(Value::Int),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    /// Converts a JSON value into the closest untyped `Value`
    pub fn from_json(json: &serde_json::Value) -> Value {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::Uint(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or_default())
                }
            }
            Json::String(s) => Value::Str(s.clone()),
            Json::Array(items) => Value::List(TypeDesc::Any, items.iter().map(Value::from_json).collect()),
            Json::Object(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

/// Objects serialize through [`Object::to_json`]; list element types are dropped
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Uint(u) => serializer.serialize_u64(*u),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Str(s) => serializer.serialize_str(s),
            Value::List(_, items) => serializer.collect_seq(items),
            Value::Map(map) => serializer.collect_map(map),
            Value::Object(obj) => obj.to_json().serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(|json| Value::from_json(&json))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Uint(a), Value::Uint(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(ta, a), Value::List(tb, b)) => ta == tb && a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            // Objects compare by identity
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Uint(u) => write!(f, "{}", u),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::List(_, items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Object(obj) => write!(f, "<{}>", obj.type_name()),
        }
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u32> for Value {
    fn from(u: u32) -> Self {
        Value::Uint(u64::from(u))
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Value::Uint(u)
    }
}

impl From<usize> for Value {
    fn from(u: usize) -> Self {
        Value::Uint(u as u64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl<T: Into<Value> + Typed> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(T::type_desc(), items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}
