//! Pagination conventions
//!
//! Detected from a binding's param names, in priority order:
//! 1. `page` - a page counter starting at 1
//! 2. `after` - a cursor taken from the previous page

use std::fmt;

use crate::error::{ApiaryError, Result};
use crate::param::{Param, Schema};
use crate::value::{TypeDesc, Value};

/// Where the next `after` value comes from
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CursorState {
    /// No page fetched yet
    Start,
    Next(Value),
    /// The last page reported no further cursor
    Exhausted,
    /// The result type cannot produce cursors
    Unsupported,
}

/// How a binding is paged
#[derive(Debug, Clone, PartialEq)]
pub enum PageConvention {
    /// `page` param, typed as declared
    Page { ty: TypeDesc },
    /// `after` param; first page uses the zero value of `ty`
    After { ty: TypeDesc },
}

impl PageConvention {
    pub const PARAM_NAMES: [&'static str; 2] = ["page", "after"];

    pub fn detect(schema: &Schema) -> Option<Self> {
        if let Some(param) = schema.get("page") {
            return Some(PageConvention::Page {
                ty: param.declared_type().clone(),
            });
        }
        schema.get("after").map(|param| PageConvention::After {
            ty: param.declared_type().clone(),
        })
    }

    pub fn param_name(&self) -> &'static str {
        match self {
            PageConvention::Page { .. } => "page",
            PageConvention::After { .. } => "after",
        }
    }

    /// Value of the paging param for `page`
    pub(crate) fn value_for(&self, page: usize, cursor: &CursorState, type_name: &str) -> Result<Value> {
        match self {
            PageConvention::Page { ty } => Ok(Value::page_number(ty, page).unwrap_or(Value::Uint(page as u64))),
            PageConvention::After { ty } => match cursor {
                CursorState::Start => Ok(ty.zero_value()),
                CursorState::Next(value) => Ok(value.clone()),
                CursorState::Exhausted => Err(ApiaryError::CursorExhausted { page }),
                CursorState::Unsupported => Err(ApiaryError::CursorUnsupported {
                    page,
                    type_name: type_name.to_string(),
                }),
            },
        }
    }

    /// Inserts the paging value into `args` at the position of its param.
    ///
    /// Omitted optional params before it are filled with their defaults; an
    /// omitted required param before it cannot be filled.
    pub(crate) fn insert(&self, params: &[Param], args: &[Value], value: Value, page: usize) -> Result<Vec<Value>> {
        let name = self.param_name();
        let mut out = args.to_vec();
        let mut value = Some(value);

        for (index, param) in params.iter().enumerate() {
            if param.name() == name {
                if let Some(value) = value.take() {
                    out.insert(index.min(out.len()), value);
                }
                break;
            }
            if index >= out.len() {
                if param.is_required() {
                    return Err(ApiaryError::UnfilledPaginationSlot {
                        page,
                        name: param.name().to_string(),
                        index,
                        remaining: name.to_string(),
                    });
                }
                out.push(param.default_value().clone());
            }
        }

        Ok(out)
    }
}

impl fmt::Display for PageConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageConvention::Page { ty } => write!(f, "page: {}", ty),
            PageConvention::After { ty } => write!(f, "after: {}", ty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;

    #[test]
    fn page_wins_over_after() {
        let schema = Schema::new(params!["after", "", "page", 1]);
        assert_eq!(
            PageConvention::detect(&schema),
            Some(PageConvention::Page { ty: TypeDesc::Int })
        );
        let after = Schema::new(params!["after", ""]);
        assert_eq!(
            PageConvention::detect(&after),
            Some(PageConvention::After { ty: TypeDesc::Str })
        );
        assert_eq!(PageConvention::detect(&Schema::new(params!["q", ""])), None);
    }

    #[test]
    fn page_numbers_follow_declared_type() {
        let uint = PageConvention::Page { ty: TypeDesc::Uint };
        assert_eq!(uint.value_for(3, &CursorState::Start, "").unwrap(), Value::Uint(3));
        let int = PageConvention::Page { ty: TypeDesc::Int };
        assert_eq!(int.value_for(1, &CursorState::Start, "").unwrap(), Value::Int(1));
    }

    #[test]
    fn after_values() {
        let after = PageConvention::After { ty: TypeDesc::Str };
        assert_eq!(after.value_for(1, &CursorState::Start, "").unwrap(), Value::from(""));
        assert_eq!(
            after.value_for(2, &CursorState::Next(Value::from("c2")), "").unwrap(),
            Value::from("c2")
        );
        assert!(matches!(
            after.value_for(2, &CursorState::Unsupported, "Vec<u32>"),
            Err(ApiaryError::CursorUnsupported { page: 2, .. })
        ));
        assert!(after.value_for(3, &CursorState::Exhausted, "").is_err());
    }

    #[test]
    fn insert_fills_defaults_before_paging_param() {
        let params = params!["org", "", true, "per_page", 30, "page", 1, true, "sort", "asc"];
        let conv = PageConvention::Page { ty: TypeDesc::Int };

        let args = conv.insert(&params, &[Value::from("acme")], Value::Int(2), 2).unwrap();
        assert_eq!(args, vec![Value::from("acme"), Value::Int(30), Value::Int(2)]);

        let explicit = [Value::from("acme"), Value::Int(5), Value::from("desc")];
        let args = conv.insert(&params, &explicit, Value::Int(1), 1).unwrap();
        assert_eq!(
            args,
            vec![Value::from("acme"), Value::Int(5), Value::Int(1), Value::from("desc")]
        );
    }

    #[test]
    fn insert_rejects_unfilled_required_slot() {
        let params = params!["org", "", true, "page", 1, true];
        let conv = PageConvention::Page { ty: TypeDesc::Int };
        let err = conv.insert(&params, &[], Value::Int(1), 1).unwrap_err();
        assert!(matches!(err, ApiaryError::UnfilledPaginationSlot { ref name, index: 0, .. } if name == "org"));
    }
}
