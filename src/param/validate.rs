//! Schema checks and argument validation
//!
//! [`check_schema`] enforces the structural rules of a param list:
//! - names are unique
//! - required params form a contiguous prefix
//! - a variadic param comes last, is never required and defaults to an empty list
//!
//! [`validate_args`] normalises a call's arguments against a checked schema.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::Param;
use crate::error::ParamError;
use crate::value::Value;

/// Checks the structural rules, reporting the first violation
pub fn check_schema(params: &[Param]) -> Result<(), ParamError> {
    let mut first_index: HashMap<&str, usize> = HashMap::with_capacity(params.len());
    let mut optional_seen = false;

    for (index, param) in params.iter().enumerate() {
        if let Some(&first) = first_index.get(param.name()) {
            return Err(ParamError::DuplicateName {
                name: param.name().to_string(),
                index,
                first_index: first,
            });
        }
        first_index.insert(param.name(), index);

        if param.is_variadic() {
            if index != params.len() - 1 {
                return Err(ParamError::VariadicNotLast {
                    name: param.name().to_string(),
                    index,
                    from_end: ordinal(params.len() - index),
                });
            }
            if param.is_required() {
                return Err(ParamError::VariadicRequired {
                    name: param.name().to_string(),
                    index,
                });
            }
            match param.default_value() {
                Value::List(_, items) if !items.is_empty() => {
                    return Err(ParamError::VariadicDefaultNotEmpty {
                        name: param.name().to_string(),
                        index,
                        len: items.len(),
                    });
                }
                Value::List(..) => {}
                other => {
                    return Err(ParamError::VariadicDefaultNotList {
                        name: param.name().to_string(),
                        index,
                        found: other.type_name(),
                    });
                }
            }
        }

        if param.is_required() && optional_seen {
            return Err(ParamError::RequiredAfterOptional {
                name: param.name().to_string(),
                index,
            });
        }
        optional_seen |= !param.is_required();
    }

    Ok(())
}

/// Validates `args` against `params`, filling omitted optional slots with
/// their defaults and flattening a variadic tail in place.
///
/// Arguments past the end of a schema without a variadic tail are dropped.
pub fn validate_args(params: &[Param], args: Vec<Value>) -> Result<Vec<Value>, ParamError> {
    let provided = args.len();
    let mut args = args.into_iter().enumerate();
    let mut out = Vec::with_capacity(params.len().max(provided));

    for (position, param) in params.iter().enumerate() {
        let Some((index, arg)) = args.next() else {
            if param.is_required() {
                return Err(ParamError::MissingRequired {
                    name: param.name().to_string(),
                    index: position,
                });
            }
            if !param.is_variadic() {
                out.push(param.default_value().clone());
            }
            continue;
        };

        let expected = param.arg_type();
        if param.is_variadic() {
            for (index, arg) in std::iter::once((index, arg)).chain(args.by_ref()) {
                if !expected.accepts(&arg) {
                    return Err(ParamError::VariadicTypeMismatch {
                        name: param.name().to_string(),
                        index,
                        expected: expected.to_string(),
                        actual: arg.type_name(),
                    });
                }
                out.push(arg);
            }
            return Ok(out);
        }

        if !expected.accepts(&arg) {
            return Err(ParamError::TypeMismatch {
                name: param.name().to_string(),
                index,
                expected: expected.to_string(),
                actual: arg.type_name(),
            });
        }
        out.push(arg);
    }

    let dropped = args.count();
    if dropped > 0 {
        debug!(dropped, params = params.len(), "dropping args beyond the declared params");
    }
    Ok(out)
}

/// A param list together with its structural check, computed once.
#[derive(Debug, Clone)]
pub struct Schema {
    params: Arc<Vec<Param>>,
    check: Result<(), ParamError>,
}

impl Schema {
    pub fn new(params: Vec<Param>) -> Self {
        let check = check_schema(&params);
        if let Err(e) = &check {
            debug!(error = %e, "param schema failed its structural check");
        }
        Self {
            params: Arc::new(params),
            check,
        }
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Cached structural error, if any
    pub fn check(&self) -> Result<(), ParamError> {
        self.check.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Position of the param named `name`
    pub fn position(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name() == name)
    }

    pub fn get(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name() == name)
    }

    /// Validates a call's arguments.
    ///
    /// An empty schema disables validation and passes `args` through.
    pub fn validate(&self, args: Vec<Value>) -> Result<Vec<Value>, ParamError> {
        self.check()?;
        if self.params.is_empty() {
            return Ok(args);
        }
        validate_args(&self.params, args)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::Example;
    use crate::value::TypeDesc;
    use pretty_assertions::assert_eq;

    fn abc() -> Vec<Param> {
        vec![
            Param::required("a", 0),
            Param::optional("b", 1),
            Param::variadic("c", Vec::<i64>::new()),
        ]
    }

    fn ints(xs: &[i64]) -> Vec<Value> {
        xs.iter().copied().map(Value::Int).collect()
    }

    // ═══════════════════════════════════════════════════════════════
    // check_schema
    // ═══════════════════════════════════════════════════════════════

    #[test]
    fn valid_schema_passes() {
        assert!(check_schema(&abc()).is_ok());
        assert!(check_schema(&[]).is_ok());
    }

    #[test]
    fn duplicate_names() {
        let err = check_schema(&[Param::required("a", 0), Param::optional("a", 1)]).unwrap_err();
        assert_eq!(
            err,
            ParamError::DuplicateName {
                name: "a".into(),
                index: 1,
                first_index: 0
            }
        );
    }

    #[test]
    fn required_after_optional_is_rejected_at_any_distance() {
        let schema = [Param::optional("a", 0), Param::required("b", 1)];
        assert!(matches!(
            check_schema(&schema),
            Err(ParamError::RequiredAfterOptional { index: 1, .. })
        ));
    }

    #[test]
    fn variadic_rules() {
        let not_last = [Param::variadic("v", Vec::<i64>::new()), Param::optional("a", 1)];
        let err = check_schema(&not_last).unwrap_err();
        assert!(matches!(&err, ParamError::VariadicNotLast { from_end, .. } if from_end == "2nd"));

        let required = [Param::variadic("v", Vec::<i64>::new()).with_required(true)];
        assert!(matches!(check_schema(&required), Err(ParamError::VariadicRequired { .. })));

        let not_list = [Param::variadic("v", 3)];
        assert!(matches!(
            check_schema(&not_list),
            Err(ParamError::VariadicDefaultNotList { found, .. }) if found == "int"
        ));

        let not_empty = [Param::variadic("v", vec![1, 2])];
        assert!(matches!(
            check_schema(&not_empty),
            Err(ParamError::VariadicDefaultNotEmpty { len: 2, .. })
        ));
    }

    #[test]
    fn ordinals() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(2), "2nd");
        assert_eq!(ordinal(3), "3rd");
        assert_eq!(ordinal(11), "11th");
        assert_eq!(ordinal(22), "22nd");
    }

    // ═══════════════════════════════════════════════════════════════
    // validate_args
    // ═══════════════════════════════════════════════════════════════

    #[test]
    fn defaults_fill_omitted_optionals() {
        assert_eq!(validate_args(&abc(), ints(&[5])).unwrap(), ints(&[5, 1]));
    }

    #[test]
    fn variadic_tail_is_flattened() {
        assert_eq!(validate_args(&abc(), ints(&[5, 2, 3, 4])).unwrap(), ints(&[5, 2, 3, 4]));
    }

    #[test]
    fn missing_required() {
        assert_eq!(
            validate_args(&abc(), vec![]).unwrap_err(),
            ParamError::MissingRequired {
                name: "a".into(),
                index: 0
            }
        );
    }

    #[test]
    fn variadic_mismatch_reports_absolute_index() {
        let args = vec![Value::Int(5), Value::Int(2), Value::Int(3), Value::from("x")];
        assert_eq!(
            validate_args(&abc(), args).unwrap_err(),
            ParamError::VariadicTypeMismatch {
                name: "c".into(),
                index: 3,
                expected: "int".into(),
                actual: "string".into(),
            }
        );
    }

    #[test]
    fn type_mismatch_reports_expected_and_actual() {
        let err = validate_args(&abc(), vec![Value::from("5")]).unwrap_err();
        assert_eq!(
            err,
            ParamError::TypeMismatch {
                name: "a".into(),
                index: 0,
                expected: "int".into(),
                actual: "string".into(),
            }
        );
    }

    #[test]
    fn capability_params_take_implementers() {
        #[derive(Debug)]
        struct Conn;
        impl crate::value::Object for Conn {
            fn type_name(&self) -> &str {
                "Conn"
            }
            fn implements(&self, capability: &str) -> bool {
                capability == "Client"
            }
            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
        }

        let schema = [Param::required("client", Example::interface("Client"))];
        assert!(validate_args(&schema, vec![Value::object(Conn)]).is_ok());
        let err = validate_args(&schema, vec![Value::Int(1)]).unwrap_err();
        assert!(matches!(err, ParamError::TypeMismatch { expected, .. } if expected == "Client"));
    }

    #[test]
    fn surplus_args_are_dropped() {
        let schema = [Param::required("a", 0)];
        assert_eq!(validate_args(&schema, ints(&[1, 2, 3])).unwrap(), ints(&[1]));
    }

    #[test]
    fn explicit_null_only_matches_any() {
        let schema = [Param::optional("a", TypeDesc::Any), Param::optional("b", 2)];
        assert!(validate_args(&schema, vec![Value::Null]).is_ok());
        assert!(validate_args(&schema, vec![Value::Null, Value::Null]).is_err());
    }

    // ═══════════════════════════════════════════════════════════════
    // Schema
    // ═══════════════════════════════════════════════════════════════

    #[test]
    fn schema_returns_cached_structural_error_first() {
        let schema = Schema::new(vec![Param::required("a", 0), Param::required("a", 0)]);
        // Arguments that would fail validation still report the schema error
        let err = schema.validate(vec![]).unwrap_err();
        assert!(err.is_schema_error());
        assert_eq!(schema.validate(ints(&[1, 2])).unwrap_err(), err);
    }

    #[test]
    fn empty_schema_passes_args_through() {
        let args = vec![Value::from("anything"), Value::Int(1)];
        assert_eq!(Schema::default().validate(args.clone()).unwrap(), args);
    }

    #[test]
    fn schema_lookup() {
        let schema = Schema::new(abc());
        assert_eq!(schema.position("b"), Some(1));
        assert!(schema.get("c").unwrap().is_variadic());
        assert_eq!(schema.position("z"), None);
    }
}
