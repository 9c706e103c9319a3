//! String arguments
//!
//! Command-line style callers hand over every argument as a string. Each one is
//! read as a JSON literal of its param's declared type; string params take the
//! raw text.

use serde_json::Value as Json;

use super::Param;
use crate::error::ParamError;
use crate::value::{TypeDesc, Value};

/// Parses `strings` against the declared types of `params`.
///
/// Strings past the last param are only accepted when it is variadic, in
/// which case each is parsed as the element type.
pub fn parse_args<S: AsRef<str>>(params: &[Param], strings: &[S]) -> Result<Vec<Value>, ParamError> {
    let mut out = Vec::with_capacity(strings.len());

    for (index, raw) in strings.iter().enumerate() {
        let raw = raw.as_ref();
        let param = match params.get(index) {
            Some(p) => p,
            None => match params.last() {
                Some(last) if last.is_variadic() => last,
                _ => {
                    return Err(ParamError::Unparsable {
                        name: "(none)".to_string(),
                        index,
                        arg: raw.to_string(),
                        reason: format!("only {} params are declared", params.len()),
                    })
                }
            },
        };

        let ty = param.arg_type();
        let unparsable = |reason: String| ParamError::Unparsable {
            name: param.name().to_string(),
            index,
            arg: raw.to_string(),
            reason,
        };

        let json = if *ty == TypeDesc::Str {
            Json::String(raw.to_string())
        } else {
            serde_json::from_str::<Json>(raw).map_err(|e| unparsable(e.to_string()))?
        };
        out.push(from_json_as(&json, ty).map_err(unparsable)?);
    }

    Ok(out)
}

/// Converts `json` to a value of type `ty`
fn from_json_as(json: &Json, ty: &TypeDesc) -> Result<Value, String> {
    let mismatch = || format!("expected {}, found JSON {}", ty, json_kind(json));

    if json.is_null() && !matches!(ty, TypeDesc::Object(_) | TypeDesc::Capability(_)) {
        return Ok(ty.zero_value());
    }

    match ty {
        TypeDesc::Any => Ok(Value::from_json(json)),
        TypeDesc::Bool => json.as_bool().map(Value::Bool).ok_or_else(mismatch),
        TypeDesc::Int => json.as_i64().map(Value::Int).ok_or_else(mismatch),
        TypeDesc::Uint => json.as_u64().map(Value::Uint).ok_or_else(mismatch),
        TypeDesc::Float => json.as_f64().map(Value::Float).ok_or_else(mismatch),
        TypeDesc::Str => json.as_str().map(Value::from).ok_or_else(mismatch),
        TypeDesc::Map => match json {
            Json::Object(map) => Ok(Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            )),
            _ => Err(mismatch()),
        },
        TypeDesc::List(elem) => match json {
            Json::Array(items) => Ok(Value::List(
                (**elem).clone(),
                items
                    .iter()
                    .map(|item| from_json_as(item, elem))
                    .collect::<Result<_, _>>()?,
            )),
            _ => Err(mismatch()),
        },
        TypeDesc::Object(_) | TypeDesc::Capability(_) => {
            Err(format!("values of type {} cannot be read from a string", ty))
        }
    }
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::Example;
    use pretty_assertions::assert_eq;

    fn schema() -> Vec<Param> {
        vec![
            Param::required("owner", ""),
            Param::optional("per_page", 30),
            Param::variadic("ids", Vec::<u64>::new()),
        ]
    }

    #[test]
    fn strings_are_taken_verbatim() {
        let args = parse_args(&schema(), &["octo cat", "10"]).unwrap();
        assert_eq!(args, vec![Value::from("octo cat"), Value::Int(10)]);
    }

    #[test]
    fn variadic_tail_uses_element_type() {
        let args = parse_args(&schema(), &["a", "1", "7", "8"]).unwrap();
        assert_eq!(args[2..], [Value::Uint(7), Value::Uint(8)]);
    }

    #[test]
    fn bad_literal_names_param() {
        let err = parse_args(&schema(), &["a", "ten"]).unwrap_err();
        assert!(matches!(err, ParamError::Unparsable { ref name, index: 1, .. } if name == "per_page"));
    }

    #[test]
    fn wrong_json_kind() {
        let err = parse_args(&schema(), &["a", "1.5"]).unwrap_err();
        assert!(err.to_string().contains("expected int"));
    }

    #[test]
    fn surplus_strings_rejected_without_variadic() {
        let params = vec![Param::required("a", 0)];
        assert!(parse_args(&params, &["1", "2"]).is_err());
    }

    #[test]
    fn capabilities_cannot_be_parsed() {
        let params = vec![Param::required("client", Example::interface("Client"))];
        assert!(parse_args(&params, &["{}"]).is_err());
    }

    #[test]
    fn nested_lists() {
        let params = vec![Param::required("grid", Vec::<Vec<i64>>::new())];
        let args = parse_args(&params, &["[[1, 2], []]"]).unwrap();
        assert_eq!(args[0], Value::from(vec![vec![1i64, 2], vec![]]));
    }
}
