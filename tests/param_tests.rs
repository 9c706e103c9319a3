//! # Parameter Schema Tests
//!
//! Public behaviour of the `params!` notation, schema checks and argument
//! validation:
//! - notation grouping
//! - structural errors vs validation errors
//! - default filling and variadic flattening (property based)
//! - rendered signatures re-parse with the same flags

mod common;

use apiary::error::ParamErrorKind;
use apiary::param::{parse_args, validate_args, Schema};
use apiary::{params, Param, ParamError, ParamSignature, TypeDesc, Value};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

// ============================================================================
// TEST HELPERS
// ============================================================================

/// `(a req, b opt = 1, c variadic []int)`
fn abc() -> Schema {
    Schema::new(params!["a", 0, true, "b", 1, "c", Vec::<i64>::new(), false, true])
}

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().copied().map(Value::Int).collect()
}

// ============================================================================
// NOTATION
// ============================================================================

#[test]
fn test_variadic_tuple_yields_single_param() {
    let ps = params!["x", Vec::<i64>::new(), false, true];
    assert_eq!(ps.len(), 1);
    assert!(ps[0].is_variadic());
    assert!(!ps[0].is_required());
    assert_eq!(ps[0].declared_type(), &TypeDesc::list(TypeDesc::Int));
    assert_eq!(ps[0].arg_type(), &TypeDesc::Int);
}

#[test]
fn test_dangling_name_is_dropped() {
    let ps = params!["a", "", true, "b"];
    assert_eq!(ps.len(), 1);
    assert_eq!(ps[0].name(), "a");
    assert!(ps[0].is_required());
}

#[test]
fn test_notation_matches_constructors() {
    let ps = params!["owner", "", true, "per_page", 30];
    assert_eq!(ps, vec![Param::required("owner", ""), Param::optional("per_page", 30)]);
}

// ============================================================================
// SCHEMA CHECKS
// ============================================================================

#[test]
fn test_duplicate_names_are_schema_errors() {
    let schema = Schema::new(params!["a", 1, "a", 2]);
    let err = schema.check().unwrap_err();
    assert_eq!(err.kind(), ParamErrorKind::Schema);

    // Even valid-looking args get the structural error
    let err = schema.validate(ints(&[1, 2])).unwrap_err();
    assert!(err.is_schema_error());
    assert!(matches!(err, ParamError::DuplicateName { index: 1, first_index: 0, .. }));
}

#[test]
fn test_required_after_optional() {
    let schema = Schema::new(params!["a", 1, "b", 2, "c", 3, true]);
    assert!(matches!(
        schema.check(),
        Err(ParamError::RequiredAfterOptional { index: 2, .. })
    ));
}

#[test]
fn test_variadic_must_be_last() {
    let schema = Schema::new(params!["xs", Vec::<i64>::new(), false, true, "y", 1]);
    let err = schema.check().unwrap_err();
    assert_eq!(err.code(), "APIARY-012");
    assert!(err.to_string().contains("2nd"));
}

// ============================================================================
// VALIDATION
// ============================================================================

#[test]
fn test_abc_fills_default() {
    assert_eq!(abc().validate(ints(&[5])).unwrap(), ints(&[5, 1]));
}

#[test]
fn test_abc_flattens_variadic() {
    assert_eq!(abc().validate(ints(&[5, 2, 3, 4])).unwrap(), ints(&[5, 2, 3, 4]));
}

#[test]
fn test_abc_missing_required() {
    let err = abc().validate(vec![]).unwrap_err();
    assert_eq!(err.kind(), ParamErrorKind::Validation);
    assert_eq!(err.param_name(), "a");
    assert!(matches!(err, ParamError::MissingRequired { index: 0, .. }));
}

#[test]
fn test_type_mismatch_names_both_types() {
    let err = abc().validate(vec![Value::from("five")]).unwrap_err();
    assert_eq!(
        err,
        ParamError::TypeMismatch {
            name: "a".to_string(),
            index: 0,
            expected: "int".to_string(),
            actual: "string".to_string(),
        }
    );
}

#[test]
fn test_string_args_parse_against_schema() {
    let ps = params!["a", 0, true, "b", 1, "c", Vec::<i64>::new(), false, true];
    let args = parse_args(&ps, &["5", "2", "3", "4"]).unwrap();
    assert_eq!(validate_args(&ps, args).unwrap(), ints(&[5, 2, 3, 4]));
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    /// Valid calls come back with one value per non-variadic param, the
    /// passed values first and defaults after them
    #[test]
    fn prop_validate_fills_defaults(
        required in 0usize..4,
        defaults in prop::collection::vec(any::<i64>(), 0..4),
        args in prop::collection::vec(any::<i64>(), 0..8),
    ) {
        let mut ps: Vec<Param> = (0..required).map(|i| Param::required(format!("r{}", i), 0i64)).collect();
        ps.extend(defaults.iter().enumerate().map(|(i, d)| Param::optional(format!("o{}", i), *d)));
        let total = ps.len();

        let result = validate_args(&ps, ints(&args));
        if args.len() < required {
            let is_missing_required = matches!(result, Err(ParamError::MissingRequired { index, .. }) if index == args.len());
            prop_assert!(is_missing_required);
        } else {
            let out = result.unwrap();
            prop_assert_eq!(out.len(), total);
            for (i, value) in out.iter().enumerate() {
                let expected = if i < args.len() { args[i] } else { defaults[i - required] };
                prop_assert_eq!(value, &Value::Int(expected));
            }
        }
    }

    /// Variadic tails keep every extra argument in order
    #[test]
    fn prop_variadic_keeps_all(args in prop::collection::vec(any::<i64>(), 1..10)) {
        let out = abc().validate(ints(&args)).unwrap();
        let expected_len = if args.len() == 1 { 2 } else { args.len() };
        prop_assert_eq!(out.len(), expected_len);
        prop_assert_eq!(&out[..args.len()], &ints(&args)[..]);
    }

    /// A rendered param re-parses with the same flags and type
    #[test]
    fn prop_signature_round_trip(
        name in "[a-z][a-z_]{0,10}",
        default in any::<i64>(),
        required in any::<bool>(),
    ) {
        let param = Param::optional(name.clone(), default).with_required(required);
        let sig: ParamSignature = param.to_string().parse().unwrap();
        prop_assert_eq!(&sig, &ParamSignature::from(&param));
        prop_assert_eq!(sig.declared_type(), Some(TypeDesc::Int));
    }
}

#[test]
fn test_variadic_signature_round_trip() {
    let param = Param::variadic("tags", Vec::<String>::new());
    let sig: ParamSignature = param.to_string().parse().unwrap();
    assert!(sig.variadic);
    assert!(!sig.required);
    assert_eq!(sig.declared_type(), Some(TypeDesc::list(TypeDesc::Str)));
}
