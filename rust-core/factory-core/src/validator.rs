//! # Parameter Validator
//!
//! Decides whether one raw request value is acceptable for a stored parameter
//! definition and converts it.
//!
//! Order of checks: the `enum` allow-list first (scalars only; for arrays it
//! applies per element), then the declared type. Arrays are one level deep: the
//! `items` property must name a scalar type. Empty values never get here, the
//! guard handles presence before calling [`validate`].

use crate::model::{ParameterDef, PropertyGroup};
use crate::types::{convert_scalar, ParamType, ParamValue};
use crate::validation::{FieldError, ValidationResult};

/// Validate `raw` against `param` and the constraints of its properties group
///
/// # Errors
///
/// Returns a [`FieldError`] with code `InvalidChoice` for enum violations,
/// `InvalidType` for conversion failures (array element failures are joined
/// with `. `), and `Misconfigured` when an array has no usable `items`.
pub fn validate(
    param: &ParameterDef,
    constraints: &PropertyGroup,
    raw: &str,
) -> ValidationResult<ParamValue> {
    match param.param_type {
        ParamType::Array => validate_array(param, constraints, raw),
        scalar => validate_scalar(&param.name, scalar, constraints, raw),
    }
}

fn validate_scalar(
    name: &str,
    param_type: ParamType,
    constraints: &PropertyGroup,
    raw: &str,
) -> ValidationResult<ParamValue> {
    if let Some((allowed, listed)) = constraints.enum_values() {
        if !allowed.iter().any(|v| v == raw) {
            return Err(FieldError::invalid_choice(name, raw, listed));
        }
    }

    convert_scalar(raw, param_type)
        .ok_or_else(|| FieldError::invalid_type(name, raw, param_type.short_name()))
}

fn validate_array(
    param: &ParameterDef,
    constraints: &PropertyGroup,
    raw: &str,
) -> ValidationResult<ParamValue> {
    let name = param.name.as_str();
    let items = constraints.items().ok_or_else(|| {
        FieldError::misconfigured(name, format!("array property 'items' not defined for {name}"))
    })?;

    let item_type = match items.parse::<ParamType>() {
        Ok(t) if t.is_scalar() => t,
        Ok(_) => {
            return Err(FieldError::misconfigured(
                name,
                format!("array property 'items' for {name} must name a scalar type"),
            ))
        }
        Err(e) => {
            return Err(FieldError::misconfigured(
                name,
                format!("array property 'items' for {name}: {e}"),
            ))
        }
    };

    let mut values = Vec::new();
    let mut issues = Vec::new();
    let mut first_code = None;
    for element in raw.split(',') {
        match validate_scalar(name, item_type, constraints, element) {
            Ok(value) => values.push(value),
            Err(err) => {
                first_code.get_or_insert(err.code);
                issues.push(err.message);
            }
        }
    }

    match first_code {
        None => Ok(ParamValue::List(values)),
        Some(code) => Err(FieldError::new(name, issues.join(". "), code)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationCode;

    fn param(name: &str, param_type: ParamType) -> ParameterDef {
        ParameterDef::new(name, param_type, true)
    }

    fn none() -> PropertyGroup {
        PropertyGroup::new()
    }

    #[test]
    fn test_string_accepted_as_is() {
        let value = validate(&param("name", ParamType::String), &none(), "anything at all").unwrap();
        assert_eq!(value, ParamValue::String("anything at all".into()));
    }

    #[test]
    fn test_integer() {
        let p = param("page", ParamType::Integer);
        assert_eq!(validate(&p, &none(), "42").unwrap(), ParamValue::Int(42));
        assert_eq!(validate(&p, &none(), "-3").unwrap(), ParamValue::Int(-3));

        let err = validate(&p, &none(), "4a").unwrap_err();
        assert_eq!(err.code, ValidationCode::InvalidType);
        assert_eq!(err.message, "failed to convert (page:4a) to int");

        assert!(validate(&p, &none(), "3.5").is_err());
    }

    #[test]
    fn test_boolean() {
        let p = param("active", ParamType::Boolean);
        assert_eq!(validate(&p, &none(), "t").unwrap(), ParamValue::Bool(true));
        assert_eq!(validate(&p, &none(), "False").unwrap(), ParamValue::Bool(false));

        let err = validate(&p, &none(), "yes").unwrap_err();
        assert_eq!(err.message, "failed to convert (active:yes) to bool");
    }

    #[test]
    fn test_enum_is_case_sensitive() {
        let p = param("mode", ParamType::String);
        let props = PropertyGroup::new().with("enum", "a,b,c");

        assert!(validate(&p, &props, "b").is_ok());
        let err = validate(&p, &props, "B").unwrap_err();
        assert_eq!(err.code, ValidationCode::InvalidChoice);
        assert_eq!(err.message, "B must be one of a,b,c");
    }

    #[test]
    fn test_enum_checked_before_type() {
        let p = param("level", ParamType::Integer);
        let props = PropertyGroup::new().with("enum", "1,2,3");

        assert_eq!(validate(&p, &props, "2").unwrap(), ParamValue::Int(2));
        let err = validate(&p, &props, "x").unwrap_err();
        assert_eq!(err.code, ValidationCode::InvalidChoice);
    }

    #[test]
    fn test_integer_array() {
        let p = param("ids", ParamType::Array);
        let props = PropertyGroup::new().with("items", "integer");

        let value = validate(&p, &props, "1,2,3").unwrap();
        assert_eq!(
            value,
            ParamValue::List(vec![ParamValue::Int(1), ParamValue::Int(2), ParamValue::Int(3)])
        );

        let err = validate(&p, &props, "1,x,3").unwrap_err();
        assert_eq!(err.code, ValidationCode::InvalidType);
        assert!(err.message.contains("(ids:x)"));
    }

    #[test]
    fn test_array_accumulates_every_bad_element() {
        let p = param("flags", ParamType::Array);
        let props = PropertyGroup::new().with("items", "boolean");

        let err = validate(&p, &props, "true,maybe,0,never").unwrap_err();
        assert_eq!(
            err.message,
            "failed to convert (flags:maybe) to bool. failed to convert (flags:never) to bool"
        );
    }

    #[test]
    fn test_array_trailing_comma_fails_for_integers() {
        let p = param("ids", ParamType::Array);
        let props = PropertyGroup::new().with("items", "integer");

        let err = validate(&p, &props, "1,2,").unwrap_err();
        assert_eq!(err.message, "failed to convert (ids:) to int");
    }

    #[test]
    fn test_array_trailing_comma_kept_for_strings() {
        let p = param("tags", ParamType::Array);
        let props = PropertyGroup::new().with("items", "string");

        let value = validate(&p, &props, "a,").unwrap();
        assert_eq!(
            value,
            ParamValue::List(vec![
                ParamValue::String("a".into()),
                ParamValue::String(String::new()),
            ])
        );
    }

    #[test]
    fn test_array_enum_applies_per_element() {
        let p = param("colors", ParamType::Array);
        let props = PropertyGroup::new()
            .with("items", "string")
            .with("enum", "red,green");

        assert!(validate(&p, &props, "red,green,red").is_ok());
        let err = validate(&p, &props, "red,blue").unwrap_err();
        assert_eq!(err.code, ValidationCode::InvalidChoice);
        assert_eq!(err.message, "blue must be one of red,green");
    }

    #[test]
    fn test_array_without_items_is_misconfigured() {
        let p = param("tags", ParamType::Array);
        let err = validate(&p, &none(), "a,b").unwrap_err();
        assert!(err.is_misconfigured());
        assert_eq!(err.message, "array property 'items' not defined for tags");
    }

    #[test]
    fn test_nested_arrays_are_misconfigured() {
        let p = param("matrix", ParamType::Array);
        let props = PropertyGroup::new().with("items", "array");
        let err = validate(&p, &props, "1,2").unwrap_err();
        assert!(err.is_misconfigured());
    }

    #[test]
    fn test_unknown_item_type_is_misconfigured() {
        let p = param("sizes", ParamType::Array);
        let props = PropertyGroup::new().with("items", "float");
        let err = validate(&p, &props, "1.5").unwrap_err();
        assert!(err.is_misconfigured());
        assert!(err.message.contains("float"));
    }
}
