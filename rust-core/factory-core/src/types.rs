//! # Parameter Types
//!
//! Declared parameter types and the scalar conversions behind them.
//!
//! ## Design Principles
//!
//! - **S**: Only handles type names and raw-string conversion
//! - **D**: The validator depends on `convert_scalar`, not on parsing details

use std::fmt;
use std::str::FromStr;

/// Declared type of a stored parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParamType {
    /// Accepted as-is
    #[default]
    String,
    /// Base-10 signed integer (i64)
    Integer,
    /// Canonical boolean literal
    Boolean,
    /// Comma-separated list; element type comes from the `items` property
    Array,
}

impl ParamType {
    /// Get the stored type name
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
        }
    }

    /// Short name used in conversion error messages
    #[must_use]
    pub const fn short_name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "int",
            Self::Boolean => "bool",
            Self::Array => "array",
        }
    }

    /// Whether values of this type are single literals
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        !matches!(self, Self::Array)
    }
}

impl FromStr for ParamType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "integer" => Ok(Self::Integer),
            "boolean" => Ok(Self::Boolean),
            "array" => Ok(Self::Array),
            other => Err(format!("unknown parameter type '{other}'")),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Validated parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// String value (no conversion performed)
    String(String),
    /// Integer value (i64)
    Int(i64),
    /// Boolean value
    Bool(bool),
    /// Array elements, each already converted
    List(Vec<ParamValue>),
}

impl serde::Serialize for ParamValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::String(s) => serializer.serialize_str(s),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::List(items) => items.serialize(serializer),
        }
    }
}

/// Parse a boolean literal
///
/// Accepts exactly `1 t T TRUE true True` and `0 f F FALSE false False`.
#[must_use]
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Convert a raw string to a scalar value
///
/// Returns `None` when the string is not a literal of `param_type`. Arrays are
/// never scalar and always yield `None`.
#[must_use]
pub fn convert_scalar(raw: &str, param_type: ParamType) -> Option<ParamValue> {
    match param_type {
        ParamType::String => Some(ParamValue::String(raw.to_string())),
        ParamType::Integer => raw.parse::<i64>().ok().map(ParamValue::Int),
        ParamType::Boolean => parse_bool(raw).map(ParamValue::Bool),
        ParamType::Array => None,
    }
}
