//! # Validation Module
//!
//! Structured validation errors, aggregated per parameter source.
//!
//! ## Design Principles (SOLID)
//!
//! - **S**: Only handles validation error representation
//! - **O**: Extensible error codes via enum

use serde::Serialize;

/// Error code for categorizing validation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    /// Required field is missing
    Required,
    /// Value does not convert to the declared type
    InvalidType,
    /// Value is not in allowed set
    InvalidChoice,
    /// The stored definition itself is broken (e.g. array without `items`)
    Misconfigured,
}

/// A single validation error for a specific field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Parameter name
    pub field: String,
    /// Human-readable error message
    pub message: String,
    /// Machine-readable error code
    pub code: ValidationCode,
}

impl FieldError {
    /// Create a new field error
    pub fn new(field: impl Into<String>, message: impl Into<String>, code: ValidationCode) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code,
        }
    }

    /// Create a "required field" error
    pub fn required(field: impl Into<String>) -> Self {
        let field_str = field.into();
        Self {
            message: format!("{field_str} must be provided"),
            field: field_str,
            code: ValidationCode::Required,
        }
    }

    /// Create a conversion error naming the field, the raw value and the target type
    pub fn invalid_type(field: impl Into<String>, raw: &str, expected: &str) -> Self {
        let field_str = field.into();
        Self {
            message: format!("failed to convert ({field_str}:{raw}) to {expected}"),
            field: field_str,
            code: ValidationCode::InvalidType,
        }
    }

    /// Create an allow-list violation
    pub fn invalid_choice(field: impl Into<String>, raw: &str, allowed: &str) -> Self {
        Self {
            field: field.into(),
            message: format!("{raw} must be one of {allowed}"),
            code: ValidationCode::InvalidChoice,
        }
    }

    /// Create a broken-definition error
    pub fn misconfigured(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: ValidationCode::Misconfigured,
        }
    }

    /// Whether the error comes from stored metadata rather than the caller
    #[must_use]
    pub fn is_misconfigured(&self) -> bool {
        self.code == ValidationCode::Misconfigured
    }
}

/// Collection of validation errors
///
/// Allows aggregating every failure of one source instead of stopping at the first.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationErrors {
    /// List of field-level errors
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Create an empty error collection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field error
    pub fn add(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    /// Add a required field error
    pub fn add_required(&mut self, field: impl Into<String>) {
        self.add(FieldError::required(field));
    }

    /// Check if there are any errors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of errors
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Names of the missing required fields, in insertion order
    #[must_use]
    pub fn missing(&self) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|e| e.code == ValidationCode::Required)
            .map(|e| e.field.as_str())
            .collect()
    }

    /// Errors other than missing fields
    pub fn issues(&self) -> impl Iterator<Item = &FieldError> {
        self.errors
            .iter()
            .filter(|e| e.code != ValidationCode::Required)
    }

    /// Whether any error points at broken stored metadata
    #[must_use]
    pub fn has_misconfiguration(&self) -> bool {
        self.errors.iter().any(FieldError::is_misconfigured)
    }

    /// Join the non-missing messages with `. `
    #[must_use]
    pub fn issue_message(&self) -> String {
        self.issues()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join(". ")
    }

    /// Convert to JSON response body
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"errors":[]}"#.to_string())
    }
}

/// Result type for validation operations
pub type ValidationResult<T> = std::result::Result<T, FieldError>;
