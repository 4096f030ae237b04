//! # Metadata Model
//!
//! Typed records for the four stored relations and the constraint bag
//! attached to parameters.
//!
//! Group identifiers are shared references: several endpoints may point at the
//! same methods group, several parameters at the same properties group. A group
//! id of `0` or below means "nothing defined".

use crate::database::{DbRow, DbValue};
use crate::error::{Error, Result};
use crate::route::normalize_path;
use crate::router::Method;
use crate::types::ParamType;
use std::collections::BTreeMap;

/// Whether a group reference points at anything
#[must_use]
pub const fn group_defined(id: i64) -> bool {
    id > 0
}

/// A typed record decoded from one row of a named relation
pub trait Record: Sized {
    /// Relation the record is stored in
    const RELATION: &'static str;

    /// Decode one fetched row
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` when a column is missing or malformed.
    fn from_row(row: &DbRow) -> Result<Self>;
}

fn column<'a>(row: &'a DbRow, relation: &str, name: &str) -> Result<&'a DbValue> {
    row.get(name)
        .ok_or_else(|| Error::Configuration(format!("{relation}: column '{name}' missing")))
}

fn int_column(row: &DbRow, relation: &str, name: &str) -> Result<i64> {
    match column(row, relation, name)? {
        DbValue::Null => Ok(0),
        value => value.as_int().ok_or_else(|| {
            Error::Configuration(format!("{relation}: column '{name}' is not an integer"))
        }),
    }
}

fn text_column(row: &DbRow, relation: &str, name: &str) -> Result<String> {
    column(row, relation, name)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::Configuration(format!("{relation}: column '{name}' is not text")))
}

fn bool_column(row: &DbRow, relation: &str, name: &str) -> Result<bool> {
    column(row, relation, name)?
        .as_bool()
        .ok_or_else(|| Error::Configuration(format!("{relation}: column '{name}' is not a boolean")))
}

/// One routable path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDef {
    /// Store-generated id
    pub id: i64,
    /// Path template with a single leading `/`
    pub path: String,
    /// Parameter group for path captures
    pub uri_params: i64,
    /// Methods group
    pub methods: i64,
}

impl Record for EndpointDef {
    const RELATION: &'static str = "endpoint";

    fn from_row(row: &DbRow) -> Result<Self> {
        let id = int_column(row, Self::RELATION, "id")?;
        let stored = text_column(row, Self::RELATION, "path")?;
        let path = normalize_path(&stored).ok_or_else(|| {
            Error::Configuration(format!("{}: path of endpoint {id} is empty", Self::RELATION))
        })?;
        Ok(Self {
            id,
            path,
            uri_params: int_column(row, Self::RELATION, "uri_params")?,
            methods: int_column(row, Self::RELATION, "methods")?,
        })
    }
}

/// One verb's configuration inside a methods group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDef {
    /// Store-generated id
    pub id: i64,
    /// Methods group this verb belongs to
    pub group_id: i64,
    /// HTTP verb
    pub verb: Method,
    /// Query parameter group
    pub query: i64,
    /// Header parameter group
    pub headers: i64,
}

impl Record for MethodDef {
    const RELATION: &'static str = "method";

    fn from_row(row: &DbRow) -> Result<Self> {
        let name = text_column(row, Self::RELATION, "name")?;
        let verb = name
            .parse::<Method>()
            .ok()
            .filter(Method::is_data_verb)
            .ok_or_else(|| Error::Configuration(format!("method: unsupported verb '{name}'")))?;

        Ok(Self {
            id: int_column(row, Self::RELATION, "id")?,
            group_id: int_column(row, Self::RELATION, "group_id")?,
            verb,
            query: int_column(row, Self::RELATION, "query")?,
            headers: int_column(row, Self::RELATION, "headers")?,
        })
    }
}

/// One named, typed input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDef {
    /// Store-generated id
    pub id: i64,
    /// Parameter group this input belongs to
    pub group_id: i64,
    /// Name as looked up in the request
    pub name: String,
    /// Declared type
    pub param_type: ParamType,
    /// Whether a missing value rejects the request
    pub required: bool,
    /// Properties group with the constraints
    pub properties: i64,
}

impl ParameterDef {
    /// Build a definition without a store row
    #[must_use]
    pub fn new(name: impl Into<String>, param_type: ParamType, required: bool) -> Self {
        Self {
            id: 0,
            group_id: 0,
            name: name.into(),
            param_type,
            required,
            properties: 0,
        }
    }

    /// Point the definition at a properties group
    #[must_use]
    pub const fn with_properties(mut self, group: i64) -> Self {
        self.properties = group;
        self
    }
}

impl Record for ParameterDef {
    const RELATION: &'static str = "parameter";

    fn from_row(row: &DbRow) -> Result<Self> {
        let name = text_column(row, Self::RELATION, "name")?;
        let type_name = text_column(row, Self::RELATION, "type")?;
        let param_type = type_name
            .parse::<ParamType>()
            .map_err(|e| Error::Configuration(format!("parameter '{name}': {e}")))?;

        Ok(Self {
            id: int_column(row, Self::RELATION, "id")?,
            group_id: int_column(row, Self::RELATION, "group_id")?,
            name,
            param_type,
            required: bool_column(row, Self::RELATION, "required")?,
            properties: int_column(row, Self::RELATION, "properties")?,
        })
    }
}

/// One raw key/value row of a properties group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRow {
    /// Properties group
    pub group_id: i64,
    /// Constraint key
    pub key: String,
    /// Constraint value
    pub value: String,
}

impl Record for PropertyRow {
    const RELATION: &'static str = "property";

    fn from_row(row: &DbRow) -> Result<Self> {
        Ok(Self {
            group_id: int_column(row, Self::RELATION, "group_id")?,
            key: text_column(row, Self::RELATION, "key")?,
            value: text_column(row, Self::RELATION, "value")?,
        })
    }
}

/// A recognized (or preserved) constraint on a parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// `enum`: comma-separated allow-list, kept with its raw form
    Enum {
        /// Allowed literals
        values: Vec<String>,
        /// Stored value, used in messages
        raw: String,
    },
    /// `items`: element type name for arrays
    ArrayItems(String),
    /// Any other key, preserved but unused
    Unrecognized {
        /// Stored key
        key: String,
        /// Stored value
        value: String,
    },
}

impl Constraint {
    /// Classify a stored key/value pair
    #[must_use]
    pub fn from_entry(key: &str, value: &str) -> Self {
        match key {
            "enum" => Self::Enum {
                values: value.split(',').map(str::to_string).collect(),
                raw: value.to_string(),
            },
            "items" => Self::ArrayItems(value.to_string()),
            _ => Self::Unrecognized {
                key: key.to_string(),
                value: value.to_string(),
            },
        }
    }

    /// Stored key
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Enum { .. } => "enum",
            Self::ArrayItems(_) => "items",
            Self::Unrecognized { key, .. } => key,
        }
    }

    /// Stored value
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Enum { raw, .. } => raw,
            Self::ArrayItems(items) => items,
            Self::Unrecognized { value, .. } => value,
        }
    }
}

/// The constraints of one properties group, one per key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyGroup {
    constraints: BTreeMap<String, Constraint>,
}

impl PropertyGroup {
    /// A group without constraints
    pub const EMPTY: Self = Self {
        constraints: BTreeMap::new(),
    };

    /// Create an empty group
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the constraint for `key`
    pub fn insert(&mut self, key: &str, value: &str) {
        self.constraints
            .insert(key.to_string(), Constraint::from_entry(key, value));
    }

    /// Builder form of [`PropertyGroup::insert`]
    #[must_use]
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.insert(key, value);
        self
    }

    /// Allow-list, if the group restricts values
    #[must_use]
    pub fn enum_values(&self) -> Option<(&[String], &str)> {
        match self.constraints.get("enum") {
            Some(Constraint::Enum { values, raw }) => Some((values, raw)),
            _ => None,
        }
    }

    /// Array element type name, if defined
    #[must_use]
    pub fn items(&self) -> Option<&str> {
        match self.constraints.get("items") {
            Some(Constraint::ArrayItems(items)) => Some(items),
            _ => None,
        }
    }

    /// Stored key/value pairs, unrecognized keys included
    #[must_use]
    pub fn entries(&self) -> BTreeMap<String, String> {
        self.constraints
            .values()
            .map(|c| (c.key().to_string(), c.value().to_string()))
            .collect()
    }

    /// Check if the group holds no constraint
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn row(pairs: &[(&str, DbValue)]) -> DbRow {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect::<HashMap<_, _>>()
    }

    #[test]
    fn test_group_defined() {
        assert!(group_defined(3));
        assert!(!group_defined(0));
        assert!(!group_defined(-1));
    }

    #[test]
    fn test_endpoint_from_row() {
        let endpoint = EndpointDef::from_row(&row(&[
            ("id", DbValue::Int(4)),
            ("path", DbValue::String("/grid".into())),
            ("uri_params", DbValue::Null),
            ("methods", DbValue::Int(2)),
        ]))
        .unwrap();

        assert_eq!(endpoint.id, 4);
        assert_eq!(endpoint.uri_params, 0);
        assert_eq!(endpoint.methods, 2);
    }

    #[test]
    fn test_endpoint_path_is_canonicalized() {
        let endpoint = EndpointDef::from_row(&row(&[
            ("id", DbValue::Int(5)),
            ("path", DbValue::String(" grid/{x}/ ".into())),
            ("uri_params", DbValue::Int(0)),
            ("methods", DbValue::Int(0)),
        ]))
        .unwrap();
        assert_eq!(endpoint.path, "/grid/{x}");

        let empty = EndpointDef::from_row(&row(&[
            ("id", DbValue::Int(6)),
            ("path", DbValue::String("/".into())),
            ("uri_params", DbValue::Int(0)),
            ("methods", DbValue::Int(0)),
        ]));
        assert!(matches!(empty, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_method_verb_is_case_normalized() {
        let method = MethodDef::from_row(&row(&[
            ("id", DbValue::Int(1)),
            ("group_id", DbValue::Int(1)),
            ("name", DbValue::String("post".into())),
            ("query", DbValue::Int(0)),
            ("headers", DbValue::Int(0)),
        ]))
        .unwrap();
        assert_eq!(method.verb, Method::Post);
    }

    #[test]
    fn test_method_rejects_options_row() {
        let result = MethodDef::from_row(&row(&[
            ("id", DbValue::Int(1)),
            ("group_id", DbValue::Int(1)),
            ("name", DbValue::String("OPTIONS".into())),
            ("query", DbValue::Int(0)),
            ("headers", DbValue::Int(0)),
        ]));
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_parameter_unknown_type_is_configuration_error() {
        let result = ParameterDef::from_row(&row(&[
            ("id", DbValue::Int(1)),
            ("group_id", DbValue::Int(1)),
            ("name", DbValue::String("size".into())),
            ("type", DbValue::String("number".into())),
            ("required", DbValue::Int(1)),
            ("properties", DbValue::Int(0)),
        ]));
        match result {
            Err(Error::Configuration(message)) => assert!(message.contains("size")),
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_column() {
        let result = PropertyRow::from_row(&row(&[("group_id", DbValue::Int(1))]));
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_property_group_constraints() {
        let group = PropertyGroup::new()
            .with("enum", "a,b,c")
            .with("items", "integer")
            .with("format", "uuid");

        let (values, raw) = group.enum_values().unwrap();
        assert_eq!(values, ["a", "b", "c"]);
        assert_eq!(raw, "a,b,c");
        assert_eq!(group.items(), Some("integer"));
        assert_eq!(group.entries().get("format").map(String::as_str), Some("uuid"));
        assert_eq!(
            Constraint::from_entry("format", "uuid"),
            Constraint::Unrecognized {
                key: "format".into(),
                value: "uuid".into(),
            }
        );
    }
}
