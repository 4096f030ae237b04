//! # JSON Module
//!
//! Request bodies are parsed with simd-json, responses written with serde_json.
//!
//! ## Design Principles (SOLID)
//!
//! - **S**: Only handles JSON serialization/deserialization
//! - **D**: Depends on serde abstractions, not concrete parsers

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Parse a request body into a typed value
///
/// # Errors
///
/// Returns `Error::BadRequest` naming the parse failure.
pub fn parse_json<T: DeserializeOwned>(json_str: &str) -> Result<T> {
    let mut bytes = json_str.as_bytes().to_vec();
    parse_json_bytes(&mut bytes)
}

/// Parse JSON bytes in place
///
/// # Errors
///
/// Returns `Error::BadRequest` naming the parse failure.
pub fn parse_json_bytes<T: DeserializeOwned>(bytes: &mut [u8]) -> Result<T> {
    simd_json::from_slice(bytes).map_err(|e| Error::BadRequest(format!("invalid JSON body: {e}")))
}

/// Serialize a response value
///
/// # Errors
///
/// Returns `Error::Json` if the value cannot be represented.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Groups {
        #[serde(default)]
        query: i64,
        #[serde(default)]
        headers: i64,
    }

    #[test]
    fn test_parse_json_object() {
        let groups: Groups = parse_json(r#"{"query": 3, "headers": 7}"#).unwrap();
        assert_eq!(groups, Groups { query: 3, headers: 7 });
    }

    #[test]
    fn test_parse_json_defaults() {
        let groups: Groups = parse_json(r#"{"query": 2}"#).unwrap();
        assert_eq!(groups.headers, 0);
    }

    #[test]
    fn test_parse_json_bytes() {
        let mut bytes = br#"{"headers": 4}"#.to_vec();
        let groups: Groups = parse_json_bytes(&mut bytes).unwrap();
        assert_eq!(groups.headers, 4);
    }

    #[test]
    fn test_to_json_is_ordered() {
        let mut map = BTreeMap::new();
        map.insert("/b", 2);
        map.insert("/a", 1);
        assert_eq!(to_json(&map).unwrap(), r#"{"/a":1,"/b":2}"#);
    }

    #[test]
    fn test_invalid_json() {
        let result: Result<Groups> = parse_json("not valid json");
        assert!(matches!(result, Err(Error::BadRequest(_))));
    }
}
