//! # Request Context
//!
//! Request-scoped data handed from the guard to the dispatcher.

use crate::router::Method;
use crate::types::ParamValue;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Converted values of one source, keyed by lower-cased parameter name
pub type Entries = BTreeMap<String, ParamValue>;

/// Where a parameter value is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Path captures
    Uri,
    /// Request headers
    Headers,
    /// Query string
    Query,
}

impl Source {
    /// Evaluation order
    pub const ORDER: [Self; 3] = [Self::Uri, Self::Headers, Self::Query];

    /// Prefix used in rejection messages
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Uri => "uri parameters",
            Self::Headers => "headers",
            Self::Query => "query parameters",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Validated values of all three sources
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidatedParams {
    /// Path captures
    pub uri: Entries,
    /// Headers
    pub headers: Entries,
    /// Query string
    pub query: Entries,
}

impl ValidatedParams {
    /// Mutable map of one source
    pub fn source_mut(&mut self, source: Source) -> &mut Entries {
        match source {
            Source::Uri => &mut self.uri,
            Source::Headers => &mut self.headers,
            Source::Query => &mut self.query,
        }
    }

    /// Map of one source
    #[must_use]
    pub const fn source(&self, source: Source) -> &Entries {
        match source {
            Source::Uri => &self.uri,
            Source::Headers => &self.headers,
            Source::Query => &self.query,
        }
    }
}

/// Everything the dispatcher learns about a guarded request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    /// Correlation id echoed on the response
    pub correlation_id: String,
    /// Matched endpoint
    pub endpoint_id: i64,
    /// Matched verb
    #[serde(serialize_with = "serialize_method")]
    pub method: Method,
    /// Validated parameters
    pub params: ValidatedParams,
}

fn serialize_method<S: serde::Serializer>(
    method: &Method,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(method.as_str())
}
