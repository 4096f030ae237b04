//! # Endpoint Guard
//!
//! Validation in front of every data-driven route. For the matched endpoint
//! and verb, each source (uri, headers, query) is resolved against its
//! parameter group and run through the [validator](crate::validator).
//!
//! ## Rules
//!
//! - The verb is looked up in the endpoint's *current* methods group, so a
//!   verb registered at runtime is guarded without rebuilding anything here.
//! - Sources are evaluated in [`Source::ORDER`]; the first failing source
//!   decides the response and later sources are not examined.
//! - An empty value counts as missing.
//! - Missing required parameters win over conversion issues of the same source.

use crate::context::{Source, ValidatedParams};
use crate::error::{Error, Result};
use crate::registry::RegistryData;
use crate::request::HttpRequest;
use crate::router::Method;
use crate::validation::ValidationErrors;
use crate::validator::validate;
use std::collections::HashMap;
use tracing::debug;

/// Guard bound to one endpoint route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointGuard {
    /// Guarded endpoint
    pub endpoint_id: i64,
    /// Canonical path template
    pub path: String,
}

impl EndpointGuard {
    /// Create a guard for an endpoint
    pub fn new(endpoint_id: i64, path: impl Into<String>) -> Self {
        Self {
            endpoint_id,
            path: path.into(),
        }
    }

    /// Validate a matched request
    ///
    /// # Errors
    ///
    /// `NotFound` when the endpoint or verb is no longer defined,
    /// `BadRequest` for missing or invalid values, `Configuration` when the
    /// stored definition of a parameter is unusable.
    pub fn check(
        &self,
        data: &RegistryData,
        method: Method,
        req: &HttpRequest,
        uri: &HashMap<String, String>,
    ) -> Result<ValidatedParams> {
        let endpoint = data.require_endpoint(self.endpoint_id)?;
        let method_def = data.method(endpoint.methods, method).ok_or_else(|| {
            Error::NotFound(format!("method {method} not defined for this path"))
        })?;

        let mut validated = ValidatedParams::default();
        for source in Source::ORDER {
            let group = match source {
                Source::Uri => endpoint.uri_params,
                Source::Headers => method_def.headers,
                Source::Query => method_def.query,
            };
            check_source(data, source, group, req, uri, &mut validated)?;
        }

        debug!(
            endpoint_id = self.endpoint_id,
            method = %method,
            uri = validated.uri.len(),
            headers = validated.headers.len(),
            query = validated.query.len(),
            "Request validated"
        );
        Ok(validated)
    }
}

fn lookup<'r>(
    source: Source,
    req: &'r HttpRequest,
    uri: &'r HashMap<String, String>,
    name: &str,
) -> Option<&'r str> {
    match source {
        Source::Uri => uri.get(name).map(String::as_str),
        Source::Headers => req.header(name),
        Source::Query => req.query(name),
    }
}

fn check_source(
    data: &RegistryData,
    source: Source,
    group: i64,
    req: &HttpRequest,
    uri: &HashMap<String, String>,
    validated: &mut ValidatedParams,
) -> Result<()> {
    let mut errors = ValidationErrors::new();

    for param in data.parameters(group) {
        let Some(raw) = lookup(source, req, uri, &param.name).filter(|v| !v.is_empty()) else {
            if param.required {
                errors.add_required(param.name.as_str());
            }
            continue;
        };

        match validate(param, data.properties(param.properties), raw) {
            Ok(value) => {
                validated
                    .source_mut(source)
                    .insert(param.name.to_lowercase(), value);
            }
            Err(err) => errors.add(err),
        }
    }

    if errors.is_empty() {
        return Ok(());
    }

    let missing = errors.missing();
    if !missing.is_empty() {
        return Err(Error::BadRequest(format!(
            "{source}: {} must be provided",
            missing.join(", ")
        )));
    }
    if errors.has_misconfiguration() {
        return Err(Error::Configuration(format!(
            "{source}: {}",
            errors.issue_message()
        )));
    }
    Err(Error::BadRequest(format!("{source}: {}", errors.issue_message())))
}
