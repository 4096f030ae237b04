//! # HTTP Response
//!
//! Response value produced by handlers, plus the `{id, code, message}`
//! envelope used for errors and mutation acknowledgements.

use crate::error::Error;
use crate::json::to_json;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::error;

/// Header carrying the request correlation id
pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// Outgoing HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
    /// Content type
    pub content_type: String,
    /// Response headers, lower-cased names
    pub headers: BTreeMap<String, String>,
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self {
            status: 200,
            body: String::new(),
            content_type: "application/json".to_string(),
            headers: BTreeMap::new(),
        }
    }
}

/// Body of error responses and mutation acknowledgements
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Envelope {
    /// Correlation id of the request
    pub id: String,
    /// HTTP status code
    pub code: u16,
    /// Human-readable outcome
    pub message: String,
}

impl HttpResponse {
    /// Create a JSON response from an already serialized body
    #[must_use]
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    /// Serialize `value` into a 200 JSON response
    #[must_use]
    pub fn json_value<T: Serialize>(value: &T) -> Self {
        match to_json(value) {
            Ok(body) => Self::json(body),
            Err(e) => {
                error!(error = %e, "Failed to serialize response body");
                Self::text("Internal Server Error").with_status(500)
            }
        }
    }

    /// Create a text response
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: "text/plain".to_string(),
            ..Self::default()
        }
    }

    /// Empty 204 response
    #[must_use]
    pub fn no_content() -> Self {
        Self {
            status: 204,
            body: String::new(),
            content_type: String::new(),
            headers: BTreeMap::new(),
        }
    }

    /// Envelope response with the given status
    #[must_use]
    pub fn envelope(correlation_id: &str, status: u16, message: impl Into<String>) -> Self {
        let envelope = Envelope {
            id: correlation_id.to_string(),
            code: status,
            message: message.into(),
        };
        Self::json_value(&envelope).with_status(status)
    }

    /// Envelope response for an error; 405 carries the `Allow` header
    #[must_use]
    pub fn from_error(correlation_id: &str, err: &Error) -> Self {
        let response = Self::envelope(correlation_id, err.status(), err.public_message());
        match err {
            Error::MethodNotAllowed { allowed, .. } => response.with_header("Allow", allowed),
            _ => response,
        }
    }

    /// Set status code
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Set a header
    #[must_use]
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.set_header(key, value);
        self
    }

    /// Set or override a header
    pub fn set_header(&mut self, key: &str, value: &str) {
        if key.eq_ignore_ascii_case("content-type") {
            self.content_type = value.to_string();
        } else {
            self.headers
                .insert(key.to_ascii_lowercase(), value.to_string());
        }
    }

    /// Header value by name (case-insensitive)
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Convert to a hyper response
    #[must_use]
    pub fn into_hyper(self) -> Response<Full<Bytes>> {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut builder = Response::builder().status(status);
        if !self.content_type.is_empty() {
            builder = builder.header("Content-Type", &self.content_type);
        }
        for (k, v) in &self.headers {
            builder = builder.header(k.as_str(), v.as_str());
        }

        builder
            .body(Full::new(Bytes::from(self.body)))
            .unwrap_or_else(|e| {
                error!(error = %e, "Invalid response parts");
                let mut fallback = Response::new(Full::new(Bytes::from("Internal Server Error")));
                *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                fallback
            })
    }
}
