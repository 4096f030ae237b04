//! # HTTP Request
//!
//! Request wrapper with the body collected once and the query string parsed
//! up front.
//!
//! ## Design Principles (SOLID)
//!
//! - **S**: Request only handles request data, not response
//! - **D**: Handlers and the guard never see hyper types

use crate::error::{Error, Result};
use crate::router::Method;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderName, HeaderValue};
use hyper::Request;
use std::collections::HashMap;

/// Incoming HTTP request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Request path (without query string)
    pub path: String,
    query_string: Option<String>,
    query_params: HashMap<String, String>,
    headers: hyper::HeaderMap,
    body: Option<Bytes>,
}

impl HttpRequest {
    /// Build a request by hand; `path` may carry a query string
    pub fn new(
        method: Method,
        path: impl Into<String>,
        headers_map: HashMap<String, String>,
        body: Option<Bytes>,
    ) -> Self {
        let path = path.into();
        let (path, query_string) = match path.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (path, None),
        };

        let mut headers = hyper::HeaderMap::new();
        for (k, v) in headers_map {
            if let (Ok(n), Ok(v)) = (
                HeaderName::from_bytes(k.as_bytes()),
                HeaderValue::from_str(&v),
            ) {
                headers.insert(n, v);
            }
        }

        Self {
            method,
            path,
            query_params: parse_query_string(query_string.as_deref()),
            query_string,
            headers,
            body,
        }
    }

    /// Create from a hyper request, rejecting bodies over `max_body_size`
    ///
    /// # Errors
    ///
    /// `BadRequest` for verbs the catalog cannot route, `PayloadTooLarge` when
    /// the declared or actual body exceeds the limit.
    pub async fn from_hyper_with_limit(
        req: Request<hyper::body::Incoming>,
        max_body_size: usize,
    ) -> Result<Self> {
        let method = req.method().as_str().parse::<Method>()?;

        let uri = req.uri();
        let path = uri.path().to_string();
        let query_string = uri.query().map(String::from);
        let query_params = parse_query_string(query_string.as_deref());

        let headers = req.headers().clone();
        let declared = headers
            .get(hyper::header::CONTENT_LENGTH)
            .and_then(|len| len.to_str().ok())
            .and_then(|len| len.parse::<usize>().ok());
        if let Some(actual) = declared.filter(|len| *len > max_body_size) {
            return Err(Error::PayloadTooLarge {
                limit: max_body_size,
                actual,
            });
        }

        let body = collect_limited(req.into_body(), max_body_size).await?;

        Ok(Self {
            method,
            path,
            query_string,
            query_params,
            headers,
            body,
        })
    }

    /// Header value by name (case-insensitive); non-UTF-8 values read as absent
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Set or override a header
    pub fn set_header(&mut self, name: &str, value: &str) {
        if let (Ok(n), Ok(v)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(n, v);
        }
    }

    /// Query parameter by exact name
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    /// Raw query string
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.query_string.as_deref()
    }

    /// Replace the routed path
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    /// Request body bytes
    #[must_use]
    pub fn body_bytes(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Request body as UTF-8 text
    #[must_use]
    pub fn body_str(&self) -> Option<&str> {
        self.body_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }
}

/// Collect a body, giving up as soon as it grows past `max_body_size`
///
/// A body that fails to arrive for any other reason reads as absent.
async fn collect_limited<B>(body: B, max_body_size: usize) -> Result<Option<Bytes>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, max_body_size).collect().await {
        Ok(collected) => Ok(Some(collected.to_bytes())),
        Err(err) if err.is::<LengthLimitError>() => Err(Error::PayloadTooLarge {
            limit: max_body_size,
            actual: max_body_size.saturating_add(1),
        }),
        Err(_) => Ok(None),
    }
}

/// Parse a query string; on duplicate keys the first value wins
fn parse_query_string(query: Option<&str>) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in query.unwrap_or_default().split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params
            .entry(url_decode(key))
            .or_insert_with(|| url_decode(value));
    }
    params
}

/// Query-string decoding: `+` is a space, then percent escapes
fn url_decode(s: &str) -> String {
    decode(s, true)
}

/// Decode percent escapes in a captured path segment; `+` stays literal
#[must_use]
pub fn percent_decode(segment: &str) -> String {
    if segment.contains('%') {
        decode(segment, false)
    } else {
        segment.to_string()
    }
}

/// Malformed escapes are kept literally
fn decode(s: &str, plus_as_space: bool) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' if plus_as_space => out.push(b' '),
            b'%' => {
                let decoded = bytes
                    .get(i + 1..i + 3)
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                if let Some(byte) = decoded {
                    out.push(byte);
                    i += 2;
                } else {
                    out.push(b'%');
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
