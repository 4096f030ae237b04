//! # Middleware System
//!
//! Request/response interception around routing: correlation ids and
//! structured request logging.
//!
//! ## Design Principles (SOLID)
//!
//! - **S**: Each middleware has a single responsibility
//! - **O**: Extensible via Middleware trait
//! - **D**: Server depends on abstract trait, not concrete implementations

use crate::request::HttpRequest;
use crate::response::{HttpResponse, CORRELATION_HEADER};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Middleware trait for request/response interception
///
/// Middlewares are called in order before routing, and in reverse order after.
pub trait Middleware: Send + Sync {
    /// Called before the request is routed
    ///
    /// Can modify the request or return early with a response.
    fn before_request(&self, _req: &mut HttpRequest) -> MiddlewareResult {
        MiddlewareResult::Continue
    }

    /// Called after the response is produced
    fn after_response(&self, _req: &HttpRequest, _res: &mut HttpResponse) {}

    /// Middleware name for logging
    fn name(&self) -> &'static str {
        "Unknown"
    }
}

/// Result of middleware execution
#[derive(Debug)]
pub enum MiddlewareResult {
    /// Continue to next middleware/handler
    Continue,
    /// Short-circuit with this response (skip routing)
    Respond(HttpResponse),
}

/// Middleware chain for processing requests
#[derive(Default, Clone)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    /// Create a new empty middleware chain
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a middleware to the chain
    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) {
        debug!(middleware = middleware.name(), "Middleware added");
        self.middlewares.push(Arc::new(middleware));
    }

    /// Execute `before_request` for all middlewares
    pub fn run_before(&self, req: &mut HttpRequest) -> MiddlewareResult {
        for mw in &self.middlewares {
            match mw.before_request(req) {
                MiddlewareResult::Continue => continue,
                result => return result,
            }
        }
        MiddlewareResult::Continue
    }

    /// Execute `after_response` for all middlewares (in reverse order)
    pub fn run_after(&self, req: &HttpRequest, res: &mut HttpResponse) {
        for mw in self.middlewares.iter().rev() {
            mw.after_response(req, res);
        }
    }

    /// Get the number of middlewares
    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Check if chain is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }
}

/// Propagates `X-Correlation-ID`, generating one when the caller sent none
#[derive(Debug, Default)]
pub struct CorrelationMiddleware;

impl Middleware for CorrelationMiddleware {
    fn before_request(&self, req: &mut HttpRequest) -> MiddlewareResult {
        let missing = req
            .header(CORRELATION_HEADER)
            .map_or(true, |id| id.trim().is_empty());
        if missing {
            req.set_header(CORRELATION_HEADER, &generate_request_id());
        }
        MiddlewareResult::Continue
    }

    fn after_response(&self, req: &HttpRequest, res: &mut HttpResponse) {
        if let Some(id) = req.header(CORRELATION_HEADER) {
            res.set_header(CORRELATION_HEADER, id);
        }
    }

    fn name(&self) -> &'static str {
        "CorrelationMiddleware"
    }
}

/// Logging middleware - logs requests in structured JSON format
#[derive(Debug, Default)]
pub struct LoggingMiddleware;

impl LoggingMiddleware {
    /// Create a new logging middleware
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for LoggingMiddleware {
    fn before_request(&self, req: &mut HttpRequest) -> MiddlewareResult {
        let correlation_id = req.header(CORRELATION_HEADER).unwrap_or("-");
        info!(
            method = %req.method,
            path = %req.path,
            query = req.query_string().unwrap_or_default(),
            correlation_id = %correlation_id,
            "Request received"
        );
        MiddlewareResult::Continue
    }

    fn after_response(&self, req: &HttpRequest, res: &mut HttpResponse) {
        let correlation_id = req.header(CORRELATION_HEADER).unwrap_or("-");
        info!(
            method = %req.method,
            path = %req.path,
            status = res.status,
            correlation_id = %correlation_id,
            "Response sent"
        );
    }

    fn name(&self) -> &'static str {
        "LoggingMiddleware"
    }
}

static REQUEST_COUNTER: AtomicUsize = AtomicUsize::new(1);

/// Process-unique request id: nanosecond clock plus a counter, both hex
#[must_use]
pub fn generate_request_id() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let counter = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{:x}-{:x}", now.as_nanos(), counter)
}
