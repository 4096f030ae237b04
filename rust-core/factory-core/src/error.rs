//! # Error Handling
//!
//! Centralized error types for Factory core.
//! Uses `thiserror` for ergonomic error definitions.
//!
//! Every variant maps onto an HTTP status class via [`Error::status`], and onto a
//! caller-safe message via [`Error::public_message`]. Store and transport
//! failures are logged with their full detail but answered generically.

use thiserror::Error;

/// Result type alias for Factory operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the Factory runtime
#[derive(Error, Debug)]
pub enum Error {
    /// Server failed to bind to the specified address
    #[error("Failed to bind server to {address}: {source}")]
    BindError {
        /// The address we tried to bind to
        address: String,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Router failed to match the requested path
    #[error("No route found for path: {path}")]
    RouteNotFound {
        /// The path that wasn't matched
        path: String,
    },

    /// The path exists but not for the requested verb
    #[error("Method {method} not allowed for path: {path}")]
    MethodNotAllowed {
        /// The requested verb
        method: String,
        /// The matched path
        path: String,
        /// Verbs the path does answer, joined with ", "
        allowed: String,
    },

    /// Invalid route pattern provided
    #[error("Invalid route pattern: {pattern}: {reason}")]
    InvalidRoutePattern {
        /// The invalid pattern
        pattern: String,
        /// Reason for invalidity
        reason: String,
    },

    /// The caller sent something the catalog rejects
    #[error("{0}")]
    BadRequest(String),

    /// A referenced endpoint, method or group does not exist
    #[error("{0}")]
    NotFound(String),

    /// The write would duplicate an existing path or verb
    #[error("{0}")]
    Conflict(String),

    /// Stored metadata or process configuration is inconsistent
    #[error("configuration error: {0}")]
    Configuration(String),

    /// HTTP protocol error
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Database error
    #[error("Database error: {message}")]
    Database {
        /// Error message from database
        message: String,
    },

    /// Request payload too large
    #[error("Payload too large: limit={limit} bytes, received at least {actual} bytes")]
    PayloadTooLarge {
        /// Max allowed size
        limit: usize,
        /// Declared size, or a lower bound when the body was cut off while streaming
        actual: usize,
    },
}

impl Error {
    /// HTTP status code this error is answered with
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::BadRequest(_) | Self::InvalidRoutePattern { .. } => 400,
            Self::RouteNotFound { .. } | Self::NotFound(_) => 404,
            Self::MethodNotAllowed { .. } => 405,
            Self::Conflict(_) => 409,
            Self::PayloadTooLarge { .. } => 413,
            Self::Database { .. } => 503,
            Self::Configuration(_)
            | Self::BindError { .. }
            | Self::Http(_)
            | Self::Json(_)
            | Self::Io(_) => 500,
        }
    }

    /// Message that is safe to return to the caller
    ///
    /// Driver and transport errors never leak; configuration errors are
    /// reported since they describe the stored metadata, not the host.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Database { .. } => "metadata store unavailable".to_string(),
            Self::BindError { .. } | Self::Http(_) | Self::Json(_) | Self::Io(_) => {
                "Internal Server Error".to_string()
            }
            Self::RouteNotFound { .. } => "Not Found".to_string(),
            other => other.to_string(),
        }
    }

    /// Wrap a driver error, keeping the detail for the logs only
    pub(crate) fn database(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Database {
            message: format!("{context}: {err}"),
        }
    }
}
