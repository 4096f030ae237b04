//! # Factory Core
//!
//! Metadata-driven HTTP route catalog.
//! Endpoint, method, parameter and property definitions are loaded from a
//! relational store at startup, the route table is built from them at
//! runtime, and every request is validated against the same metadata before
//! it reaches its handler.
//!
//! ## Architecture
//!
//! store → [`Registry`] → [`catalog`] → [`Router`]. Per request: router →
//! [`EndpointGuard`] (consults the registry) → dispatcher, or early rejection.
//!
//! ## Modules
//!
//! - `database` - SQLx metadata store access (SQLite, PostgreSQL)
//! - `model` - Typed records and the constraint bag
//! - `registry` - In-memory metadata graph with append-only mutations
//! - `types` - Parameter types and converted values
//! - `validation` - Structured validation errors
//! - `validator` - Single-value validation against a parameter definition
//! - `guard` - Per-endpoint request validation
//! - `context` - Request-scoped validated data
//! - `router` - Radix-trie routing using matchit
//! - `route` - Route metadata and path canonicalization
//! - `catalog` - Routing table built from the registry
//! - `system` - Introspection and mutation routes
//! - `handler` - Dispatcher type and the default echo dispatcher
//! - `request` / `response` - HTTP wrappers and the response envelope
//! - `middleware` - Correlation ids and request logging
//! - `server` - HTTP server built on Hyper
//! - `state` - Shared application state
//! - `config` - Server and store settings
//! - `json` - JSON parsing with simd-json
//! - `error` - Error types and handling

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod catalog;
pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod guard;
pub mod handler;
pub mod json;
pub mod middleware;
pub mod model;
pub mod registry;
pub mod request;
pub mod response;
pub mod route;
pub mod router;
pub mod server;
pub mod state;
pub mod system;
pub mod types;
pub mod validation;
pub mod validator;

pub use catalog::{Catalog, RouteTarget};
pub use config::{ServerConfig, StoreConfig};
pub use context::{RequestContext, Source, ValidatedParams};
pub use database::{DatabasePool, DbTransaction, DbValue};
pub use error::{Error, Result};
pub use guard::EndpointGuard;
pub use handler::{echo_handler, handler, Handler};
pub use json::{parse_json, to_json};
pub use middleware::{CorrelationMiddleware, LoggingMiddleware, Middleware, MiddlewareChain};
pub use model::{Constraint, EndpointDef, MethodDef, ParameterDef, PropertyGroup, PropertyRow};
pub use registry::{Registry, RegistryData};
pub use request::HttpRequest;
pub use response::{Envelope, HttpResponse};
pub use route::RouteInfo;
pub use router::{Method, Router};
pub use server::Server;
pub use state::AppState;
pub use system::SystemRoute;
pub use types::{ParamType, ParamValue};
pub use validation::{FieldError, ValidationCode, ValidationErrors, ValidationResult};
pub use validator::validate;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, "0.1.0");
    }
}
