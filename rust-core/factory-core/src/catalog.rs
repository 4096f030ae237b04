//! # Catalog Builder
//!
//! Turns the registry into a routing table: the `/system` routes, one guarded
//! route per endpoint path and verb, and a synthesized `OPTIONS` responder per
//! endpoint.
//!
//! The catalog is immutable once built. Mutations rebuild it from the registry
//! and swap it in whole (see [`AppState::rebuild_catalog`](crate::state::AppState::rebuild_catalog)).

use crate::error::{Error, Result};
use crate::guard::EndpointGuard;
use crate::registry::RegistryData;
use crate::route::capture_names;
use crate::router::{Method, Router};
use crate::system::{self, SystemRoute};
use tracing::{debug, warn};

/// What a catalog route points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    /// Guarded data-driven endpoint
    Endpoint(EndpointGuard),
    /// Synthesized `OPTIONS` answer with a fixed `Allow` value
    Options {
        /// Verbs joined with `, `
        allow: String,
    },
    /// Introspection or mutation handler
    System(SystemRoute),
}

/// Routing table of the running service
pub type Catalog = Router<RouteTarget>;

/// Build the catalog from the current registry contents
///
/// # Errors
///
/// Returns `Error::Configuration` when a stored path is not a valid template
/// or conflicts with another route.
pub fn build(data: &RegistryData) -> Result<Catalog> {
    let mut catalog = Catalog::new();
    system::mount(&mut catalog)?;

    for endpoint in data.endpoints() {
        let verbs = data.verbs(endpoint.methods);
        let guard = EndpointGuard::new(endpoint.id, endpoint.path.as_str());
        let mount_error = |e: Error| {
            Error::Configuration(format!("endpoint {} ({}): {e}", endpoint.id, endpoint.path))
        };

        for verb in &verbs {
            catalog
                .add_route(*verb, &endpoint.path, RouteTarget::Endpoint(guard.clone()))
                .map_err(mount_error)?;
        }
        let allow = verbs
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        catalog
            .add_route(Method::Options, &endpoint.path, RouteTarget::Options { allow })
            .map_err(mount_error)?;

        let captured = capture_names(&endpoint.path);
        for param in data.parameters(endpoint.uri_params) {
            if !captured.contains(&param.name) {
                warn!(
                    endpoint_id = endpoint.id,
                    path = %endpoint.path,
                    parameter = %param.name,
                    "URI parameter is not captured by the path"
                );
            }
        }
    }

    debug!(routes = catalog.len(), "Catalog built");
    Ok(catalog)
}

/// Check that a new endpoint path can be routed next to `catalog`
///
/// # Errors
///
/// `BadRequest` for a malformed template, `Conflict` when it clashes with an
/// existing route.
pub fn check_path(catalog: &Catalog, path: &str) -> Result<()> {
    Catalog::new()
        .check_insert(path)
        .map_err(|e| Error::BadRequest(format!("invalid endpoint path {path}: {}", reason(&e))))?;
    catalog.check_insert(path).map_err(|e| {
        Error::Conflict(format!(
            "endpoint {path} conflicts with an existing route: {}",
            reason(&e)
        ))
    })
}

fn reason(err: &Error) -> String {
    match err {
        Error::InvalidRoutePattern { reason, .. } => reason.clone(),
        other => other.to_string(),
    }
}
