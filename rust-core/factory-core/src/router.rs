//! # High-Performance Router
//!
//! Radix-trie based router using `matchit` for O(log n) route matching.
//!
//! ## Features
//!
//! - Path parameter extraction (`/grid/{x}/{y}`)
//! - Per-verb tries so `405` can be told apart from `404`
//! - Generic route targets: the catalog decides what a route points at
//!
//! ## SOLID Principles
//!
//! - **S**: Router only handles routing, validation is done by the guard
//! - **O**: Any target type can be routed without modifying Router

use crate::error::{Error, Result};
use crate::request::percent_decode;
use crate::route::RouteInfo;
use matchit::Router as MatchitRouter;
use std::collections::HashMap;
use std::str::FromStr;

/// HTTP methods supported by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    /// HTTP GET
    Get,
    /// HTTP POST
    Post,
    /// HTTP PUT
    Put,
    /// HTTP DELETE
    Delete,
    /// HTTP PATCH
    Patch,
    /// HTTP HEAD
    Head,
    /// HTTP OPTIONS
    Options,
}

impl Method {
    /// Verbs that stored method rows may configure
    pub const DATA_VERBS: [Self; 5] = [Self::Get, Self::Post, Self::Put, Self::Delete, Self::Patch];

    /// Upper-case verb name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    /// Whether the verb can be configured through stored metadata
    #[must_use]
    pub fn is_data_verb(&self) -> bool {
        Self::DATA_VERBS.contains(self)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    /// Parse a verb name, case-insensitively
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "PATCH" => Ok(Self::Patch),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            other => Err(Error::BadRequest(format!("unsupported method {other}"))),
        }
    }
}

/// Matched route with extracted path parameters
#[derive(Debug)]
pub struct Match<'a, T> {
    /// What the route points at
    pub target: &'a T,
    /// Original path template the route was registered with
    pub pattern: &'a str,
    /// Captured path parameters, percent-decoded
    pub params: HashMap<String, String>,
}

/// Per-method storage for routes
#[derive(Clone)]
struct MethodRoutes<T> {
    /// Matchit router for path matching, values index into `routes`
    router: MatchitRouter<usize>,
    /// Route metadata in registration order
    routes: Vec<RouteInfo<T>>,
}

impl<T> MethodRoutes<T> {
    fn new() -> Self {
        Self {
            router: MatchitRouter::new(),
            routes: Vec::new(),
        }
    }
}

/// HTTP router using radix tries, one per verb
#[derive(Clone)]
pub struct Router<T> {
    /// Per-method routers for efficient matching
    method_routes: HashMap<Method, MethodRoutes<T>>,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Router<T> {
    /// Create a new empty router
    #[must_use]
    pub fn new() -> Self {
        Self {
            method_routes: HashMap::new(),
        }
    }

    /// Register a route with the given method and path template
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if the template is malformed or
    /// conflicts with an already registered template for the same verb.
    pub fn add_route(&mut self, method: Method, path: &str, target: T) -> Result<()> {
        let route_info = RouteInfo::new(path, target);

        let method_routes = self
            .method_routes
            .entry(method)
            .or_insert_with(MethodRoutes::new);

        let index = method_routes.routes.len();
        method_routes
            .router
            .insert(route_info.path_pattern.as_str(), index)
            .map_err(|e| Error::InvalidRoutePattern {
                pattern: path.to_string(),
                reason: e.to_string(),
            })?;

        method_routes.routes.push(route_info);
        Ok(())
    }

    /// Check that `path` could be added for any verb without touching the router
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if the template is malformed or
    /// conflicts with a template already registered for some verb.
    pub fn check_insert(&self, path: &str) -> Result<()> {
        let conflict = |e: matchit::InsertError| Error::InvalidRoutePattern {
            pattern: path.to_string(),
            reason: e.to_string(),
        };

        MatchitRouter::new().insert(path, 0).map_err(conflict)?;
        for routes in self.method_routes.values() {
            let mut probe = routes.router.clone();
            probe.insert(path, usize::MAX).map_err(conflict)?;
        }
        Ok(())
    }

    /// Match a request path against registered routes
    ///
    /// # Errors
    ///
    /// Returns `Error::MethodNotAllowed` if the path is routed for other verbs
    /// only, and `Error::RouteNotFound` if no route matches at all.
    pub fn match_route(&self, method: Method, path: &str) -> Result<Match<'_, T>> {
        let matched = self
            .method_routes
            .get(&method)
            .and_then(|routes| routes.router.at(path).ok().map(|m| (routes, m)));

        let Some((method_routes, matched)) = matched else {
            let allowed = self.allowed_methods(path);
            if allowed.is_empty() {
                return Err(Error::RouteNotFound {
                    path: path.to_string(),
                });
            }
            return Err(Error::MethodNotAllowed {
                method: method.to_string(),
                path: path.to_string(),
                allowed: allowed
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        };

        let route_info = &method_routes.routes[*matched.value];
        let params = matched
            .params
            .iter()
            .map(|(k, v)| (k.to_string(), percent_decode(v)))
            .collect();

        Ok(Match {
            target: &route_info.target,
            pattern: &route_info.path_pattern,
            params,
        })
    }

    /// Verbs that have a route matching `path`, sorted
    #[must_use]
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let mut allowed: Vec<Method> = self
            .method_routes
            .iter()
            .filter(|(_, routes)| routes.router.at(path).is_ok())
            .map(|(method, _)| *method)
            .collect();
        allowed.sort();
        allowed
    }

    /// Number of registered routes across all verbs
    #[must_use]
    pub fn len(&self) -> usize {
        self.method_routes.values().map(|r| r.routes.len()).sum()
    }

    /// Check if no route is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convenience method to add a GET route
    pub fn get(&mut self, path: &str, target: T) -> Result<()> {
        self.add_route(Method::Get, path, target)
    }

    /// Convenience method to add a POST route
    pub fn post(&mut self, path: &str, target: T) -> Result<()> {
        self.add_route(Method::Post, path, target)
    }
}
