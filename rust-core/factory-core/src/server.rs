//! # HTTP Server
//!
//! HTTP server built on Hyper and Tokio, routing through the live catalog.
//!
//! ## Key Features
//!
//! - Async request handling with Tokio runtime, one task per connection
//! - Graceful shutdown on Ctrl-C with a bounded drain
//! - Trailing slashes stripped before routing
//! - Every response carries `X-Correlation-ID`
//!
//! Registry and catalog locks are only taken inside synchronous sections,
//! never across an `.await`.

use crate::catalog::RouteTarget;
use crate::config::ServerConfig;
use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::middleware::{
    generate_request_id, CorrelationMiddleware, Middleware, MiddlewareChain, MiddlewareResult,
};
use crate::request::HttpRequest;
use crate::response::{HttpResponse, CORRELATION_HEADER};
use crate::route::strip_trailing_slashes;
use crate::router::Method;
use crate::state::AppState;
use crate::system;
use http_body_util::Full;
pub use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Metadata-driven HTTP server
pub struct Server {
    config: ServerConfig,
    state: Arc<AppState>,
    middleware: MiddlewareChain,
}

impl Server {
    /// Create a server over `state`; correlation ids are always handled
    #[must_use]
    pub fn new(config: ServerConfig, state: Arc<AppState>) -> Self {
        let mut middleware = MiddlewareChain::new();
        middleware.add(CorrelationMiddleware);
        Self {
            config,
            state,
            middleware,
        }
    }

    /// Add a middleware to the chain
    pub fn add_middleware<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middleware.add(middleware);
    }

    /// Shared state
    #[must_use]
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Start the server with graceful shutdown
    ///
    /// # Errors
    ///
    /// Returns `Error::BindError` if the address cannot be bound and
    /// `Error::Io` if accepting fails.
    pub async fn serve(&self) -> Result<()> {
        let addr = self.config.address;
        let listener = bind_listener(addr).map_err(|source| Error::BindError {
            address: addr.to_string(),
            source,
        })?;

        info!(address = %addr, "Server listening");

        let state = Arc::clone(&self.state);
        let middleware = Arc::new(self.middleware.clone());
        let active = Arc::new(AtomicUsize::new(0));
        let max_body_size = self.config.max_body_size;
        let keep_alive = self.config.keep_alive;

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    let (stream, remote_addr) = accept_result?;
                    let io = TokioIo::new(stream);

                    let state = Arc::clone(&state);
                    let middleware = Arc::clone(&middleware);
                    let active = Arc::clone(&active);

                    tokio::task::spawn(async move {
                        active.fetch_add(1, Ordering::Relaxed);

                        let service = service_fn(move |req| {
                            let state = Arc::clone(&state);
                            let middleware = Arc::clone(&middleware);
                            async move {
                                handle_request(req, &state, &middleware, max_body_size).await
                            }
                        });
                        if let Err(err) = http1::Builder::new()
                            .keep_alive(keep_alive)
                            .serve_connection(io, service)
                            .await
                        {
                            error!(remote = %remote_addr, error = ?err, "Error serving connection");
                        }
                        active.fetch_sub(1, Ordering::Relaxed);
                    });
                }
                () = shutdown_signal() => {
                    info!("Shutdown signal received, stopping server...");
                    break;
                }
            }
        }

        let timeout = self.config.shutdown_timeout;
        let drain = async {
            while active.load(Ordering::Relaxed) != 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        };
        if tokio::time::timeout(timeout, drain).await.is_err() {
            warn!(
                remaining = active.load(Ordering::Relaxed),
                "Shutdown timeout reached with open connections"
            );
        }
        Ok(())
    }

    /// Execute a request directly without the network stack
    pub async fn test_request(
        &self,
        method: Method,
        path: &str,
        headers: HashMap<String, String>,
        body: Option<Bytes>,
    ) -> HttpResponse {
        if let Some(actual) = body.as_ref().map(Bytes::len) {
            if actual > self.config.max_body_size {
                let err = Error::PayloadTooLarge {
                    limit: self.config.max_body_size,
                    actual,
                };
                return HttpResponse::from_error(&generate_request_id(), &err);
            }
        }
        let req = HttpRequest::new(method, path, headers, body);
        process_request(req, &self.state, &self.middleware).await
    }
}

fn bind_listener(addr: SocketAddr) -> std::io::Result<tokio::net::TcpListener> {
    let socket = if addr.is_ipv4() {
        tokio::net::TcpSocket::new_v4()?
    } else {
        tokio::net::TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    #[cfg(not(windows))]
    {
        socket.set_reuseport(true)?;
    }
    socket.bind(addr)?;
    socket.listen(1024)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
}

/// Core request processing logic (network agnostic)
async fn process_request(
    mut req: HttpRequest,
    state: &AppState,
    middleware: &MiddlewareChain,
) -> HttpResponse {
    let mut response = match middleware.run_before(&mut req) {
        MiddlewareResult::Respond(resp) => resp,
        MiddlewareResult::Continue => {
            let stripped = strip_trailing_slashes(&req.path).to_string();
            req.set_path(stripped);
            dispatch(&req, state).await
        }
    };

    middleware.run_after(&req, &mut response);
    response
}

async fn dispatch(req: &HttpRequest, state: &AppState) -> HttpResponse {
    let correlation_id = req
        .header(CORRELATION_HEADER)
        .map_or_else(generate_request_id, str::to_string);

    let catalog = state.catalog();
    let routed = catalog.match_route(req.method, &req.path).map(|m| {
        debug!(correlation_id = %correlation_id, route = m.pattern, "Route matched");
        (m.target.clone(), m.params)
    });
    drop(catalog);

    let result = match routed {
        Err(err) => Err(err),
        Ok((RouteTarget::Options { allow }, _)) => {
            Ok(HttpResponse::no_content().with_header("Allow", &allow))
        }
        Ok((RouteTarget::System(route), params)) => {
            system::handle(route, state, req, &params, &correlation_id).await
        }
        Ok((RouteTarget::Endpoint(guard), params)) => {
            let checked = guard.check(&state.registry().read(), req.method, req, &params);
            match checked {
                Ok(validated) => {
                    let ctx = RequestContext {
                        correlation_id: correlation_id.clone(),
                        endpoint_id: guard.endpoint_id,
                        method: req.method,
                        params: validated,
                    };
                    Ok((state.handler())(req.clone(), ctx).await)
                }
                Err(err) => Err(err),
            }
        }
    };

    result.unwrap_or_else(|err| {
        log_rejection(req, &correlation_id, &err);
        HttpResponse::from_error(&correlation_id, &err)
    })
}

fn log_rejection(req: &HttpRequest, correlation_id: &str, err: &Error) {
    let status = err.status();
    if status >= 500 {
        error!(
            method = %req.method,
            path = %req.path,
            status,
            correlation_id = %correlation_id,
            error = %err,
            "Request failed"
        );
    } else {
        warn!(
            method = %req.method,
            path = %req.path,
            status,
            correlation_id = %correlation_id,
            error = %err,
            "Request rejected"
        );
    }
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: &AppState,
    middleware: &MiddlewareChain,
    max_body_size: usize,
) -> std::result::Result<Response<Full<Bytes>>, hyper::Error> {
    let correlation_id = req
        .headers()
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map_or_else(generate_request_id, str::to_string);

    let response = match HttpRequest::from_hyper_with_limit(req, max_body_size).await {
        Ok(request) => process_request(request, state, middleware).await,
        Err(err) => {
            warn!(correlation_id = %correlation_id, error = %err, "Failed to read request");
            HttpResponse::from_error(&correlation_id, &err)
                .with_header(CORRELATION_HEADER, &correlation_id)
        }
    };
    Ok(response.into_hyper())
}
