//! # Dispatcher
//!
//! Async handler invoked for a guarded request once validation has passed.

use crate::context::RequestContext;
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use serde_json::json;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Handler function type (async)
pub type Handler = Arc<
    dyn Fn(HttpRequest, RequestContext) -> Pin<Box<dyn Future<Output = HttpResponse> + Send>>
        + Send
        + Sync,
>;

/// Wrap an async closure as a [`Handler`]
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(HttpRequest, RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HttpResponse> + Send + 'static,
{
    Arc::new(move |req, ctx| Box::pin(f(req, ctx)))
}

/// Default dispatcher: answers with the validated parameters
#[must_use]
pub fn echo_handler() -> Handler {
    handler(|req: HttpRequest, ctx: RequestContext| async move {
        HttpResponse::json_value(&json!({
            "endpoint": ctx.endpoint_id,
            "method": ctx.method.as_str(),
            "path": req.path,
            "uri": ctx.params.uri,
            "headers": ctx.params.headers,
            "query": ctx.params.query,
        }))
    })
}
