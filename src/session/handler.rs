//! The capability a session stores: something that can answer HTTP requests.

use axum::{extract::Request, response::Response, Router};
use futures_util::future::BoxFuture;
use tower::ServiceExt;

/// A handler bundle able to serve any request under its session's namespace.
///
/// The registry never looks inside a bundle; it only hands requests to it.
/// Implementations receive the original, unmodified request and are
/// responsible for their own sub-path dispatch.
pub trait SessionHandler: Send + Sync + 'static {
    /// Serve a single request.
    fn serve(&self, request: Request) -> BoxFuture<'static, Response>;
}

impl SessionHandler for Router {
    fn serve(&self, request: Request) -> BoxFuture<'static, Response> {
        let router = self.clone();
        Box::pin(async move {
            match router.oneshot(request).await {
                Ok(response) => response,
                Err(never) => match never {},
            }
        })
    }
}

/// Wraps a closure as a handler. Handy for tests and for very small bundles.
pub struct FnHandler<F>(pub F);

impl<F> SessionHandler for FnHandler<F>
where
    F: Fn(Request) -> Response + Send + Sync + 'static,
{
    fn serve(&self, request: Request) -> BoxFuture<'static, Response> {
        let response = (self.0)(request);
        Box::pin(async move { response })
    }
}
