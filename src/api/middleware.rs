//! Request logging middleware.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request},
    middleware::Next,
    response::Response,
};
use tracing::info;

/// Log the remote address, method and path of every request before dispatch.
///
/// The remote address is only known when the router is served with
/// `into_make_service_with_connect_info`; otherwise it is logged as `-`.
pub async fn log_request(request: Request, next: Next) -> Response {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());

    info!(
        remote = %remote,
        method = %request.method(),
        path = %request.uri().path(),
        "request"
    );

    next.run(request).await
}
