//! API router configuration.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{middleware, routing::any, Router};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use super::handlers::{not_found, root, serve_session, AppState};
use super::middleware::log_request;
use super::namespace::NAMESPACE_PREFIX;
use crate::session::SessionRegistry;

/// Create the router serving the landing page and all session traffic.
pub fn create_router(state: AppState) -> Router {
    // Rendered views can be large, so session traffic is compressed.
    let sessions = Router::new()
        .route(&format!("{NAMESPACE_PREFIX}{{*rest}}"), any(serve_session))
        .layer(CompressionLayer::new());

    Router::new()
        .route("/", any(root))
        .merge(sessions)
        .fallback(not_found)
        .layer(middleware::from_fn(log_request))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// How often expired sessions are swept.
    pub sweep_interval: Duration,
    /// Stop accepting connections on Ctrl-C / SIGTERM and drain in-flight requests.
    pub graceful_shutdown: bool,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn without_graceful_shutdown(mut self) -> Self {
        self.graceful_shutdown = false;
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            sweep_interval: Duration::from_secs(30),
            graceful_shutdown: true,
        }
    }
}

/// Start the server and run until shutdown.
///
/// Spawns the session reaper for the state's registry and shuts the registry
/// down once the server stops.
pub async fn serve(config: ServerConfig, state: AppState) -> crate::Result<()> {
    let addr = config.bind_address();
    let registry = state.registry.clone();
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(crate::error::ProfviewError::Io)?;

    tracing::info!("listening on {}", addr);

    let _reaper = SessionRegistry::spawn_reaper(&registry, config.sweep_interval);

    let service = router.into_make_service_with_connect_info::<SocketAddr>();
    let result = if config.graceful_shutdown {
        axum::serve(listener, service)
            .with_graceful_shutdown(shutdown_signal())
            .await
    } else {
        axum::serve(listener, service).await
    };

    let dropped = registry.shutdown()?;
    tracing::info!(dropped, "server stopped");

    result.map_err(crate::error::ProfviewError::Io)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{ArtifactResolver, RawArtifactLoader};

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert!(config.graceful_shutdown);
    }

    #[test]
    fn test_server_config_custom() {
        let config = ServerConfig::new("127.0.0.1", 3000)
            .with_sweep_interval(Duration::from_secs(5))
            .without_graceful_shutdown();
        assert_eq!(config.bind_address(), "127.0.0.1:3000");
        assert_eq!(config.sweep_interval, Duration::from_secs(5));
        assert!(!config.graceful_shutdown);
    }

    #[test]
    fn test_router_creation() {
        let state = AppState::new(ArtifactResolver::new("."), RawArtifactLoader);
        let _router = create_router(state);
    }
}
