//! HTTP handlers for the landing page and session traffic.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{RawQuery, Request, State},
    http::{Method, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use tracing::{error, info, warn};

use super::namespace::{self, mount};
use crate::artifact::{query_param, ArtifactLoader, ArtifactResolver, LoadRequest};
use crate::error::ProfviewError;
use crate::session::{Registration, SessionHandler, SessionId, SessionRegistry};

/// Query parameter naming the artifact to open.
pub const PROFILE_PARAM: &str = "profile";

/// Default inactivity window for a session.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub resolver: Arc<ArtifactResolver>,
    pub loader: Arc<dyn ArtifactLoader>,
    pub session_ttl: Duration,
}

impl AppState {
    pub fn new(resolver: ArtifactResolver, loader: impl ArtifactLoader) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
            resolver: Arc::new(resolver),
            loader: Arc::new(loader),
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }

    /// Use an existing registry instead of a fresh one.
    pub fn with_registry(mut self, registry: Arc<SessionRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }
}

impl IntoResponse for ProfviewError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidQuery(_) | Self::PathTraversal(_) | Self::ExtensionNotAllowed(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::ArtifactNotFound(_) | Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            Self::InvalidQuery(_) => "could not url decode query param",
            Self::PathTraversal(_) => "path escapes the profiles directory",
            Self::ExtensionNotAllowed(_) => "file extension is not allowed",
            Self::ArtifactNotFound(_) => "profile not found",
            Self::SessionNotFound(_) => "profile handler not loaded",
            Self::Load(_) => "profile load error",
            _ => "internal error",
        };

        if self.is_client_error() {
            info!("request rejected: {}", self);
        } else {
            error!("request failed: {}", self);
        }
        (status, message).into_response()
    }
}

const LANDING_PAGE: &str = r#"<!doctype html>
<html>
<head><title>Profile Viewer</title></head>
<body>
<h1>Profile Viewer</h1>
<p>Open a profile by passing its path, relative to the profiles directory,
in the <code>profile</code> query parameter:
<a href="/?profile=profile_example.pb.gz">/?profile=your_profile_file.pb.gz</a></p>
<p>Viewer sessions are dropped after a period of inactivity; reopen the link to load the profile again.</p>
</body>
</html>
"#;

/// Landing page and session creation.
///
/// `GET /` serves the landing page; `GET /?profile=<path>` loads the profile
/// into a new session and redirects to it.
pub async fn root(
    State(state): State<AppState>,
    method: Method,
    RawQuery(query): RawQuery,
) -> Response {
    if method != Method::GET {
        return (StatusCode::METHOD_NOT_ALLOWED, "wrong method").into_response();
    }

    let raw = query
        .as_deref()
        .and_then(|q| query_param(q, PROFILE_PARAM))
        .filter(|value| !value.is_empty());

    let Some(raw) = raw else {
        return Html(LANDING_PAGE).into_response();
    };

    match create_session(&state, raw).await {
        Ok(id) => Redirect::to(&namespace::namespace(&id, "/")).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Resolve, load and register a profile under a fresh session ID.
///
/// Loading and registration run together on the blocking pool, so a client
/// that disconnects mid-load still leaves a registered session behind.
pub async fn create_session(state: &AppState, raw: &str) -> crate::Result<SessionId> {
    let path = state.resolver.resolve(raw)?;

    let id = SessionId::new();
    if state.registry.contains(&id)? {
        error!(session = %id, "freshly generated session id is already registered");
        return Err(ProfviewError::SessionCollision(id.to_string()));
    }

    let registry = Arc::clone(&state.registry);
    let loader = Arc::clone(&state.loader);
    let ttl = state.session_ttl;

    let task = tokio::task::spawn_blocking(move || -> crate::Result<SessionId> {
        let request = LoadRequest {
            path,
            session_id: id,
        };
        let views = loader.load(&request)?;
        if views.is_empty() {
            warn!(session = %id, path = %request.path.display(), "loader produced no views");
        }
        let bundle = mount(&id, views);
        match registry.create(id, Arc::new(bundle), ttl)? {
            Registration::Created => Ok(id),
            Registration::AlreadyLive => {
                error!(session = %id, "session id was registered while the profile was loading");
                Err(ProfviewError::SessionCollision(id.to_string()))
            }
        }
    });

    task.await
        .map_err(|e| ProfviewError::Load(format!("loader task failed: {e}")))?
}

/// Dispatch session traffic to the session's handler bundle.
pub async fn serve_session(State(state): State<AppState>, request: Request) -> Response {
    let Some((raw_id, _)) = namespace::resolve(request.uri().path()) else {
        return not_found().await.into_response();
    };
    let Ok(id) = raw_id.parse::<SessionId>() else {
        return ProfviewError::SessionNotFound(raw_id.to_string()).into_response();
    };

    match state.registry.lookup(&id) {
        Ok(Some(handler)) => handler.serve(request).await,
        Ok(None) => ProfviewError::SessionNotFound(id.to_string()).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Fallback for every unmatched path.
pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "not found")
}
