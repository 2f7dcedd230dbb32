//! Per-session URL namespaces.
//!
//! Every session's views live under `/pprofweb/<session-id>/`. Loaders
//! describe their views with relative patterns; this module turns those into
//! absolute routes and recovers the session ID from incoming paths.

use axum::{response::Redirect, routing::get, Router};

use crate::artifact::ViewSet;
use crate::session::SessionId;

/// Path prefix under which all session traffic is served.
pub const NAMESPACE_PREFIX: &str = "/pprofweb/";

/// Absolute path at which `pattern` is installed for session `id`.
///
/// The root pattern (`/` or empty) maps to the session root, which keeps its
/// trailing slash. Other patterns are joined with redundant slashes removed.
pub fn namespace(id: &SessionId, pattern: &str) -> String {
    let segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        format!("{NAMESPACE_PREFIX}{id}/")
    } else {
        format!("{NAMESPACE_PREFIX}{id}/{}", segments.join("/"))
    }
}

/// Split a request path into the session ID segment and the remainder.
///
/// Returns `None` if the path is outside the namespace or carries no ID.
pub fn resolve(path: &str) -> Option<(&str, &str)> {
    let rest = path.strip_prefix(NAMESPACE_PREFIX)?;
    let (id, remainder) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
    };
    if id.is_empty() {
        None
    } else {
        Some((id, remainder))
    }
}

/// Build the handler bundle for a session from its views.
///
/// Each view is routed at its namespaced absolute path; the bare session path
/// without a trailing slash redirects to the session root.
pub fn mount(id: &SessionId, views: ViewSet) -> Router {
    let root = namespace(id, "/");
    let bare = root.trim_end_matches('/').to_string();

    let mut router = Router::new();
    for (pattern, view) in views.into_views() {
        router = router.route(&escape_route(&namespace(id, &pattern)), view);
    }

    let target = root.clone();
    router.route(
        &bare,
        get(move || {
            let target = target.clone();
            async move { Redirect::permanent(&target) }
        }),
    )
}

/// Escape characters axum would read as path parameters.
fn escape_route(path: &str) -> String {
    path.replace('{', "{{").replace('}', "}}")
}
