//! The artifact loader seam and the built-in raw loader.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use axum::{
    body::Bytes,
    http::header,
    response::{Html, IntoResponse},
    routing::{get, MethodRouter},
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::error::ProfviewError;
use crate::session::SessionId;
use crate::Result;

/// Everything a loader gets to know about a load attempt.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    /// Validated path of the artifact on disk.
    pub path: PathBuf,
    /// The session the resulting views will be mounted under.
    pub session_id: SessionId,
}

/// Relative URL patterns mapped to the handlers that render them.
///
/// Patterns are relative to the session root: `/` is the session's landing
/// view, `/top` or `top` a sub-view. Adding a pattern twice keeps the last
/// handler.
#[derive(Default)]
pub struct ViewSet {
    views: BTreeMap<String, MethodRouter>,
}

impl ViewSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a view under `pattern`.
    pub fn route(mut self, pattern: &str, view: MethodRouter) -> Self {
        self.views.insert(normalize_pattern(pattern), view);
        self
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Iterate over the normalized patterns.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.views.keys().map(String::as_str)
    }

    /// Consume the set, yielding `(pattern, view)` pairs in pattern order.
    pub fn into_views(self) -> impl Iterator<Item = (String, MethodRouter)> {
        self.views.into_iter()
    }
}

impl std::fmt::Debug for ViewSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.views.keys()).finish()
    }
}

/// Collapse a pattern to `/` or `/a/b` form.
pub(crate) fn normalize_pattern(pattern: &str) -> String {
    let segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Parses an artifact and produces the views that render it.
///
/// Loading is synchronous and may block; callers run it off the async
/// executor. Implementations must not assume the session is registered yet.
pub trait ArtifactLoader: Send + Sync + 'static {
    fn load(&self, request: &LoadRequest) -> Result<ViewSet>;
}

impl<F> ArtifactLoader for F
where
    F: Fn(&LoadRequest) -> Result<ViewSet> + Send + Sync + 'static,
{
    fn load(&self, request: &LoadRequest) -> Result<ViewSet> {
        self(request)
    }
}

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Summary of a loaded artifact, served at `/meta`.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactSummary {
    pub name: String,
    pub size_bytes: u64,
    pub compressed: bool,
    pub session_id: String,
    pub loaded_at_unix: u64,
}

/// A loader that exposes the artifact as-is.
///
/// It checks framing (non-empty, gzip magic for `.gz` files) but does not
/// decode the profile. Views:
/// - `/`: HTML overview with links to the other views
/// - `/meta`: JSON summary
/// - `/download`: the raw artifact bytes
#[derive(Debug, Default, Clone, Copy)]
pub struct RawArtifactLoader;

impl RawArtifactLoader {
    fn read(path: &Path) -> Result<Bytes> {
        let data = std::fs::read(path)?;
        if data.is_empty() {
            return Err(ProfviewError::Load(format!(
                "{} is empty",
                path.display()
            )));
        }
        let gzipped = path.extension().is_some_and(|ext| ext == "gz");
        if gzipped && !data.starts_with(&GZIP_MAGIC) {
            return Err(ProfviewError::Load(format!(
                "{} is not gzip compressed",
                path.display()
            )));
        }
        Ok(Bytes::from(data))
    }
}

impl ArtifactLoader for RawArtifactLoader {
    fn load(&self, request: &LoadRequest) -> Result<ViewSet> {
        info!(path = %request.path.display(), session = %request.session_id, "fetching profile");
        let data = Self::read(&request.path)?;

        let name = request
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let summary = ArtifactSummary {
            name: name.clone(),
            size_bytes: data.len() as u64,
            compressed: data.starts_with(&GZIP_MAGIC),
            session_id: request.session_id.to_string(),
            loaded_at_unix: SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        };
        let overview = render_overview(&summary);

        let download_name = name;
        Ok(ViewSet::new()
            .route(
                "/",
                get(move || {
                    let overview = overview.clone();
                    async move { Html(overview) }
                }),
            )
            .route(
                "/meta",
                get(move || {
                    let summary = summary.clone();
                    async move { Json(summary) }
                }),
            )
            .route(
                "/download",
                get(move || {
                    let data = data.clone();
                    let disposition = format!("attachment; filename=\"{}\"", download_name);
                    async move {
                        (
                            [
                                (header::CONTENT_TYPE, "application/octet-stream".to_string()),
                                (header::CONTENT_DISPOSITION, disposition),
                            ],
                            data,
                        )
                            .into_response()
                    }
                }),
            ))
    }
}

fn render_overview(summary: &ArtifactSummary) -> String {
    let name = escape_html(&summary.name);
    format!(
        r#"<!doctype html>
<html>
<head><title>{name}</title></head>
<body>
<h1>{name}</h1>
<ul>
<li>size: {size} bytes</li>
<li>compressed: {compressed}</li>
<li>session: {session}</li>
</ul>
<p><a href="meta">summary (json)</a> | <a href="download">download</a></p>
</body>
</html>
"#,
        size = summary.size_bytes,
        compressed = summary.compressed,
        session = summary.session_id,
    )
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn load(dir: &TempDir, name: &str, contents: &[u8]) -> Result<ViewSet> {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        RawArtifactLoader.load(&LoadRequest {
            path,
            session_id: SessionId::new(),
        })
    }

    #[test]
    fn test_normalize_pattern() {
        assert_eq!(normalize_pattern("/"), "/");
        assert_eq!(normalize_pattern(""), "/");
        assert_eq!(normalize_pattern("top"), "/top");
        assert_eq!(normalize_pattern("/source/"), "/source");
        assert_eq!(normalize_pattern("//ui//flamegraph"), "/ui/flamegraph");
    }

    #[test]
    fn test_view_set_deduplicates_patterns() {
        let views = ViewSet::new()
            .route("/", get(|| async { "a" }))
            .route("", get(|| async { "b" }))
            .route("top", get(|| async { "c" }));
        assert_eq!(views.len(), 2);
        assert_eq!(views.patterns().collect::<Vec<_>>(), vec!["/", "/top"]);
    }

    #[test]
    fn test_raw_loader_views() {
        let dir = TempDir::new().unwrap();
        let views = load(&dir, "cpu.pb.gz", &[0x1f, 0x8b, 0x08, 0x00]).unwrap();
        assert_eq!(
            views.patterns().collect::<Vec<_>>(),
            vec!["/", "/download", "/meta"]
        );
    }

    #[test]
    fn test_raw_loader_accepts_uncompressed_pb() {
        let dir = TempDir::new().unwrap();
        assert!(load(&dir, "heap.pb", &[0x0a, 0x01]).is_ok());
    }

    #[test]
    fn test_raw_loader_rejects_bad_gzip() {
        let dir = TempDir::new().unwrap();
        let result = load(&dir, "cpu.pb.gz", b"not gzip");
        assert!(matches!(result, Err(ProfviewError::Load(_))));
    }

    #[test]
    fn test_raw_loader_rejects_empty() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load(&dir, "empty.pb", b""),
            Err(ProfviewError::Load(_))
        ));
    }

    #[test]
    fn test_closure_loader() {
        let loader = |_: &LoadRequest| -> Result<ViewSet> {
            Ok(ViewSet::new().route("/", get(|| async { "ok" })))
        };
        let views = loader
            .load(&LoadRequest {
                path: PathBuf::from("x.pb"),
                session_id: SessionId::new(),
            })
            .unwrap();
        assert_eq!(views.len(), 1);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a&b>"), "&lt;a&amp;b&gt;");
    }
}
