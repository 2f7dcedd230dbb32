//! Turning a user-supplied query parameter into a safe artifact path.

use std::path::{Component, Path, PathBuf};

use crate::error::ProfviewError;
use crate::Result;

/// Suffixes accepted for serialized profiles when nothing else is configured.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[".pb.gz", ".pb"];

/// Resolves artifact references against a base directory.
///
/// Resolution runs in a fixed order: decode, clean, check the extension,
/// check the file exists. The first failing step decides the error.
#[derive(Debug, Clone)]
pub struct ArtifactResolver {
    base_dir: PathBuf,
    allowed_extensions: Vec<String>,
}

impl ArtifactResolver {
    /// Create a resolver rooted at `base_dir` with the default allow-list.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }

    /// Replace the extension allow-list.
    pub fn with_allowed_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    /// Resolve a raw (still percent-encoded) query value to an existing file.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf> {
        let decoded = decode_query_value(raw)?;
        let relative = clean_relative_path(&decoded)?;
        self.check_extension(&relative)?;

        let path = self.base_dir.join(&relative);
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(ProfviewError::ArtifactNotFound(relative)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ProfviewError::ArtifactNotFound(relative))
            }
            Err(e) => Err(ProfviewError::Io(e)),
        }
    }

    fn check_extension(&self, relative: &Path) -> Result<()> {
        let name = relative
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self
            .allowed_extensions
            .iter()
            .any(|ext| name.len() > ext.len() && name.ends_with(ext.as_str()))
        {
            Ok(())
        } else {
            Err(ProfviewError::ExtensionNotAllowed(
                relative.display().to_string(),
            ))
        }
    }
}

/// Find the raw value of `key` in a query string.
///
/// Returns the first occurrence, still percent-encoded.
pub fn query_param<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        (k == key).then_some(v)
    })
}

/// Decode a form-encoded query value.
///
/// Unlike lenient decoders this rejects malformed `%` escapes and byte
/// sequences that are not UTF-8.
pub fn decode_query_value(raw: &str) -> Result<String> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return Err(ProfviewError::InvalidQuery(raw.to_string()));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .map_err(|_| ProfviewError::InvalidQuery(raw.to_string()))
}

/// Lexically clean a user-supplied relative path.
///
/// `.` segments vanish, `..` pops the previous segment, and a leading `/` is
/// ignored so absolute-looking input stays under the base directory. A `..`
/// with nothing left to pop would escape the base directory and is rejected.
pub fn clean_relative_path(input: &str) -> Result<PathBuf> {
    if input.contains('\0') {
        return Err(ProfviewError::InvalidQuery(input.escape_default().to_string()));
    }

    let mut clean = PathBuf::new();
    for component in Path::new(input).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::ParentDir => {
                if !clean.pop() {
                    return Err(ProfviewError::PathTraversal(input.to_string()));
                }
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    if clean.as_os_str().is_empty() {
        return Err(ProfviewError::InvalidQuery(input.to_string()));
    }
    Ok(clean)
}
