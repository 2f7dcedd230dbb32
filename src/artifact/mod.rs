//! Artifact handling: locating profiles on disk and loading them into views.
//!
//! The resolver guards the filesystem boundary; the loader is the seam to
//! whatever engine renders a profile.

mod loader;
mod resolve;

pub use loader::{ArtifactLoader, ArtifactSummary, LoadRequest, RawArtifactLoader, ViewSet};
pub use resolve::{
    clean_relative_path, decode_query_value, query_param, ArtifactResolver,
    DEFAULT_ALLOWED_EXTENSIONS,
};
