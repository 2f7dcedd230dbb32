//! # profview
//!
//! Serve captured profiles in isolated, self-expiring web viewer sessions.
//!
//! Opening `/?profile=<path>` resolves the path under a base directory, loads
//! the profile into a set of views, and mounts those views under a fresh
//! session namespace `/pprofweb/<id>/`. Sessions that see no traffic for the
//! configured window are dropped.
//!
//! ## Features
//!
//! - **Session registry**: Concurrent map of live sessions with sliding expiry
//! - **Namespaced routing**: Each session's views live under their own prefix
//! - **Path safety**: Traversal and unexpected file types are rejected
//! - **Pluggable loading**: Any [`ArtifactLoader`] can turn a profile into views
//!
//! ## Quick Start
//!
//! ```no_run
//! use profview::api::{serve, AppState, ServerConfig};
//! use profview::{ArtifactResolver, RawArtifactLoader};
//!
//! #[tokio::main]
//! async fn main() -> profview::Result<()> {
//!     profview::logging::try_init().ok();
//!
//!     let state = AppState::new(ArtifactResolver::new("./profiles"), RawArtifactLoader);
//!     serve(ServerConfig::default(), state).await
//! }
//! ```

pub mod api;
pub mod artifact;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod session;

// Re-export commonly used types
pub use artifact::{ArtifactLoader, ArtifactResolver, LoadRequest, RawArtifactLoader, ViewSet};
pub use error::{ProfviewError, Result};
pub use session::{FnHandler, Registration, SessionHandler, SessionId, SessionRegistry};
