//! HTTP front door for profview.
//!
//! ## Endpoints
//!
//! - `GET /` - Landing page
//! - `GET /?profile=<path>` - Load a profile into a new session, then redirect to it
//! - `* /pprofweb/{id}/...` - Session traffic, dispatched to the session's views
//!
//! Every other path answers `404`.
//!
//! ## Example
//!
//! ```no_run
//! use profview::api::{serve, AppState, ServerConfig};
//! use profview::artifact::{ArtifactResolver, RawArtifactLoader};
//!
//! #[tokio::main]
//! async fn main() -> profview::Result<()> {
//!     let state = AppState::new(ArtifactResolver::new("./profiles"), RawArtifactLoader);
//!     serve(ServerConfig::new("127.0.0.1", 8080), state).await
//! }
//! ```

pub mod handlers;
pub mod middleware;
pub mod namespace;
pub mod router;

// Re-export commonly used types
pub use handlers::{AppState, DEFAULT_SESSION_TTL, PROFILE_PARAM};
pub use namespace::{mount, namespace, resolve, NAMESPACE_PREFIX};
pub use router::{create_router, serve, ServerConfig};
