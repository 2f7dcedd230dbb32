//! Session management module.
//!
//! This module provides the session identifier, the handler capability a
//! session stores, and the registry that owns session lifecycles.

mod handler;
mod id;
mod registry;

pub use handler::{FnHandler, SessionHandler};
pub use id::SessionId;
pub use registry::{Registration, SessionRegistry, MAX_SESSION_TTL};
