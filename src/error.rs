//! Error types for profview.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for profview operations.
#[derive(Error, Debug)]
pub enum ProfviewError {
    /// No live session exists for the given ID.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// A freshly generated session ID was already registered.
    #[error("session id collision: {0}")]
    SessionCollision(String),

    /// The registry has been shut down and accepts no new sessions.
    #[error("session registry is closed")]
    RegistryClosed,

    /// The query parameter could not be decoded.
    #[error("could not url decode query param: {0}")]
    InvalidQuery(String),

    /// The requested path escapes the profiles directory.
    #[error("path escapes the profiles directory: {0}")]
    PathTraversal(String),

    /// The requested file does not carry an allowed extension.
    #[error("file extension is not allowed: {0}")]
    ExtensionNotAllowed(String),

    /// The requested artifact does not exist.
    #[error("profile not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    /// The artifact loader failed to produce views.
    #[error("profile load failed: {0}")]
    Load(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,
}

impl ProfviewError {
    /// Whether the error was caused by the client's request rather than
    /// by the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::SessionNotFound(_)
                | Self::InvalidQuery(_)
                | Self::PathTraversal(_)
                | Self::ExtensionNotAllowed(_)
                | Self::ArtifactNotFound(_)
        )
    }
}

/// Convenience Result type for profview operations.
pub type Result<T> = std::result::Result<T, ProfviewError>;
