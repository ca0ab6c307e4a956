//! Crate error types.
//!
//! Matching never fails (an empty match list is not an error) and handler
//! faults are recovered by the dispatch chain, so the errors surfaced to
//! callers are the ones raised while configuring or starting the server.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by [`RouteRegistry::add`](crate::routing::RouteRegistry::add)
/// and [`RouteRegistry::add_static`](crate::routing::RouteRegistry::add_static).
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The route template was the empty string.
    #[error("Route template must not be empty")]
    EmptyTemplate,

    /// The route template could not be compiled.
    #[error("Malformed route template {template:?}: {reason}")]
    MalformedTemplate { template: String, reason: String },

    /// Method is neither a standard HTTP verb nor `USE`.
    #[error("Unsupported route method: {0}")]
    InvalidMethod(String),

    /// Dot-file policy is not one of `allow`, `deny`, `ignore`.
    #[error("Invalid dotfile policy {0:?} (expected allow, deny or ignore)")]
    InvalidDotfilePolicy(String),

    /// Static root does not exist.
    #[error("Static root not found: {}", .0.display())]
    RootNotFound(PathBuf),

    /// Static root exists but is not a directory.
    #[error("Static root is not a directory: {}", .0.display())]
    RootNotDirectory(PathBuf),

    /// Static root could not be read.
    #[error("Static root {} is not readable: {source}", path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RegistrationError {
    pub(crate) fn malformed(template: &str, reason: impl Into<String>) -> Self {
        Self::MalformedTemplate {
            template: template.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors that stop the server from starting or serving.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configured static mount could not be registered.
    #[error("Failed to register route: {0}")]
    Registration(#[from] RegistrationError),

    /// Failed to bind to address.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The accept loop failed.
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}
