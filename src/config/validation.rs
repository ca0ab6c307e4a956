//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check mount roots exist before the server starts
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: &ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),

    #[error("limits.request_timeout_secs must be greater than zero")]
    ZeroTimeout,

    #[error("limits.max_body_size must be greater than zero")]
    ZeroBodyLimit,

    #[error("routing.subdomain_offset must be at least 1")]
    ZeroSubdomainOffset,

    #[error("mounts[{index}].root {root:?} is not a directory")]
    MountRoot { index: usize, root: String },

    #[error("mounts[{index}].sub_domain must not be empty")]
    EmptySubDomain { index: usize },
}

/// Check everything serde cannot.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(config.observability.metrics_address.clone()));
    }
    if config.limits.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if config.limits.max_body_size == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }
    if config.routing.subdomain_offset == 0 {
        errors.push(ValidationError::ZeroSubdomainOffset);
    }

    for (index, mount) in config.mounts.iter().enumerate() {
        if !Path::new(&mount.root).is_dir() {
            errors.push(ValidationError::MountRoot {
                index,
                root: mount.root.clone(),
            });
        }
        if mount.sub_domain.trim().is_empty() {
            errors.push(ValidationError::EmptySubDomain { index });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
