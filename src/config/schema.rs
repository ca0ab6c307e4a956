//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::routing::DotfilePolicy;

/// Root configuration for the server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Matching defaults.
    pub routing: RoutingConfig,

    /// Request limits and timeouts.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Static directories to mount at start-up.
    pub mounts: Vec<MountConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Matching defaults applied to entries that do not set their own.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Compare literal segments and subdomains case-sensitively.
    pub case_sensitive: bool,

    /// Number of trailing host labels that form the registered domain
    /// (2 for `example.com`, so `api.example.com` has subdomain `api`).
    pub subdomain_offset: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            subdomain_offset: 2,
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Whole-request deadline in seconds.
    pub request_timeout_secs: u64,

    /// Maximum buffered request body in bytes.
    pub max_body_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// A static mount declared in the config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MountConfig {
    /// Directory to serve.
    pub root: String,

    /// Mount point (default "/").
    #[serde(default = "default_mount_path")]
    pub path: String,

    /// Host label scope ("*" for any).
    #[serde(default = "default_sub_domain")]
    pub sub_domain: String,

    /// Overrides `routing.case_sensitive` when set.
    #[serde(default)]
    pub case_sensitive: Option<bool>,

    /// allow | deny | ignore.
    #[serde(default)]
    pub dotfiles: DotfilePolicy,
}

fn default_mount_path() -> String {
    "/".to_string()
}

fn default_sub_domain() -> String {
    "*".to_string()
}
