//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<ServerConfig, ConfigError> {
    let config: ServerConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file() {
        let path = std::env::temp_dir().join(format!("waypoint-{}.toml", uuid::Uuid::new_v4()));
        assert!(matches!(load_config(&path), Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = std::env::temp_dir().join(format!("waypoint-config-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(dir.join("public")).unwrap();
        let path = dir.join("waypoint.toml");
        fs::write(
            &path,
            format!(
                "[listener]\nbind_address = \"127.0.0.1:0\"\n\n[[mounts]]\nroot = {:?}\npath = \"/assets\"\n",
                dir.join("public").display().to_string()
            ),
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.mounts.len(), 1);
        assert_eq!(config.mounts[0].path, "/assets");
    }

    #[test]
    fn test_parse_and_validation_errors() {
        assert!(matches!(parse_config("listener = 5"), Err(ConfigError::Parse(_))));

        let err = parse_config("[limits]\nrequest_timeout_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref e) if e == &vec![ValidationError::ZeroTimeout]));
        assert!(err.to_string().contains("request_timeout_secs"));
    }
}
