//! # Service Configuration
//!
//! JSON configuration file loaded at startup and validated fail-fast:
//! a process never starts serving with an unusable config.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors, all fatal at startup
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("Failed to read config at '{path}': {detail}")]
    Io { path: String, detail: String },

    /// The config file is not valid JSON for this shape
    #[error("Invalid config JSON: {0}")]
    Parse(String),

    /// A config value fails validation
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Service configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Path to the mapping document (required)
    pub mapping: String,

    /// Listen address for the HTTP server (default 127.0.0.1:8080)
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// RSA public key PEM verifying inbound bearer tokens (required)
    pub auth_public_key: String,

    /// RSA private key PEM for response signing; plain envelopes when absent
    #[serde(default)]
    pub response_signing_key: Option<String>,

    /// Lifetime of signed response tokens in seconds (default 300)
    #[serde(default = "default_response_token_ttl_secs")]
    pub response_token_ttl_secs: i64,

    /// Persistent engine database path; in-memory engine when absent
    #[serde(default)]
    pub engine_cache: Option<String>,

    /// source_id echoed when a request does not carry one (default SNAPGATE)
    #[serde(default = "default_source_id")]
    pub default_source_id: String,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_response_token_ttl_secs() -> i64 {
    300
}

fn default_source_id() -> String {
    "SNAPGATE".to_string()
}

impl ServiceConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;

        let config: ServiceConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> ConfigResult<()> {
        if self.mapping.is_empty() {
            return Err(ConfigError::Invalid("mapping must not be empty".to_string()));
        }

        if self.auth_public_key.is_empty() {
            return Err(ConfigError::Invalid(
                "auth_public_key must not be empty".to_string(),
            ));
        }

        if self.listen_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "listen_addr '{}' is not a valid socket address",
                self.listen_addr
            )));
        }

        if self.response_token_ttl_secs <= 0 {
            return Err(ConfigError::Invalid(
                "response_token_ttl_secs must be > 0".to_string(),
            ));
        }

        if self.default_source_id.is_empty() {
            return Err(ConfigError::Invalid(
                "default_source_id must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Mapping document path
    pub fn mapping_path(&self) -> &Path {
        Path::new(&self.mapping)
    }

    /// Bearer verification public key path
    pub fn auth_public_key_path(&self) -> &Path {
        Path::new(&self.auth_public_key)
    }

    /// Response signing key path, when configured
    pub fn signing_key_path(&self) -> Option<&Path> {
        self.response_signing_key.as_deref().map(Path::new)
    }

    /// Persistent engine database path, when configured
    pub fn engine_cache_path(&self) -> Option<&Path> {
        self.engine_cache.as_deref().map(Path::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn minimal_json() -> &'static str {
        r#"{
            "mapping": "/etc/snapgate/mapping.json",
            "auth_public_key": "/etc/snapgate/auth.pub.pem"
        }"#
    }

    #[test]
    fn test_defaults_applied() {
        let config: ServiceConfig = serde_json::from_str(minimal_json()).unwrap();
        config.validate().unwrap();

        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.response_token_ttl_secs, 300);
        assert_eq!(config.default_source_id, "SNAPGATE");
        assert!(config.response_signing_key.is_none());
        assert!(config.engine_cache.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapgate.json");
        std::fs::write(&path, minimal_json()).unwrap();

        let config = ServiceConfig::load(&path).unwrap();
        assert_eq!(config.mapping, "/etc/snapgate/mapping.json");
    }

    #[test]
    fn test_missing_file_rejected() {
        let err = ServiceConfig::load(Path::new("/nonexistent/snapgate.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let err = serde_json::from_str::<ServiceConfig>(r#"{"mapping": "m.json"}"#).unwrap_err();
        assert!(err.to_string().contains("auth_public_key"));
    }

    #[test]
    fn test_bad_listen_addr_rejected() {
        let mut config: ServiceConfig = serde_json::from_str(minimal_json()).unwrap();
        config.listen_addr = "not an address".to_string();

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let mut config: ServiceConfig = serde_json::from_str(minimal_json()).unwrap();
        config.response_token_ttl_secs = 0;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
