//! # Backend Configuration
//!
//! Where the storefront backend lives and how the client talks to it.
//! Loaded from `config/store.toml` with environment overrides.

use serde::Deserialize;
use std::env;
use store_core::{StoreError, StoreResult};

/// Storefront backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Backend base URL (the script endpoint all actions are appended to)
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

impl ApiConfig {
    /// Load configuration, preferring environment variables over the
    /// config file.
    ///
    /// Env vars:
    /// - `STORE_API_URL` (overrides `base_url`)
    /// - `STORE_API_TIMEOUT_SECS` (overrides `timeout_secs`)
    pub fn load() -> StoreResult<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let mut config = Self::from_file().unwrap_or(Self {
            base_url: String::new(),
            timeout_secs: default_timeout(),
        });

        if let Ok(url) = env::var("STORE_API_URL") {
            config.base_url = url;
        }
        if let Ok(timeout) = env::var("STORE_API_TIMEOUT_SECS") {
            config.timeout_secs = timeout.parse().map_err(|_| {
                StoreError::Configuration("STORE_API_TIMEOUT_SECS must be an integer".to_string())
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Try the usual config file locations
    fn from_file() -> Option<Self> {
        let paths = [
            "config/store.toml",
            "../config/store.toml",
            "../../config/store.toml",
        ];

        for path in paths {
            if let Ok(content) = std::fs::read_to_string(path) {
                match toml::from_str::<Self>(&content) {
                    Ok(config) => {
                        tracing::info!(path, "loaded store config");
                        return Some(config);
                    }
                    Err(e) => {
                        tracing::warn!(path, error = %e, "invalid store config file");
                    }
                }
            }
        }
        None
    }

    /// Create config with explicit values (for testing)
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: default_timeout(),
        }
    }

    fn validate(&self) -> StoreResult<()> {
        if self.base_url.is_empty() {
            return Err(StoreError::Configuration(
                "backend base URL not set (config/store.toml or STORE_API_URL)".to_string(),
            ));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(StoreError::Configuration(
                "backend base URL must start with http:// or https://".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_config() {
        let config = ApiConfig::new("https://backend.example.com/exec");
        assert_eq!(config.timeout_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_scheme() {
        let config = ApiConfig::new("ftp://backend.example.com");
        assert!(config.validate().is_err());

        let empty = ApiConfig::new("");
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_toml_defaults() {
        let config: ApiConfig =
            toml::from_str(r#"base_url = "https://backend.example.com/exec""#).unwrap();
        assert_eq!(config.timeout_secs, 30);
    }
}
