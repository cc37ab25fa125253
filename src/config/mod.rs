//! Configuration management
//!
//! This module handles loading and parsing configuration for the migration tool.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Gateway (service transport) configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Migration run configuration
    #[serde(default)]
    pub migrate: MigrateConfig,
}

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gateway driver (http or memory)
    #[serde(default)]
    pub driver: GatewayDriver,
    /// Base URL every service is addressed under
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Per-service base URL overrides, keyed by service name
    #[serde(default)]
    pub services: HashMap<String, String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            driver: GatewayDriver::default(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            services: HashMap::new(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Gateway driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GatewayDriver {
    /// HTTP transport (default)
    #[default]
    Http,
    /// In-process services, nothing leaves the process
    Memory,
}

/// Migration run configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrateConfig {
    /// Run the user, friends and pages stages concurrently once the
    /// category/post/comment chain is done
    #[serde(default)]
    pub parallel_independent: bool,
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - NOTEVA_MIGRATE_GATEWAY_DRIVER
    /// - NOTEVA_MIGRATE_GATEWAY_BASE_URL
    /// - NOTEVA_MIGRATE_GATEWAY_TIMEOUT_SECS
    /// - NOTEVA_MIGRATE_PARALLEL_INDEPENDENT
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(driver) = std::env::var("NOTEVA_MIGRATE_GATEWAY_DRIVER") {
            match driver.to_lowercase().as_str() {
                "http" => self.gateway.driver = GatewayDriver::Http,
                "memory" => self.gateway.driver = GatewayDriver::Memory,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(base_url) = std::env::var("NOTEVA_MIGRATE_GATEWAY_BASE_URL") {
            self.gateway.base_url = base_url;
        }
        if let Ok(timeout) = std::env::var("NOTEVA_MIGRATE_GATEWAY_TIMEOUT_SECS") {
            if let Ok(timeout) = timeout.parse::<u64>() {
                self.gateway.timeout_secs = timeout;
            }
        }
        if let Ok(parallel) = std::env::var("NOTEVA_MIGRATE_PARALLEL_INDEPENDENT") {
            match parallel.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.migrate.parallel_independent = true,
                "0" | "false" | "no" => self.migrate.parallel_independent = false,
                _ => {}
            }
        }
    }
}

impl GatewayConfig {
    /// Base URL for a service, honoring per-service overrides
    pub fn service_url(&self, service: &str) -> String {
        match self.services.get(service) {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("{}/{}", self.base_url.trim_end_matches('/'), service),
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
