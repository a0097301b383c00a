//! Configuration module for llmdeck
//!
//! Configuration is layered; later layers win:
//!
//! 1. Default values
//! 2. Configuration file (TOML)
//! 3. Environment variables (`LLMDECK_*`)
//! 4. CLI arguments
//!
//! # Example
//!
//! ```rust
//! use llmdeck::config::DeckConfig;
//!
//! let config: DeckConfig = toml::from_str("[server]\nport = 9000").unwrap();
//! assert_eq!(config.server.port, 9000);
//! assert_eq!(config.upstream.url, "http://localhost:11434");
//! ```

pub mod error;
pub mod logging;
pub mod prompts;
pub mod server;
pub mod stress;
pub mod upstream;

pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use prompts::PromptsConfig;
pub use server::ServerConfig;
pub use stress::StressDefaults;
pub use upstream::UpstreamConfig;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Example configuration written by `llmdeck config init`.
pub const EXAMPLE_CONFIG: &str = include_str!("../../llmdeck.example.toml");

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DeckConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub stress: StressDefaults,
    pub prompts: PromptsConfig,
    pub logging: LoggingConfig,
}

impl DeckConfig {
    /// Load configuration from a TOML file.
    ///
    /// `None` yields the defaults; a path that does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Load the file if present, defaults otherwise, then apply env overrides.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        let config = if path.exists() {
            Self::load(Some(path))?
        } else {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };
        Ok(config.with_env_overrides())
    }

    /// Apply `LLMDECK_*` environment overrides. Unparseable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(port) = std::env::var("LLMDECK_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(host) = std::env::var("LLMDECK_HOST") {
            self.server.host = host;
        }
        if let Ok(url) = std::env::var("LLMDECK_SERVER_URL") {
            if !url.trim().is_empty() {
                self.upstream.url = url;
            }
        }
        if let Ok(level) = std::env::var("LLMDECK_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("LLMDECK_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }
        if let Ok(path) = std::env::var("LLMDECK_PROMPTS_PATH") {
            self.prompts.path = PathBuf::from(path);
        }
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(validation("server.port", "port must be non-zero"));
        }
        if self.upstream.url.trim().is_empty() {
            return Err(validation("upstream.url", "URL cannot be empty"));
        }
        if self.stress.iterations == 0 {
            return Err(validation("stress.iterations", "must be at least 1"));
        }
        if self.stress.concurrent_requests == 0 {
            return Err(validation("stress.concurrent_requests", "must be at least 1"));
        }
        if self.stress.max_models == 0 {
            return Err(validation("stress.max_models", "must be at least 1"));
        }
        Ok(())
    }
}

fn validation(field: &str, message: &str) -> ConfigError {
    ConfigError::Validation {
        field: field.to_string(),
        message: message.to_string(),
    }
}
