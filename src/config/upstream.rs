//! Default inference server configuration

use serde::{Deserialize, Serialize};

/// Where the dashboard talks to when a request carries no `serverUrl`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub url: String,
    /// Deadline for the version probe of a connection test
    pub connect_timeout_seconds: u64,
    /// Deadline for the model-count probe of a connection test
    pub tags_timeout_seconds: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434".to_string(),
            connect_timeout_seconds: 10,
            tags_timeout_seconds: 5,
        }
    }
}

impl UpstreamConfig {
    /// Resolve the server URL for a request, falling back to the configured one.
    ///
    /// Trailing slashes are stripped so paths can be appended with `format!`.
    pub fn resolve(&self, requested: Option<&str>) -> String {
        let url = match requested {
            Some(u) if !u.trim().is_empty() => u.trim(),
            _ => self.url.as_str(),
        };
        url.trim_end_matches('/').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_defaults() {
        let config = UpstreamConfig::default();
        assert_eq!(config.url, "http://localhost:11434");
        assert_eq!(config.connect_timeout_seconds, 10);
        assert_eq!(config.tags_timeout_seconds, 5);
    }

    #[test]
    fn test_resolve_prefers_requested_url() {
        let config = UpstreamConfig::default();
        assert_eq!(
            config.resolve(Some("http://gpu-box:11434/")),
            "http://gpu-box:11434"
        );
    }

    #[test]
    fn test_resolve_falls_back_on_blank() {
        let config = UpstreamConfig::default();
        assert_eq!(config.resolve(Some("  ")), "http://localhost:11434");
        assert_eq!(config.resolve(None), "http://localhost:11434");
    }
}
