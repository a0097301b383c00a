//! Structured logging setup helpers.
//!
//! The subscriber itself is installed by `serve`; this module turns a
//! [`LoggingConfig`](crate::config::LoggingConfig) into filter directives and
//! holds the helpers used to keep user content out of logs by default.

pub mod fields;

pub use fields::{outcome_label, truncate_preview, PREVIEW_CHARS};

/// Build filter directives string from LoggingConfig
///
/// Produces `"<base>,llmdeck::<component>=<level>,..."`. Components are
/// emitted in sorted order so the result is stable.
///
/// # Examples
///
/// ```
/// use llmdeck::config::{LogFormat, LoggingConfig};
/// use llmdeck::logging::build_filter_directives;
/// use std::collections::HashMap;
///
/// let mut component_levels = HashMap::new();
/// component_levels.insert("stress".to_string(), "debug".to_string());
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     format: LogFormat::Pretty,
///     component_levels: Some(component_levels),
///     enable_content_logging: false,
/// };
///
/// assert_eq!(build_filter_directives(&config), "info,llmdeck::stress=debug");
/// ```
pub fn build_filter_directives(config: &crate::config::LoggingConfig) -> String {
    let mut filter_str = config.level.clone();

    if let Some(component_levels) = &config.component_levels {
        let mut components: Vec<_> = component_levels.iter().collect();
        components.sort();
        for (component, level) in components {
            filter_str.push_str(&format!(",llmdeck::{}={}", component, level));
        }
    }

    filter_str
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoggingConfig;
    use std::collections::HashMap;

    #[test]
    fn test_filter_without_components() {
        let config = LoggingConfig {
            level: "warn".to_string(),
            ..Default::default()
        };
        assert_eq!(build_filter_directives(&config), "warn");
    }

    #[test]
    fn test_filter_components_sorted() {
        let mut levels = HashMap::new();
        levels.insert("upstream".to_string(), "trace".to_string());
        levels.insert("api".to_string(), "debug".to_string());
        let config = LoggingConfig {
            component_levels: Some(levels),
            ..Default::default()
        };
        assert_eq!(
            build_filter_directives(&config),
            "info,llmdeck::api=debug,llmdeck::upstream=trace"
        );
    }
}
