//! Process-wide application configuration, read once from the
//! environment and shared via a lazily-initialized singleton.

use std::env;
use std::sync::OnceLock;

/// Flags that don't belong to validation or the transform cache but
/// still vary by environment: whether debug-level validation is forced
/// on regardless of build profile, and whether loaders should prefer
/// coordinate-metadata-aware curve data over legacy tuples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppConfig {
    pub force_debug_validation: bool,
    pub use_metadata_aware_data: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { force_debug_validation: false, use_metadata_aware_data: true }
    }
}

impl AppConfig {
    /// Builds a config from `CURVE_EDITOR_DEBUG_VALIDATION` and
    /// `USE_METADATA_AWARE_DATA` (both default-on/off per field
    /// default, parsed as `1`/`true`/`yes` case-insensitively).
    pub fn from_environment() -> Self {
        Self {
            force_debug_validation: env_bool("CURVE_EDITOR_DEBUG_VALIDATION", false),
            use_metadata_aware_data: env_bool("USE_METADATA_AWARE_DATA", true),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "force_debug_validation={}, use_metadata_aware_data={}",
            self.force_debug_validation, self.use_metadata_aware_data
        )
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) if !v.is_empty() => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"),
        _ => default,
    }
}

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Returns the process-wide config, initializing it from the
/// environment on first access.
pub fn get_config() -> &'static AppConfig {
    CONFIG.get_or_init(AppConfig::from_environment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_python_defaults() {
        let config = AppConfig::default();
        assert!(!config.force_debug_validation);
        assert!(config.use_metadata_aware_data);
    }

    #[test]
    fn summary_mentions_both_fields() {
        let summary = AppConfig::default().summary();
        assert!(summary.contains("force_debug_validation"));
        assert!(summary.contains("use_metadata_aware_data"));
    }
}
