//! Validation primitives shared by the transform and view pipelines.
//!
//! Every value crossing into the core from user input or file parsing
//! passes through one of these. They have two callers in mind: strict
//! mode (fail loudly, used in tests and debug builds) and graceful mode
//! (clamp and log, used in release builds so malformed files never
//! crash the UI).

use std::env;

use tracing::warn;

/// Returns `value` if finite, else `default`.
pub fn validate_finite(value: f64, default: f64) -> f64 {
    if value.is_finite() { value } else { default }
}

/// Clamps `value` to `[min_scale, max_scale]` after rejecting non-finite
/// or non-positive input (which fall back to `default`).
pub fn validate_scale(value: f64, min_scale: f64, max_scale: f64, default: f64) -> f64 {
    if !value.is_finite() || value <= 0.0 {
        return default;
    }
    value.clamp(min_scale, max_scale)
}

/// Replaces either coordinate with 0.0 if it is not finite.
pub fn validate_point(x: f64, y: f64) -> (f64, f64) {
    let vx = if x.is_finite() { x } else { 0.0 };
    let vy = if y.is_finite() { y } else { 0.0 };
    (vx, vy)
}

/// Minimum magnitude a scale factor may have before it's treated as a
/// division-by-zero hazard.
pub const MIN_SCALE_VALUE: f64 = 1e-10;

/// Default quantization precision for cache keys, in pixels.
pub const DEFAULT_PRECISION: f64 = 0.1;

/// Zoom/fit_scale parameters quantize at `DEFAULT_PRECISION / ZOOM_PRECISION_FACTOR`.
pub const ZOOM_PRECISION_FACTOR: f64 = 100.0;

/// Controls whether validation failures are rejected (strict) or
/// clamped with a log (graceful), and the numeric bounds used either way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationConfig {
    pub enable_full_validation: bool,
    pub max_coordinate: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    pub max_offset: f64,
    pub max_display: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enable_full_validation: cfg!(debug_assertions),
            max_coordinate: 1e12,
            min_scale: MIN_SCALE_VALUE,
            max_scale: 1e10,
            max_offset: 1e9,
            max_display: 1e6,
        }
    }
}

impl ValidationConfig {
    /// Production config: fast, critical checks only.
    pub fn for_production() -> Self {
        Self {
            enable_full_validation: false,
            ..Self::default()
        }
    }

    /// Debug config: comprehensive validation, fails fast.
    pub fn for_debug() -> Self {
        Self {
            enable_full_validation: true,
            ..Self::default()
        }
    }

    /// Builds a config from `CURVE_EDITOR_FULL_VALIDATION`,
    /// `CURVE_EDITOR_MAX_COORDINATE`, `CURVE_EDITOR_MIN_SCALE`, and
    /// `CURVE_EDITOR_MAX_SCALE`, falling back to debug/release defaults.
    pub fn from_environment() -> Self {
        let enable_full = match env::var("CURVE_EDITOR_FULL_VALIDATION") {
            Ok(v) if !v.is_empty() => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"),
            _ => cfg!(debug_assertions),
        };

        let max_coordinate = env_f64("CURVE_EDITOR_MAX_COORDINATE", 1e12);
        let min_scale = env_f64("CURVE_EDITOR_MIN_SCALE", MIN_SCALE_VALUE);
        let max_scale = env_f64("CURVE_EDITOR_MAX_SCALE", 1e10);

        Self {
            enable_full_validation: enable_full,
            max_coordinate,
            min_scale,
            max_scale,
            ..Self::default()
        }
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    match env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(v) => v,
            Err(_) => {
                warn!(target: "validation", key, raw, "failed to parse env var as f64, using default");
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_finite_passes_through() {
        assert_eq!(validate_finite(3.5, 0.0), 3.5);
    }

    #[test]
    fn validate_finite_replaces_nan() {
        assert_eq!(validate_finite(f64::NAN, 7.0), 7.0);
        assert_eq!(validate_finite(f64::INFINITY, 7.0), 7.0);
    }

    #[test]
    fn validate_scale_clamps_range() {
        assert_eq!(validate_scale(1e20, 1e-10, 1e10, 1.0), 1e10);
        assert_eq!(validate_scale(1e-20, 1e-10, 1e10, 1.0), 1e-10);
    }

    #[test]
    fn validate_scale_rejects_non_positive() {
        assert_eq!(validate_scale(-1.0, 1e-10, 1e10, 1.0), 1.0);
        assert_eq!(validate_scale(0.0, 1e-10, 1e10, 1.0), 1.0);
    }

    #[test]
    fn validate_point_zeroes_non_finite() {
        assert_eq!(validate_point(f64::NAN, 2.0), (0.0, 2.0));
        assert_eq!(validate_point(1.0, f64::INFINITY), (1.0, 0.0));
    }

    #[test]
    fn default_config_matches_build_profile() {
        let config = ValidationConfig::default();
        assert_eq!(config.enable_full_validation, cfg!(debug_assertions));
    }
}
