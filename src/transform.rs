//! Immutable data-to-screen mapping derived from a [`ViewState`], plus
//! its bounded, quantized-key cache.

pub mod cache;

use std::hash::{Hash, Hasher};

use ahash::AHasher;

use crate::error::{CurveEditorError, Result};
use crate::validation::{validate_scale, ValidationConfig, MIN_SCALE_VALUE};
use crate::view::ViewState;

/// A fully resolved, invertible mapping between data and screen space,
/// precomputed from a [`ViewState`] so repeated point conversions are a
/// handful of multiplies and adds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub combined_scale_x: f64,
    pub combined_scale_y: f64,
    pub combined_offset_x: f64,
    pub combined_offset_y: f64,
    pub flip_y: bool,
    pub display_height: f64,
    pub stability_hash: u64,
}

impl Transform {
    /// Derives a Transform from `view`, validating per `config`. In
    /// strict mode, invalid scale or image-scale parameters fail with
    /// a typed error; in graceful mode they're clamped.
    pub fn from_view_state(view: &ViewState, config: &ValidationConfig) -> Result<Self> {
        let effective_scale = view.effective_scale();

        let scale = if config.enable_full_validation {
            if !effective_scale.is_finite() || effective_scale.abs() < MIN_SCALE_VALUE {
                return Err(CurveEditorError::InvalidScale(format!(
                    "effective scale {effective_scale} is not usable"
                )));
            }
            effective_scale
        } else {
            validate_scale(effective_scale, config.min_scale, config.max_scale, 1.0)
        };

        let (center_x, center_y) = calculate_center_offset(
            scale,
            view.scale_to_image,
            view.flip_y_axis,
            view.widget_width as f64,
            view.widget_height as f64,
            view.display_width,
            view.display_height,
        );

        let (image_scale_x, image_scale_y) = Self::resolve_image_scale(view, config)?;

        let combined_scale_x = scale * image_scale_x;
        let combined_scale_y = scale * image_scale_y;

        if combined_scale_x.abs() < MIN_SCALE_VALUE || combined_scale_y.abs() < MIN_SCALE_VALUE {
            if config.enable_full_validation {
                return Err(CurveEditorError::NonInvertible(
                    "combined scale underflowed below 1e-10".into(),
                ));
            }
        }
        let combined_scale_x = if combined_scale_x.abs() < MIN_SCALE_VALUE {
            MIN_SCALE_VALUE.copysign(combined_scale_x)
        } else {
            combined_scale_x
        };
        let combined_scale_y = if combined_scale_y.abs() < MIN_SCALE_VALUE {
            MIN_SCALE_VALUE.copysign(combined_scale_y)
        } else {
            combined_scale_y
        };

        let combined_offset_x = center_x + view.offset_x + view.manual_x_offset;
        let combined_offset_y = center_y + view.offset_y + view.manual_y_offset;

        let mut transform = Self {
            combined_scale_x,
            combined_scale_y,
            combined_offset_x,
            combined_offset_y,
            flip_y: view.flip_y_axis,
            display_height: view.display_height,
            stability_hash: 0,
        };
        transform.stability_hash = transform.compute_stability_hash();
        Ok(transform)
    }

    /// STEP2 critical validation: `image_scale_x`/`image_scale_y` are
    /// checked independently of the main scale against the same
    /// near-zero threshold.
    fn resolve_image_scale(view: &ViewState, config: &ValidationConfig) -> Result<(f64, f64)> {
        if !view.scale_to_image {
            return Ok((1.0, 1.0));
        }

        let raw_x = if view.image_width > 0 { view.display_width / view.image_width as f64 } else { 1.0 };
        let raw_y = if view.image_height > 0 { view.display_height / view.image_height as f64 } else { 1.0 };

        let check = |value: f64, label: &str| -> Result<f64> {
            if !value.is_finite() || value.abs() < MIN_SCALE_VALUE {
                if config.enable_full_validation {
                    return Err(CurveEditorError::InvalidScale(format!("{label} underflowed: {value}")));
                }
                return Ok(1.0);
            }
            Ok(value)
        };

        Ok((check(raw_x, "image_scale_x")?, check(raw_y, "image_scale_y")?))
    }

    fn compute_stability_hash(&self) -> u64 {
        let mut hasher = AHasher::default();
        self.combined_scale_x.to_bits().hash(&mut hasher);
        self.combined_scale_y.to_bits().hash(&mut hasher);
        self.combined_offset_x.to_bits().hash(&mut hasher);
        self.combined_offset_y.to_bits().hash(&mut hasher);
        self.flip_y.hash(&mut hasher);
        self.display_height.to_bits().hash(&mut hasher);
        hasher.finish()
    }

    /// Maps one data-space point to screen space.
    pub fn data_to_screen(&self, x: f64, y: f64) -> (f64, f64) {
        let y = if self.flip_y && self.display_height > 0.0 { self.display_height - y } else { y };
        let sx = x * self.combined_scale_x + self.combined_offset_x;
        let sy = y * self.combined_scale_y + self.combined_offset_y;
        (sx, sy)
    }

    /// Inverse of [`Self::data_to_screen`].
    pub fn screen_to_data(&self, sx: f64, sy: f64) -> Result<(f64, f64)> {
        if self.combined_scale_x.abs() < MIN_SCALE_VALUE || self.combined_scale_y.abs() < MIN_SCALE_VALUE {
            return Err(CurveEditorError::NonInvertible("combined scale below 1e-10".into()));
        }
        let x = (sx - self.combined_offset_x) / self.combined_scale_x;
        let mut y = (sy - self.combined_offset_y) / self.combined_scale_y;
        if self.flip_y && self.display_height > 0.0 {
            y = self.display_height - y;
        }
        Ok((x, y))
    }

    /// Vectorized forward mapping. Accepts points shaped as `(x, y)`
    /// pairs; use [`Self::data_to_screen`] per-row when frame numbers
    /// must be threaded through separately.
    #[cfg(feature = "parallel")]
    pub fn batch_data_to_screen(&self, points: &[(f64, f64)]) -> Vec<(f64, f64)> {
        use rayon::prelude::*;
        points.par_iter().map(|&(x, y)| self.data_to_screen(x, y)).collect()
    }

    #[cfg(not(feature = "parallel"))]
    pub fn batch_data_to_screen(&self, points: &[(f64, f64)]) -> Vec<(f64, f64)> {
        points.iter().map(|&(x, y)| self.data_to_screen(x, y)).collect()
    }

    /// Vectorized inverse mapping; fails on the first non-invertible
    /// point encountered in strict terms (the scale check is constant
    /// across the whole Transform, so either all points fail or none do).
    #[cfg(feature = "parallel")]
    pub fn batch_screen_to_data(&self, points: &[(f64, f64)]) -> Result<Vec<(f64, f64)>> {
        use rayon::prelude::*;
        if self.combined_scale_x.abs() < MIN_SCALE_VALUE || self.combined_scale_y.abs() < MIN_SCALE_VALUE {
            return Err(CurveEditorError::NonInvertible("combined scale below 1e-10".into()));
        }
        Ok(points.par_iter().map(|&(sx, sy)| self.screen_to_data(sx, sy).unwrap()).collect())
    }

    #[cfg(not(feature = "parallel"))]
    pub fn batch_screen_to_data(&self, points: &[(f64, f64)]) -> Result<Vec<(f64, f64)>> {
        points.iter().map(|&(sx, sy)| self.screen_to_data(sx, sy)).collect()
    }
}

/// Centering offset per the unified rule: identity scale with no
/// image-fit and no flip maps pixels directly; otherwise center the
/// scaled content within the widget.
#[allow(clippy::too_many_arguments)]
pub fn calculate_center_offset(
    scale: f64,
    scale_to_image: bool,
    flip_y_axis: bool,
    widget_width: f64,
    widget_height: f64,
    display_width: f64,
    display_height: f64,
) -> (f64, f64) {
    if scale == 1.0 && !scale_to_image && !flip_y_axis {
        return (0.0, 0.0);
    }
    let cx = (widget_width - display_width * scale) / 2.0;
    let cy = (widget_height - display_height * scale) / 2.0;
    (cx, cy)
}
