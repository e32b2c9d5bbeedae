//! Immutable view parameters: widget/display/image sizing, zoom and
//! pan, and the quantization used to key the transform cache.

use crate::validation::{validate_finite, validate_scale, ValidationConfig, DEFAULT_PRECISION, MIN_SCALE_VALUE, ZOOM_PRECISION_FACTOR};

/// Everything needed to derive a [`crate::transform::Transform`]:
/// widget and content sizing, user zoom/pan, and the flags that change
/// how scale and flip are applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub display_width: f64,
    pub display_height: f64,
    pub widget_width: i32,
    pub widget_height: i32,
    pub image_width: i32,
    pub image_height: i32,
    pub zoom_factor: f64,
    pub fit_scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub manual_x_offset: f64,
    pub manual_y_offset: f64,
    pub scale_to_image: bool,
    pub flip_y_axis: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            display_width: 1920.0,
            display_height: 1080.0,
            widget_width: 1920,
            widget_height: 1080,
            image_width: 1920,
            image_height: 1080,
            zoom_factor: 1.0,
            fit_scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            manual_x_offset: 0.0,
            manual_y_offset: 0.0,
            scale_to_image: false,
            flip_y_axis: false,
        }
    }
}

impl ViewState {
    /// Builds a ViewState from widget dimensions, defaulting display
    /// and image size to the widget size (fit-to-widget convention).
    pub fn from_widget(widget_width: i32, widget_height: i32) -> Self {
        Self {
            widget_width,
            widget_height,
            display_width: widget_width as f64,
            display_height: widget_height as f64,
            image_width: widget_width,
            image_height: widget_height,
            ..Self::default()
        }
    }

    /// Sanitizes and clamps every field per `config`, the way
    /// construction always does before the value is used.
    pub fn validated(self, config: &ValidationConfig) -> Self {
        Self {
            display_width: validate_finite(self.display_width, 0.0).max(0.0),
            display_height: validate_finite(self.display_height, 0.0).max(0.0),
            widget_width: self.widget_width.max(0),
            widget_height: self.widget_height.max(0),
            image_width: self.image_width.max(0),
            image_height: self.image_height.max(0),
            zoom_factor: validate_scale(self.zoom_factor, config.min_scale, config.max_scale, 1.0),
            fit_scale: validate_scale(self.fit_scale, config.min_scale, config.max_scale, 1.0),
            offset_x: validate_finite(self.offset_x, 0.0).clamp(-config.max_offset, config.max_offset),
            offset_y: validate_finite(self.offset_y, 0.0).clamp(-config.max_offset, config.max_offset),
            manual_x_offset: validate_finite(self.manual_x_offset, 0.0).clamp(-config.max_offset, config.max_offset),
            manual_y_offset: validate_finite(self.manual_y_offset, 0.0).clamp(-config.max_offset, config.max_offset),
            scale_to_image: self.scale_to_image,
            flip_y_axis: self.flip_y_axis,
        }
    }

    /// Returns a new ViewState with `f` applied to a mutable copy of
    /// `self`. Used for the common one-or-two-field update case, e.g.
    /// `view.with_updates(|v| v.zoom_factor = 2.0)`.
    pub fn with_updates(&self, f: impl FnOnce(&mut Self)) -> Self {
        let mut next = *self;
        f(&mut next);
        next
    }

    /// Effective scale combining fit and user zoom.
    pub fn effective_scale(&self) -> f64 {
        self.fit_scale * self.zoom_factor
    }

    /// Rounds every float parameter to `precision` pixels (zoom and
    /// fit_scale to `precision / ZOOM_PRECISION_FACTOR`) for use as a
    /// cache key. Non-finite values map to 0 before rounding; zoom is
    /// re-clamped to `MIN_SCALE_VALUE` afterward, but only when the
    /// original value was finite.
    pub fn quantized_for_cache(&self, precision: f64) -> Self {
        self.quantized_for_cache_with(precision, precision / ZOOM_PRECISION_FACTOR)
    }

    /// Same as [`Self::quantized_for_cache`] but with the zoom/fit_scale
    /// step set independently of `precision`, for callers whose
    /// zoom-precision setting diverges from the default ratio.
    pub fn quantized_for_cache_with(&self, precision: f64, zoom_precision: f64) -> Self {
        let quantize = |v: f64, step: f64| -> f64 {
            let safe = if v.is_finite() { v } else { 0.0 };
            if step <= 0.0 {
                safe
            } else {
                (safe / step).round() * step
            }
        };

        let zoom_factor = {
            let q = quantize(self.zoom_factor, zoom_precision);
            if self.zoom_factor.is_finite() { q.max(MIN_SCALE_VALUE) } else { q }
        };
        let fit_scale = {
            let q = quantize(self.fit_scale, zoom_precision);
            if self.fit_scale.is_finite() { q.max(MIN_SCALE_VALUE) } else { q }
        };

        Self {
            display_width: quantize(self.display_width, precision),
            display_height: quantize(self.display_height, precision),
            widget_width: self.widget_width,
            widget_height: self.widget_height,
            image_width: self.image_width,
            image_height: self.image_height,
            zoom_factor,
            fit_scale,
            offset_x: quantize(self.offset_x, precision),
            offset_y: quantize(self.offset_y, precision),
            manual_x_offset: quantize(self.manual_x_offset, precision),
            manual_y_offset: quantize(self.manual_y_offset, precision),
            scale_to_image: self.scale_to_image,
            flip_y_axis: self.flip_y_axis,
        }
    }
}

/// Default quantization precision for [`ViewState::quantized_for_cache`].
pub const DEFAULT_QUANTIZATION_PRECISION: f64 = DEFAULT_PRECISION;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_scale_multiplies_fit_and_zoom() {
        let view = ViewState { fit_scale: 2.0, zoom_factor: 1.5, ..ViewState::default() };
        assert_eq!(view.effective_scale(), 3.0);
    }

    #[test]
    fn with_updates_returns_new_instance() {
        let view = ViewState::default();
        let updated = view.with_updates(|v| v.zoom_factor = 4.0);
        assert_eq!(view.zoom_factor, 1.0);
        assert_eq!(updated.zoom_factor, 4.0);
    }

    #[test]
    fn quantized_for_cache_rounds_to_precision() {
        let view = ViewState { offset_x: 123.456, offset_y: 7.001, ..ViewState::default() };
        let q = view.quantized_for_cache(DEFAULT_QUANTIZATION_PRECISION);
        assert!((q.offset_x - 123.5).abs() < 1e-9);
        assert!((q.offset_y - 7.0).abs() < 1e-9);
    }

    #[test]
    fn quantized_for_cache_maps_non_finite_to_zero() {
        let view = ViewState { offset_x: f64::NAN, ..ViewState::default() };
        let q = view.quantized_for_cache(DEFAULT_QUANTIZATION_PRECISION);
        assert_eq!(q.offset_x, 0.0);
    }

    #[test]
    fn quantized_zoom_uses_finer_precision_and_floor() {
        let view = ViewState { zoom_factor: 1e-15, ..ViewState::default() };
        let q = view.quantized_for_cache(DEFAULT_QUANTIZATION_PRECISION);
        assert!(q.zoom_factor >= MIN_SCALE_VALUE);
    }

    #[test]
    fn integer_and_boolean_fields_pass_through() {
        let view = ViewState { widget_width: 777, flip_y_axis: true, ..ViewState::default() };
        let q = view.quantized_for_cache(DEFAULT_QUANTIZATION_PRECISION);
        assert_eq!(q.widget_width, 777);
        assert!(q.flip_y_axis);
    }
}
