//! Bounded, quantized-key cache of [`Transform`] values. Sub-pixel view
//! changes during interaction quantize to the same key, so most lookups
//! hit without recomputing the transform.

use std::collections::VecDeque;
use std::env;
use std::sync::Mutex;

use ahash::AHashMap;
use tracing::{trace, warn};

use crate::error::Result;
use crate::transform::{calculate_center_offset, Transform};
use crate::validation::ValidationConfig;
use crate::view::ViewState;

/// Default bounded size of a [`TransformCache`].
pub const DEFAULT_CACHE_SIZE: usize = 512;

/// Default quantization precision, in pixels, applied to a ViewState
/// before it becomes a cache key.
pub const DEFAULT_QUANTIZATION_PRECISION: f64 = crate::validation::DEFAULT_PRECISION;

/// The 15 quantized parameters that uniquely determine a Transform.
/// Floats are carried as bits so the key can be hashed and compared
/// exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    scale: u64,
    center_x: u64,
    center_y: u64,
    pan_x: u64,
    pan_y: u64,
    manual_x: u64,
    manual_y: u64,
    flip_y: bool,
    display_height: u64,
    image_scale_x: u64,
    image_scale_y: u64,
    scale_to_image: bool,
    enable_full_validation: bool,
    max_coordinate: u64,
    max_scale: u64,
}

impl CacheKey {
    fn from_view_state(view: &ViewState, config: &ValidationConfig) -> Self {
        let bits = f64::to_bits;
        let image_scale_x = if view.scale_to_image && view.image_width > 0 {
            view.display_width / view.image_width as f64
        } else {
            1.0
        };
        let image_scale_y = if view.scale_to_image && view.image_height > 0 {
            view.display_height / view.image_height as f64
        } else {
            1.0
        };

        let (center_x, center_y) = calculate_center_offset(
            view.effective_scale(),
            view.scale_to_image,
            view.flip_y_axis,
            view.widget_width as f64,
            view.widget_height as f64,
            view.display_width,
            view.display_height,
        );

        Self {
            scale: bits(view.effective_scale()),
            center_x: bits(center_x),
            center_y: bits(center_y),
            pan_x: bits(view.offset_x),
            pan_y: bits(view.offset_y),
            manual_x: bits(view.manual_x_offset),
            manual_y: bits(view.manual_y_offset),
            flip_y: view.flip_y_axis,
            display_height: bits(view.display_height),
            image_scale_x: bits(image_scale_x),
            image_scale_y: bits(image_scale_y),
            scale_to_image: view.scale_to_image,
            enable_full_validation: config.enable_full_validation,
            max_coordinate: bits(config.max_coordinate),
            max_scale: bits(config.max_scale),
        }
    }
}

/// Hit/miss/bypass counters and current occupancy, as returned by
/// [`TransformCache::info`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CacheInfo {
    pub hits: u64,
    pub misses: u64,
    pub bypasses: u64,
    pub current_size: usize,
    pub max_size: usize,
}

impl CacheInfo {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 { 0.0 } else { self.hits as f64 / total as f64 }
    }
}

struct Inner {
    map: AHashMap<CacheKey, Transform>,
    order: VecDeque<CacheKey>,
    max_size: usize,
    precision: f64,
    zoom_precision: f64,
    hits: u64,
    misses: u64,
    bypasses: u64,
}

/// Process-wide cache of Transforms keyed on quantized ViewState
/// parameters. A single mutex guards lookup and insert; readers never
/// hold it longer than a hash and a map operation.
pub struct TransformCache {
    inner: Mutex<Inner>,
}

impl TransformCache {
    pub fn new(max_size: usize) -> Self {
        Self::with_precision(max_size, DEFAULT_QUANTIZATION_PRECISION, DEFAULT_QUANTIZATION_PRECISION / crate::validation::ZOOM_PRECISION_FACTOR)
    }

    fn with_precision(max_size: usize, precision: f64, zoom_precision: f64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                map: AHashMap::new(),
                order: VecDeque::new(),
                max_size,
                precision,
                zoom_precision,
                hits: 0,
                misses: 0,
                bypasses: 0,
            }),
        }
    }

    /// Builds a cache sized and tuned from `CURVE_EDITOR_CACHE_SIZE`,
    /// `CURVE_EDITOR_PRECISION`, and `CURVE_EDITOR_ZOOM_PRECISION`,
    /// falling back to the library defaults for any unset or
    /// unparseable variable.
    pub fn from_environment() -> Self {
        let max_size = match env::var("CURVE_EDITOR_CACHE_SIZE") {
            Ok(raw) => match raw.parse() {
                Ok(v) => v,
                Err(_) => {
                    warn!(target: "transform.cache", raw, "failed to parse CURVE_EDITOR_CACHE_SIZE, using default");
                    DEFAULT_CACHE_SIZE
                }
            },
            Err(_) => DEFAULT_CACHE_SIZE,
        };

        let precision = match env::var("CURVE_EDITOR_PRECISION") {
            Ok(raw) => match raw.parse() {
                Ok(v) => v,
                Err(_) => {
                    warn!(target: "transform.cache", raw, "failed to parse CURVE_EDITOR_PRECISION, using default");
                    DEFAULT_QUANTIZATION_PRECISION
                }
            },
            Err(_) => DEFAULT_QUANTIZATION_PRECISION,
        };

        let zoom_precision = match env::var("CURVE_EDITOR_ZOOM_PRECISION") {
            Ok(raw) => match raw.parse() {
                Ok(v) => v,
                Err(_) => {
                    warn!(target: "transform.cache", raw, "failed to parse CURVE_EDITOR_ZOOM_PRECISION, using default");
                    precision / crate::validation::ZOOM_PRECISION_FACTOR
                }
            },
            Err(_) => precision / crate::validation::ZOOM_PRECISION_FACTOR,
        };

        Self::with_precision(max_size, precision, zoom_precision)
    }

    /// Looks up (or builds and inserts) the Transform for `view` under
    /// `config`. Bypasses the cache entirely when `config` diverges
    /// from the environment default, since a mismatched config would
    /// otherwise poison the key space with stale entries.
    pub fn get_or_insert(&self, view: &ViewState, config: &ValidationConfig) -> Result<Transform> {
        let env_default = ValidationConfig::from_environment();
        if *config != env_default {
            let transform = Transform::from_view_state(view, config)?;
            let mut inner = self.inner.lock().unwrap();
            inner.bypasses += 1;
            trace!(target: "transform.cache", "bypassing cache: validation config does not match environment default");
            return Ok(transform);
        }

        let (precision, zoom_precision) = {
            let inner = self.inner.lock().unwrap();
            (inner.precision, inner.zoom_precision)
        };
        let quantized = view.quantized_for_cache_with(precision, zoom_precision);
        let key = CacheKey::from_view_state(&quantized, config);

        {
            let mut inner = self.inner.lock().unwrap();
            if let Some(transform) = inner.map.get(&key).copied() {
                inner.hits += 1;
                trace!(target: "transform.cache", "hit");
                return Ok(transform);
            }
        }

        let transform = Transform::from_view_state(&quantized, config)?;

        let mut inner = self.inner.lock().unwrap();
        inner.misses += 1;
        if !inner.map.contains_key(&key) {
            if inner.order.len() >= inner.max_size {
                if let Some(oldest) = inner.order.pop_front() {
                    inner.map.remove(&oldest);
                    trace!(target: "transform.cache", "evicted oldest entry");
                }
            }
            inner.order.push_back(key);
            inner.map.insert(key, transform);
        }
        Ok(transform)
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.map.clear();
        inner.order.clear();
        trace!(target: "transform.cache", "cleared");
    }

    pub fn info(&self) -> CacheInfo {
        let inner = self.inner.lock().unwrap();
        CacheInfo {
            hits: inner.hits,
            misses: inner.misses,
            bypasses: inner.bypasses,
            current_size: inner.map.len(),
            max_size: inner.max_size,
        }
    }

    /// Sets the quantization precision (and, proportionally, the zoom
    /// precision) used for future keys, clearing the cache since
    /// existing keys were derived under the old one.
    pub fn set_precision(&self, precision: f64) {
        let mut inner = self.inner.lock().unwrap();
        inner.zoom_precision = precision / crate::validation::ZOOM_PRECISION_FACTOR;
        inner.precision = precision;
        inner.map.clear();
        inner.order.clear();
    }
}

impl Default for TransformCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}
