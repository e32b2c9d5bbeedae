//! Curve and point types, and the metadata-aware wrapper that carries a
//! curve's coordinate convention alongside its data for lossless
//! round-trip normalization.

use serde::{Deserialize, Serialize};

use crate::coordinate::{CoordinateMetadata, CoordinateOrigin, CoordinateSystem};
use crate::error::{CurveEditorError, Result};

/// The role a point plays within its curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointStatus {
    Keyframe,
    Interpolated,
    Tracked,
    Endframe,
    Normal,
}

impl PointStatus {
    /// Maps a legacy boolean flag: `true` means interpolated, `false`
    /// means keyframe.
    pub fn from_legacy_bool(interpolated: bool) -> Self {
        if interpolated { PointStatus::Interpolated } else { PointStatus::Keyframe }
    }
}

/// One sample of a curve: a frame number, a position, and a status.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub frame: i32,
    pub x: f64,
    pub y: f64,
    pub status: PointStatus,
}

impl Point {
    pub fn new(frame: i32, x: f64, y: f64, status: PointStatus) -> Self {
        Self { frame, x, y, status }
    }

    /// Builds a point from a legacy 3-tuple lacking status, defaulted
    /// to `normal`.
    pub fn from_legacy_tuple(frame: i32, x: f64, y: f64) -> Self {
        Self::new(frame, x, y, PointStatus::Normal)
    }
}

/// An ordered, frame-keyed sequence of points. Always kept sorted by
/// frame with no duplicate frames.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    points: Vec<Point>,
}

impl Curve {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn from_points(mut points: Vec<Point>) -> Result<Self> {
        points.sort_by_key(|p| p.frame);
        for window in points.windows(2) {
            if window[0].frame == window[1].frame {
                return Err(CurveEditorError::InvalidInput(format!(
                    "duplicate frame {} in curve",
                    window[0].frame
                )));
            }
        }
        Ok(Self { points })
    }

    /// Wraps `points` as-is, preserving their order and allowing
    /// duplicate frames. For callers (such as a raw point store) whose
    /// own indexing already governs identity and must not be disturbed
    /// by [`Self::from_points`]'s sort.
    pub(crate) fn from_raw_points(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Inserts `point`, rejecting a duplicate frame. Keeps the sequence
    /// sorted by frame.
    pub fn insert(&mut self, point: Point) -> Result<()> {
        match self.points.binary_search_by_key(&point.frame, |p| p.frame) {
            Ok(_) => Err(CurveEditorError::InvalidInput(format!(
                "duplicate frame {} in curve",
                point.frame
            ))),
            Err(idx) => {
                self.points.insert(idx, point);
                Ok(())
            }
        }
    }

    /// Linear scan for the point at `frame`, matching the reference
    /// semantics over a sorted small-to-medium sequence.
    pub fn point_at_frame(&self, frame: i32) -> Option<&Point> {
        self.points.iter().find(|p| p.frame == frame)
    }

    pub fn frames(&self) -> Vec<i32> {
        self.points.iter().map(|p| p.frame).collect()
    }

    /// Bounding box `(min_x, min_y, max_x, max_y)` across all points;
    /// `(0, 0, 0, 0)` when empty.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        match crate::mathutil::bounding_box(
            &self.points.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>(),
        ) {
            Some(b) => b,
            None => (0.0, 0.0, 0.0, 0.0),
        }
    }
}

/// A curve paired with the coordinate convention its points are
/// expressed in, supporting lossless conversion to and from the
/// canonical internal system.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveDataWithMetadata {
    pub data: Curve,
    pub metadata: Option<CoordinateMetadata>,
    pub is_normalized: bool,
}

impl CurveDataWithMetadata {
    pub fn new(data: Curve, metadata: Option<CoordinateMetadata>) -> Self {
        Self { data, metadata, is_normalized: false }
    }

    pub fn with_metadata(mut self, metadata: CoordinateMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Maps every point into the canonical internal system (top-left
    /// origin, pixel units), tagging the result with
    /// `curve_editor_internal` metadata that preserves width, height,
    /// unit_scale, and pixel_aspect_ratio from the source. A curve
    /// lacking metadata is assumed Qt top-left 1920x1080 first.
    pub fn to_normalized(&self) -> Self {
        let source_metadata = self
            .metadata
            .unwrap_or_else(|| CoordinateMetadata::new(CoordinateSystem::QtScreen, CoordinateOrigin::TopLeft, 1920, 1080));

        let mut target = source_metadata;
        target.system = CoordinateSystem::CurveEditorInternal;
        target.origin = CoordinateOrigin::TopLeft;
        target.uses_normalized_coordinates = false;

        let points = self
            .data
            .points()
            .iter()
            .map(|p| {
                let (x, y) = source_metadata.to_normalized(p.x, p.y);
                Point::new(p.frame, x, y, p.status)
            })
            .collect();

        Self {
            data: Curve { points },
            metadata: Some(target),
            is_normalized: true,
        }
    }

    /// Inverse of [`Self::to_normalized`]: maps each point via
    /// `target_metadata.from_normalized` and tags the result as
    /// non-normalized data in `target_metadata`'s convention.
    pub fn from_normalized(&self, target_metadata: CoordinateMetadata) -> Result<Self> {
        if !self.is_normalized {
            return Err(CurveEditorError::NotNormalized);
        }

        let points = self
            .data
            .points()
            .iter()
            .map(|p| {
                let (x, y) = target_metadata.from_normalized(p.x, p.y);
                Point::new(p.frame, x, y, p.status)
            })
            .collect();

        Ok(Self {
            data: Curve { points },
            metadata: Some(target_metadata),
            is_normalized: false,
        })
    }

    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.data.bounds()
    }

    pub fn point_at_frame(&self, frame: i32) -> Option<&Point> {
        self.data.point_at_frame(frame)
    }

    pub fn frame_count(&self) -> usize {
        self.data.len()
    }
}

/// Default metadata assumed for a file-type hint when no detector is
/// available (`"2dtrack"`/`"3de"` -> 3DE bottom-left 1280x720,
/// `"nuke"`/`".nk"` -> Nuke bottom-left 1920x1080, `"maya"`/`".ma"`/
/// `".mb"` -> Maya center 1920x1080, else Qt top-left 1920x1080).
pub fn create_metadata_from_file_type(hint: &str) -> CoordinateMetadata {
    let lower = hint.to_lowercase();
    if lower.contains("2dtrack") || lower.contains("3de") || lower.contains("3dequalizer") {
        CoordinateMetadata::new(CoordinateSystem::ThreeDeEqualizer, CoordinateOrigin::BottomLeft, 1280, 720)
    } else if lower.contains("nuke") || lower.contains(".nk") {
        CoordinateMetadata::new(CoordinateSystem::Nuke, CoordinateOrigin::BottomLeft, 1920, 1080)
    } else if lower.contains("maya") || lower.contains(".ma") || lower.contains(".mb") {
        CoordinateMetadata::new(CoordinateSystem::Maya, CoordinateOrigin::Center, 1920, 1080)
    } else {
        CoordinateMetadata::new(CoordinateSystem::QtScreen, CoordinateOrigin::TopLeft, 1920, 1080)
    }
}

/// Wraps legacy (status-less) point data with metadata inferred from a
/// file-type hint.
pub fn wrap_legacy_data(points: Vec<(i32, f64, f64)>, file_hint: &str) -> Result<CurveDataWithMetadata> {
    let points = points
        .into_iter()
        .map(|(frame, x, y)| Point::from_legacy_tuple(frame, x, y))
        .collect();
    let curve = Curve::from_points(points)?;
    Ok(CurveDataWithMetadata::new(curve, Some(create_metadata_from_file_type(file_hint))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_rejects_duplicate_frames() {
        let points = vec![Point::from_legacy_tuple(1, 0.0, 0.0), Point::from_legacy_tuple(1, 1.0, 1.0)];
        assert!(Curve::from_points(points).is_err());
    }

    #[test]
    fn curve_sorts_by_frame() {
        let points = vec![
            Point::from_legacy_tuple(3, 0.0, 0.0),
            Point::from_legacy_tuple(1, 0.0, 0.0),
            Point::from_legacy_tuple(2, 0.0, 0.0),
        ];
        let curve = Curve::from_points(points).unwrap();
        assert_eq!(curve.frames(), vec![1, 2, 3]);
    }

    #[test]
    fn bounds_of_empty_curve_is_zero() {
        assert_eq!(Curve::new().bounds(), (0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn to_normalized_then_from_normalized_round_trips() {
        let md = CoordinateMetadata::new(CoordinateSystem::ThreeDeEqualizer, CoordinateOrigin::BottomLeft, 1280, 720);
        let curve = Curve::from_points(vec![Point::new(1, 640.0, 100.0, PointStatus::Keyframe)]).unwrap();
        let wrapped = CurveDataWithMetadata::new(curve, Some(md));

        let normalized = wrapped.to_normalized();
        assert!(normalized.is_normalized);
        let p = normalized.point_at_frame(1).unwrap();
        assert_eq!((p.x, p.y), (640.0, 620.0));

        let restored = normalized.from_normalized(md).unwrap();
        let rp = restored.point_at_frame(1).unwrap();
        assert!((rp.x - 640.0).abs() < 1e-9);
        assert!((rp.y - 100.0).abs() < 1e-9);
        assert_eq!(rp.status, PointStatus::Keyframe);
    }

    #[test]
    fn from_normalized_rejects_non_normalized_input() {
        let curve = Curve::from_points(vec![Point::from_legacy_tuple(1, 0.0, 0.0)]).unwrap();
        let wrapped = CurveDataWithMetadata::new(curve, None);
        let target = CoordinateMetadata::new(CoordinateSystem::QtScreen, CoordinateOrigin::TopLeft, 1920, 1080);
        assert_eq!(wrapped.from_normalized(target), Err(CurveEditorError::NotNormalized));
    }

    #[test]
    fn legacy_bool_status_maps_correctly() {
        assert_eq!(PointStatus::from_legacy_bool(true), PointStatus::Interpolated);
        assert_eq!(PointStatus::from_legacy_bool(false), PointStatus::Keyframe);
    }
}
