//! Coordinate system model: which convention a tracking file's points
//! were recorded in, and the pure functions to move between it and the
//! canonical internal system (top-left origin, pixel units, no flip).

pub mod detector;

/// Where a tracking data source places its coordinate origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordinateOrigin {
    /// Qt/screen: Y=0 at top, increasing downward.
    TopLeft,
    /// 3DEqualizer/OpenGL: Y=0 at bottom, increasing upward.
    BottomLeft,
    /// (0,0) at the center of the frame.
    Center,
}

/// A named tracking/compositing convention. Each carries a fixed
/// `CoordinateOrigin` (see [`CoordinateSystem::default_origin`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordinateSystem {
    QtScreen,
    ThreeDeEqualizer,
    Maya,
    Nuke,
    OpenGl,
    CurveEditorInternal,
}

impl CoordinateSystem {
    pub fn default_origin(self) -> CoordinateOrigin {
        match self {
            CoordinateSystem::QtScreen => CoordinateOrigin::TopLeft,
            CoordinateSystem::ThreeDeEqualizer => CoordinateOrigin::BottomLeft,
            CoordinateSystem::Maya => CoordinateOrigin::Center,
            CoordinateSystem::Nuke => CoordinateOrigin::BottomLeft,
            CoordinateSystem::OpenGl => CoordinateOrigin::BottomLeft,
            CoordinateSystem::CurveEditorInternal => CoordinateOrigin::TopLeft,
        }
    }
}

/// Complete description of one coordinate convention: enough to map a
/// point in that convention to and from the canonical internal system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMetadata {
    pub system: CoordinateSystem,
    pub origin: CoordinateOrigin,
    pub width: i32,
    pub height: i32,
    pub unit_scale: f64,
    pub pixel_aspect_ratio: f64,
    pub uses_normalized_coordinates: bool,
}

impl CoordinateMetadata {
    pub fn new(system: CoordinateSystem, origin: CoordinateOrigin, width: i32, height: i32) -> Self {
        Self {
            system,
            origin,
            width,
            height,
            unit_scale: 1.0,
            pixel_aspect_ratio: 1.0,
            uses_normalized_coordinates: false,
        }
    }

    /// True iff this system's origin requires a Y-flip to display under
    /// a top-left convention (Qt).
    pub fn needs_y_flip_for_qt(&self) -> bool {
        self.origin == CoordinateOrigin::BottomLeft
    }

    /// Converts pixel coordinates to the `[0,1]` range, a no-op unless
    /// `uses_normalized_coordinates` is set.
    pub fn normalize_coordinates(&self, x: f64, y: f64) -> (f64, f64) {
        if !self.uses_normalized_coordinates {
            return (x, y);
        }
        let nx = if self.width > 0 { x / self.width as f64 } else { 0.0 };
        let ny = if self.height > 0 { y / self.height as f64 } else { 0.0 };
        (nx, ny)
    }

    /// Converts `[0,1]`-range coordinates to pixels, a no-op unless
    /// `uses_normalized_coordinates` is set.
    pub fn denormalize_coordinates(&self, x: f64, y: f64) -> (f64, f64) {
        if !self.uses_normalized_coordinates {
            return (x, y);
        }
        (x * self.width as f64, y * self.height as f64)
    }

    /// Converts a point from this system to the canonical top-left
    /// pixel space.
    pub fn to_normalized(&self, mut x: f64, mut y: f64) -> (f64, f64) {
        if self.pixel_aspect_ratio != 1.0 {
            x *= self.pixel_aspect_ratio;
        }
        x *= self.unit_scale;
        y *= self.unit_scale;

        match self.origin {
            CoordinateOrigin::BottomLeft => {
                y = self.height as f64 - y;
            }
            CoordinateOrigin::Center => {
                x += self.width as f64 / 2.0;
                y = self.height as f64 / 2.0 - y;
            }
            CoordinateOrigin::TopLeft => {}
        }

        (x, y)
    }

    /// Exact inverse of [`Self::to_normalized`].
    pub fn from_normalized(&self, mut x: f64, mut y: f64) -> (f64, f64) {
        match self.origin {
            CoordinateOrigin::BottomLeft => {
                y = self.height as f64 - y;
            }
            CoordinateOrigin::Center => {
                x -= self.width as f64 / 2.0;
                y = self.height as f64 / 2.0 - y;
            }
            CoordinateOrigin::TopLeft => {}
        }

        if self.unit_scale != 0.0 {
            x /= self.unit_scale;
            y /= self.unit_scale;
        }
        if self.pixel_aspect_ratio != 0.0 {
            x /= self.pixel_aspect_ratio;
        }

        (x, y)
    }
}

/// Default metadata for a file type string (`"2dtrack"`, `"3de"`,
/// `"nuke"`, anything else falls back to Qt screen).
pub fn create_source_metadata(file_type: &str, width: Option<i32>, height: Option<i32>) -> CoordinateMetadata {
    match file_type.to_lowercase().as_str() {
        "2dtrack" | "3de" | "3dequalizer" => CoordinateMetadata::new(
            CoordinateSystem::ThreeDeEqualizer,
            CoordinateOrigin::BottomLeft,
            width.unwrap_or(1280),
            height.unwrap_or(720),
        ),
        "nuke" => CoordinateMetadata::new(
            CoordinateSystem::Nuke,
            CoordinateOrigin::BottomLeft,
            width.unwrap_or(1920),
            height.unwrap_or(1080),
        ),
        _ => CoordinateMetadata::new(
            CoordinateSystem::QtScreen,
            CoordinateOrigin::TopLeft,
            width.unwrap_or(1920),
            height.unwrap_or(1080),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_bottom_left() {
        let md = CoordinateMetadata::new(CoordinateSystem::ThreeDeEqualizer, CoordinateOrigin::BottomLeft, 1280, 720);
        let (nx, ny) = md.to_normalized(640.0, 100.0);
        assert_eq!((nx, ny), (640.0, 620.0));
        let (x, y) = md.from_normalized(nx, ny);
        assert!((x - 640.0).abs() < 1e-9);
        assert!((y - 100.0).abs() < 1e-9);
    }

    #[test]
    fn round_trip_center() {
        let md = CoordinateMetadata::new(CoordinateSystem::Maya, CoordinateOrigin::Center, 1920, 1080);
        for (x, y) in [(0.0, 0.0), (100.0, -50.0), (-200.0, 300.0)] {
            let (nx, ny) = md.to_normalized(x, y);
            let (rx, ry) = md.from_normalized(nx, ny);
            assert!((rx - x).abs() < 1e-4, "x roundtrip failed: {rx} vs {x}");
            assert!((ry - y).abs() < 1e-4, "y roundtrip failed: {ry} vs {y}");
        }
    }

    #[test]
    fn round_trip_top_left_is_identity() {
        let md = CoordinateMetadata::new(CoordinateSystem::QtScreen, CoordinateOrigin::TopLeft, 1920, 1080);
        assert_eq!(md.to_normalized(10.0, 20.0), (10.0, 20.0));
        assert_eq!(md.from_normalized(10.0, 20.0), (10.0, 20.0));
    }

    #[test]
    fn denormalize_only_applies_when_flagged() {
        let mut md = CoordinateMetadata::new(CoordinateSystem::ThreeDeEqualizer, CoordinateOrigin::BottomLeft, 1280, 720);
        assert_eq!(md.denormalize_coordinates(0.5, 0.25), (0.5, 0.25));
        md.uses_normalized_coordinates = true;
        assert_eq!(md.denormalize_coordinates(0.5, 0.25), (640.0, 180.0));
    }

    #[test]
    fn needs_y_flip_for_qt_matches_origin() {
        let md = CoordinateMetadata::new(CoordinateSystem::Nuke, CoordinateOrigin::BottomLeft, 1920, 1080);
        assert!(md.needs_y_flip_for_qt());
        let md2 = CoordinateMetadata::new(CoordinateSystem::QtScreen, CoordinateOrigin::TopLeft, 1920, 1080);
        assert!(!md2.needs_y_flip_for_qt());
    }
}
