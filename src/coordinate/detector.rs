//! Infers [`CoordinateMetadata`] from a file path and, optionally, its
//! leading content — no manual configuration required for the common
//! VFX tracker export formats.

use std::path::Path;

use super::{CoordinateMetadata, CoordinateOrigin, CoordinateSystem};

const COMMON_RESOLUTIONS: &[(i32, i32)] = &[
    (1280, 720),
    (1920, 1080),
    (2560, 1440),
    (3840, 2160),
    (640, 480),
    (1024, 768),
];

/// Detects the coordinate convention a tracking file was authored in.
///
/// Runs content-based detection first (more reliable), then falls back
/// to extension and filename hints. Dimensions are extracted from
/// content when possible, otherwise inferred from the data's own range,
/// otherwise defaulted per system.
pub struct CoordinateDetector;

impl CoordinateDetector {
    pub fn detect_from_file(file_path: &str, content: Option<&str>) -> CoordinateMetadata {
        let system = content
            .and_then(|c| Self::detect_system_from_content(c))
            .or_else(|| Self::detect_system_from_extension(file_path));

        let (width, height) = content.map(Self::extract_dimensions).unwrap_or((None, None));

        let uses_normalized = matches!(system, Some(CoordinateSystem::ThreeDeEqualizer))
            && content.is_some_and(Self::has_normalized_coordinates);

        match system {
            Some(CoordinateSystem::ThreeDeEqualizer) => CoordinateMetadata {
                uses_normalized_coordinates: uses_normalized,
                ..CoordinateMetadata::new(
                    CoordinateSystem::ThreeDeEqualizer,
                    CoordinateOrigin::BottomLeft,
                    width.unwrap_or(1280),
                    height.unwrap_or(720),
                )
            },
            Some(CoordinateSystem::Nuke) => CoordinateMetadata::new(
                CoordinateSystem::Nuke,
                CoordinateOrigin::BottomLeft,
                width.unwrap_or(1920),
                height.unwrap_or(1080),
            ),
            Some(CoordinateSystem::Maya) => CoordinateMetadata::new(
                CoordinateSystem::Maya,
                CoordinateOrigin::Center,
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

    fn detect_system_from_extension(file_path: &str) -> Option<CoordinateSystem> {
        let path = Path::new(file_path);
        let name_lower = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_lowercase();

        if name_lower.contains("2dtrack") || name_lower.contains("3de") || name_lower.contains("3dequalizer") {
            return Some(CoordinateSystem::ThreeDeEqualizer);
        }
        if name_lower.contains("nuke") {
            return Some(CoordinateSystem::Nuke);
        }
        if name_lower.contains("maya") {
            return Some(CoordinateSystem::Maya);
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "2dt" | "3de" => Some(CoordinateSystem::ThreeDeEqualizer),
            "nk" => Some(CoordinateSystem::Nuke),
            "ma" | "mb" => Some(CoordinateSystem::Maya),
            _ => None,
        }
    }

    fn detect_system_from_content(content: &str) -> Option<CoordinateSystem> {
        let window = leading_window(content, 1024);
        let lower = window.to_lowercase();
        if ["3dequalizer", "3de", "2dtrack", "sdpx", "image"]
            .iter()
            .any(|token| lower.contains(token))
        {
            return Some(CoordinateSystem::ThreeDeEqualizer);
        }

        for line in window.lines() {
            let line_lower = line.to_lowercase();
            if ["3dequalizer", "2dtrack", "sdpx"].iter().any(|m| line_lower.contains(m)) {
                return Some(CoordinateSystem::ThreeDeEqualizer);
            }
            if line_lower.contains("nuke") || line_lower.contains("foundry") {
                return Some(CoordinateSystem::Nuke);
            }
            if line_lower.contains("maya") || line_lower.contains("autodesk") {
                return Some(CoordinateSystem::Maya);
            }
        }

        if Self::has_3de_structure(content) {
            return Some(CoordinateSystem::ThreeDeEqualizer);
        }
        if Self::looks_like_3de_data(content) {
            return Some(CoordinateSystem::ThreeDeEqualizer);
        }

        None
    }

    /// Matches the canonical 3DE header: version, name, identifier,
    /// frame count, then a well-formed first data row.
    fn has_3de_structure(content: &str) -> bool {
        let lines: Vec<&str> = content.trim().lines().collect();
        if lines.len() < 5 {
            return false;
        }

        let Ok(version) = lines[0].trim().parse::<i64>() else {
            return false;
        };
        if !(0..=100).contains(&version) {
            return false;
        }
        if lines[1].trim().is_empty() {
            return false;
        }
        let Ok(identifier) = lines[2].trim().parse::<i64>() else {
            return false;
        };
        if !(0..=1000).contains(&identifier) {
            return false;
        }
        let Ok(frame_count) = lines[3].trim().parse::<i64>() else {
            return false;
        };
        if !(1..=10000).contains(&frame_count) {
            return false;
        }

        let parts: Vec<&str> = lines[4].trim().split_whitespace().collect();
        if parts.len() < 3 {
            return false;
        }
        let (Ok(frame), Ok(x), Ok(y)) = (
            parts[0].parse::<i64>(),
            parts[1].parse::<f64>(),
            parts[2].parse::<f64>(),
        ) else {
            return false;
        };
        frame > 0 && (0.0..=10000.0).contains(&x) && (0.0..=10000.0).contains(&y)
    }

    /// Treats data as 3DE-shaped if frames run sequentially from 1 and
    /// every coordinate sits in a pixel or normalized range.
    fn looks_like_3de_data(content: &str) -> bool {
        let data_lines = parse_data_lines(content);
        if data_lines.len() < 2 {
            return false;
        }

        let frames: Vec<i64> = data_lines.iter().map(|(f, _, _)| *f).collect();
        let min_f = *frames.iter().min().unwrap();
        let max_f = *frames.iter().max().unwrap();
        if min_f != 1 || max_f - min_f != (frames.len() as i64 - 1) {
            return false;
        }

        let xs: Vec<f64> = data_lines.iter().map(|(_, x, _)| *x).collect();
        let ys: Vec<f64> = data_lines.iter().map(|(_, _, y)| *y).collect();
        let (min_x, max_x) = min_max(&xs);
        let (min_y, max_y) = min_max(&ys);

        let pixel_range = (0.0..=2000.0).contains(&min_x) && max_x <= 2000.0 && (0.0..=2000.0).contains(&min_y) && max_y <= 2000.0;
        let normalized_range = (0.0..=1.0).contains(&min_x) && max_x <= 1.0 && (0.0..=1.0).contains(&min_y) && max_y <= 1.0;
        pixel_range || normalized_range
    }

    fn has_normalized_coordinates(content: &str) -> bool {
        let data_lines = parse_data_lines(content);
        if data_lines.is_empty() {
            return false;
        }

        let xs: Vec<f64> = data_lines.iter().map(|(_, x, _)| *x).collect();
        let ys: Vec<f64> = data_lines.iter().map(|(_, _, y)| *y).collect();
        let (min_x, max_x) = min_max(&xs);
        let (min_y, max_y) = min_max(&ys);

        if !(min_x >= 0.0 && max_x <= 1.001 && min_y >= 0.0 && max_y <= 1.001) {
            return false;
        }
        if xs.len() == 1 {
            return true;
        }

        let x_range = max_x - min_x;
        let y_range = max_y - min_y;
        x_range > 0.0001 || y_range > 0.0001
    }

    fn extract_dimensions(content: &str) -> (Option<i32>, Option<i32>) {
        if let Some(dims) = extract_dimension_marker(content) {
            return (Some(dims.0), Some(dims.1));
        }
        if let Some(dims) = extract_width_height(content) {
            return (Some(dims.0), Some(dims.1));
        }
        match Self::infer_dimensions_from_data(content) {
            Some((w, h)) => (Some(w), Some(h)),
            None => (None, None),
        }
    }

    fn infer_dimensions_from_data(content: &str) -> Option<(i32, i32)> {
        let data_lines = parse_data_lines(content);
        if data_lines.is_empty() {
            return None;
        }
        let xs: Vec<f64> = data_lines.iter().map(|(_, x, _)| *x).collect();
        let ys: Vec<f64> = data_lines.iter().map(|(_, _, y)| *y).collect();
        let max_x = xs.iter().cloned().fold(f64::MIN, f64::max);
        let max_y = ys.iter().cloned().fold(f64::MIN, f64::max);

        for &(w, h) in COMMON_RESOLUTIONS {
            if max_x <= w as f64 * 1.1 && max_y <= h as f64 * 1.1 {
                return Some((w, h));
            }
        }

        let width = (((max_x + 9.0) / 10.0).floor() as i32) * 10;
        let height = (((max_y + 9.0) / 10.0).floor() as i32) * 10;
        if (100..=8000).contains(&width) && (100..=8000).contains(&height) {
            Some((width, height))
        } else {
            None
        }
    }
}

/// The first `max_bytes` of `content`, trimmed back to the nearest char
/// boundary so both token checks in `detect_system_from_content` scan
/// the same window instead of drifting between byte- and line-capped
/// slices.
fn leading_window(content: &str, max_bytes: usize) -> &str {
    if content.len() <= max_bytes {
        return content;
    }
    let mut end = max_bytes;
    while end > 0 && !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}

fn parse_data_lines(content: &str) -> Vec<(i64, f64, f64)> {
    let mut out = Vec::new();
    for line in content.trim().lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            continue;
        }
        if let (Ok(frame), Ok(x), Ok(y)) = (
            parts[0].parse::<i64>(),
            parts[1].parse::<f64>(),
            parts[2].parse::<f64>(),
        ) {
            out.push((frame, x, y));
        }
    }
    out
}

fn min_max(values: &[f64]) -> (f64, f64) {
    let min = values.iter().cloned().fold(f64::MAX, f64::min);
    let max = values.iter().cloned().fold(f64::MIN, f64::max);
    (min, max)
}

/// Matches `IMAGE|RESOLUTION|SIZE|DIM ... W x H` or `W,H`, case-insensitive.
fn extract_dimension_marker(content: &str) -> Option<(i32, i32)> {
    let lower = content.to_lowercase();
    for marker in ["image", "resolution", "size", "dim"] {
        if let Some(pos) = lower.find(marker) {
            if let Some((w, h)) = scan_dimension_pair(&content[pos..]) {
                if (100..=8000).contains(&w) && (100..=8000).contains(&h) {
                    return Some((w, h));
                }
            }
        }
    }
    None
}

fn scan_dimension_pair(text: &str) -> Option<(i32, i32)> {
    let bytes: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            let digits: String = bytes[start..i].iter().collect();
            if digits.len() < 3 {
                continue;
            }
            // Skip separators (whitespace, x/X, comma) then read the second number.
            let mut j = i;
            while j < bytes.len() && (bytes[j].is_whitespace() || bytes[j] == 'x' || bytes[j] == 'X' || bytes[j] == ',') {
                j += 1;
            }
            let start2 = j;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j > start2 {
                let digits2: String = bytes[start2..j].iter().collect();
                if let (Ok(w), Ok(h)) = (digits.parse(), digits2.parse()) {
                    return Some((w, h));
                }
            }
            continue;
        }
        i += 1;
    }
    None
}

/// Matches `WIDTH: n ... HEIGHT: m` (or `W=`/`H=`), case-insensitive,
/// allowing arbitrary text between the two fields.
fn extract_width_height(content: &str) -> Option<(i32, i32)> {
    let lower = content.to_lowercase();
    let width_pos = lower.find("width").or_else(|| lower.find("w:")).or_else(|| lower.find("w="))?;
    let w = scan_number_after(&content[width_pos..])?;
    let rest_start = width_pos + lower[width_pos..].find(|c: char| c.is_ascii_digit())?;
    let after_width = &content[rest_start..];
    let digits_end = after_width.find(|c: char| !c.is_ascii_digit()).unwrap_or(after_width.len());
    let remainder = &after_width[digits_end..];
    let lower_remainder = remainder.to_lowercase();
    let height_pos = lower_remainder.find("height").or_else(|| lower_remainder.find("h:")).or_else(|| lower_remainder.find("h="))?;
    let h = scan_number_after(&remainder[height_pos..])?;

    if (100..=8000).contains(&w) && (100..=8000).contains(&h) { Some((w, h)) } else { None }
}

fn scan_number_after(text: &str) -> Option<i32> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let rest = &text[start..];
    let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    rest[..end].parse().ok()
}
