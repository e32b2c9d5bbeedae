//! Parsers for the tracking-data file formats this editor accepts:
//! the multi-point and single-curve 2D track text formats, JSON, and
//! CSV. Each is lossy-tolerant: malformed lines are skipped with a
//! log rather than aborting the whole file.

use serde_json::Value;
use tracing::warn;

use crate::coordinate::detector::CoordinateDetector;
use crate::coordinate::CoordinateMetadata;
use crate::curve::{create_metadata_from_file_type, Curve, CurveDataWithMetadata, Point, PointStatus};
use crate::error::{CurveEditorError, Result};

fn status_from_str(s: &str, default: PointStatus) -> PointStatus {
    match s.trim().to_lowercase().as_str() {
        "keyframe" => PointStatus::Keyframe,
        "interpolated" => PointStatus::Interpolated,
        "tracked" => PointStatus::Tracked,
        "endframe" => PointStatus::Endframe,
        "normal" => PointStatus::Normal,
        _ => default,
    }
}

fn is_data_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#')
}

fn non_comment_lines(content: &str) -> impl Iterator<Item = &str> {
    content.lines().filter(|l| is_data_line(l))
}

/// One trajectory parsed from a multi-point track file, keyed by its
/// point name.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTrajectory {
    pub name: String,
    pub data: CurveDataWithMetadata,
}

/// Parses the multi-point 2D track format (`<point_count>` then, per
/// point, a name/identifier/frame_count header and that many data
/// lines). Denormalizes each trajectory's points if the detected
/// metadata says the file uses normalized coordinates.
pub fn parse_multi_point_track(content: &str, file_path: &str) -> Vec<NamedTrajectory> {
    let metadata = CoordinateDetector::detect_from_file(file_path, Some(content));
    let mut lines = non_comment_lines(content);

    let Some(point_count) = lines.next().and_then(|l| l.trim().parse::<usize>().ok()) else {
        return Vec::new();
    };

    let mut trajectories = Vec::with_capacity(point_count);
    for _ in 0..point_count {
        let Some(name) = lines.next().map(str::trim).map(str::to_string) else { break };
        let Some(_identifier) = lines.next() else { break };
        let Some(frame_count) = lines.next().and_then(|l| l.trim().parse::<usize>().ok()) else { break };

        let mut raw_points = Vec::with_capacity(frame_count);
        for _ in 0..frame_count {
            let Some(line) = lines.next() else { break };
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 3 {
                warn!(target: "io.track", line, "skipping malformed track line");
                continue;
            }
            let (Ok(frame), Ok(x), Ok(y)) = (parts[0].parse::<i32>(), parts[1].parse::<f64>(), parts[2].parse::<f64>()) else {
                warn!(target: "io.track", line, "skipping unparseable track line");
                continue;
            };
            let explicit_status = parts.get(3).map(|s| status_from_str(s, PointStatus::Normal));
            raw_points.push((frame, x, y, explicit_status));
        }

        let last_index = raw_points.len().saturating_sub(1);
        let points: Vec<Point> = raw_points
            .into_iter()
            .enumerate()
            .map(|(i, (frame, x, y, status))| {
                let status = status.unwrap_or(if i == 0 || i == last_index { PointStatus::Keyframe } else { PointStatus::Tracked });
                Point::new(frame, x, y, status)
            })
            .collect();

        let Ok(curve) = Curve::from_points(points) else { continue };
        let data = finish_loaded_curve(curve, metadata);
        trajectories.push(NamedTrajectory { name, data });
    }

    trajectories
}

/// Parses the single-curve 2D track format: four header lines
/// (version, two identifiers, frame_count) followed by data lines.
/// Returns an empty, metadata-aware curve on any structural failure
/// rather than propagating an error (the editor must still be able to
/// display a status for a file it couldn't parse).
pub fn parse_single_curve_track(content: &str, file_path: &str) -> CurveDataWithMetadata {
    let metadata = CoordinateDetector::detect_from_file(file_path, Some(content));
    let body: String = content.lines().skip(4).collect::<Vec<_>>().join("\n");

    let mut points = Vec::new();
    for line in non_comment_lines(&body) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            warn!(target: "io.track", line, "skipping malformed track line");
            continue;
        }
        let (Ok(frame), Ok(x), Ok(y)) = (parts[0].parse::<i32>(), parts[1].parse::<f64>(), parts[2].parse::<f64>()) else {
            warn!(target: "io.track", line, "skipping unparseable track line");
            continue;
        };
        let status = parts.get(3).map(|s| status_from_str(s, PointStatus::Keyframe)).unwrap_or(PointStatus::Keyframe);
        points.push(Point::new(frame, x, y, status));
    }

    match Curve::from_points(points) {
        Ok(curve) => finish_loaded_curve(curve, metadata),
        Err(_) => CurveDataWithMetadata::new(Curve::new(), Some(metadata)),
    }
}

fn finish_loaded_curve(curve: Curve, metadata: CoordinateMetadata) -> CurveDataWithMetadata {
    if metadata.uses_normalized_coordinates {
        let points = curve
            .points()
            .iter()
            .map(|p| {
                let (x, y) = metadata.denormalize_coordinates(p.x, p.y);
                Point::new(p.frame, x, y, p.status)
            })
            .collect();
        let mut flat_metadata = metadata;
        flat_metadata.uses_normalized_coordinates = false;
        CurveDataWithMetadata::new(Curve::from_points(points).unwrap_or_default(), Some(flat_metadata))
    } else {
        CurveDataWithMetadata::new(curve, Some(metadata))
    }
}

/// Parses any of the three accepted JSON shapes: an array of
/// `{frame, x, y, status?}` objects (with `f`/`X`/`Y`/`type` key
/// aliases), an array of `[frame, x, y, status?]` arrays, or an object
/// `{metadata: {...}, points: [...]}` (no key aliasing in this branch).
pub fn parse_json(content: &str) -> Result<Curve> {
    let value: Value = serde_json::from_str(content)?;

    let points = match value {
        Value::Array(items) => parse_json_array(&items)?,
        Value::Object(ref map) => {
            if let Some(Value::Array(items)) = map.get("points") {
                parse_json_points_field(items)?
            } else {
                return Err(CurveEditorError::Parse("JSON object has no 'points' array".into()));
            }
        }
        _ => return Err(CurveEditorError::Parse("unsupported JSON top-level shape".into())),
    };

    Curve::from_points(points)
}

/// Accepts a JSON number as a frame index whether it was written as an
/// integer or a float (`1` and `1.0` are both valid frame numbers).
fn as_frame(value: &Value) -> Option<i32> {
    value.as_i64().map(|v| v as i32).or_else(|| value.as_f64().map(|v| v as i32))
}

fn parse_json_array(items: &[Value]) -> Result<Vec<Point>> {
    let mut points = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Object(obj) => {
                let frame = obj.get("frame").or_else(|| obj.get("f")).and_then(as_frame);
                let x = obj.get("x").or_else(|| obj.get("X")).and_then(Value::as_f64);
                let y = obj.get("y").or_else(|| obj.get("Y")).and_then(Value::as_f64);
                let status = obj
                    .get("status")
                    .or_else(|| obj.get("type"))
                    .and_then(Value::as_str)
                    .map(|s| status_from_str(s, PointStatus::Keyframe))
                    .unwrap_or(PointStatus::Keyframe);
                match (frame, x, y) {
                    (Some(frame), Some(x), Some(y)) => points.push(Point::new(frame as i32, x, y, status)),
                    _ => warn!(target: "io.json", "skipping object missing frame/x/y"),
                }
            }
            Value::Array(arr) => {
                if arr.len() < 3 {
                    warn!(target: "io.json", "skipping array point with fewer than 3 fields");
                    continue;
                }
                let (frame, x, y) = (as_frame(&arr[0]), arr[1].as_f64(), arr[2].as_f64());
                let status = arr.get(3).and_then(Value::as_str).map(|s| status_from_str(s, PointStatus::Keyframe)).unwrap_or(PointStatus::Keyframe);
                match (frame, x, y) {
                    (Some(frame), Some(x), Some(y)) => points.push(Point::new(frame as i32, x, y, status)),
                    _ => warn!(target: "io.json", "skipping array point with non-numeric fields"),
                }
            }
            _ => warn!(target: "io.json", "skipping unsupported point entry"),
        }
    }
    Ok(points)
}

/// `points` field of the `{metadata, points}` object shape: plain
/// `frame`/`x`/`y`/`status`, no key aliasing, status defaults to
/// `keyframe`.
fn parse_json_points_field(items: &[Value]) -> Result<Vec<Point>> {
    let mut points = Vec::with_capacity(items.len());
    for item in items {
        let Value::Object(obj) = item else {
            warn!(target: "io.json", "skipping non-object entry in points array");
            continue;
        };
        let frame = obj.get("frame").and_then(as_frame);
        let x = obj.get("x").and_then(Value::as_f64);
        let y = obj.get("y").and_then(Value::as_f64);
        let status = obj
            .get("status")
            .and_then(Value::as_str)
            .map(|s| status_from_str(s, PointStatus::Keyframe))
            .unwrap_or(PointStatus::Keyframe);
        match (frame, x, y) {
            (Some(frame), Some(x), Some(y)) => points.push(Point::new(frame as i32, x, y, status)),
            _ => warn!(target: "io.json", "skipping object missing frame/x/y"),
        }
    }
    Ok(points)
}

/// Serializes `curve` to the canonical `{metadata, points}` save
/// shape.
pub fn save_json(curve: &Curve, label: &str, color: Option<&str>) -> Result<String> {
    let points: Vec<Value> = curve
        .points()
        .iter()
        .map(|p| {
            serde_json::json!({
                "frame": p.frame,
                "x": p.x,
                "y": p.y,
                "status": status_to_str(p.status),
            })
        })
        .collect();

    let root = serde_json::json!({
        "metadata": {
            "label": label,
            "color": color,
            "version": "1.0",
            "point_count": curve.len(),
        },
        "points": points,
    });

    Ok(serde_json::to_string_pretty(&root)?)
}

fn status_to_str(status: PointStatus) -> &'static str {
    match status {
        PointStatus::Keyframe => "keyframe",
        PointStatus::Interpolated => "interpolated",
        PointStatus::Tracked => "tracked",
        PointStatus::Endframe => "endframe",
        PointStatus::Normal => "normal",
    }
}

/// Delimiter among `,`, `\t`, `;`, chosen by counting occurrences in
/// up to the first 1 KiB of content.
fn sniff_delimiter(content: &str) -> char {
    let sample = &content[..content.len().min(1024)];
    let commas = sample.matches(',').count();
    let tabs = sample.matches('\t').count();
    let semicolons = sample.matches(';').count();

    if tabs > commas {
        '\t'
    } else if semicolons > commas {
        ';'
    } else {
        ','
    }
}

/// Parses CSV with auto-detected delimiter and optional header
/// (detected by attempting to parse the first row's first field as a
/// number). Columns: `frame, x, y, [status]`.
pub fn parse_csv(content: &str) -> Curve {
    let delimiter = sniff_delimiter(content);
    let mut lines = non_comment_lines(content).peekable();

    if let Some(&first) = lines.peek() {
        let first_field = first.split(delimiter).next().unwrap_or("");
        if first_field.trim().parse::<f64>().is_err() {
            lines.next();
        }
    }

    let mut points = Vec::new();
    for line in lines {
        let fields: Vec<&str> = line.split(delimiter).map(str::trim).collect();
        if fields.len() < 3 {
            warn!(target: "io.csv", line, "skipping row with fewer than 3 fields");
            continue;
        }
        let frame = fields[0].parse::<f64>().ok().map(|f| f as i32);
        let x = fields[1].parse::<f64>().ok();
        let y = fields[2].parse::<f64>().ok();
        let (Some(frame), Some(x), Some(y)) = (frame, x, y) else {
            warn!(target: "io.csv", line, "skipping row with non-numeric frame/x/y");
            continue;
        };
        let status = fields.get(3).filter(|s| !s.is_empty()).map(|s| status_from_str(s, PointStatus::Keyframe)).unwrap_or(PointStatus::Keyframe);
        points.push(Point::new(frame, x, y, status));
    }

    Curve::from_points(points).unwrap_or_default()
}

/// Serializes `curve` as CSV with an optional header row.
pub fn save_csv(curve: &Curve, include_header: bool) -> String {
    let mut out = String::new();
    if include_header {
        out.push_str("frame,x,y,status\n");
    }
    for p in curve.points() {
        out.push_str(&format!("{},{},{},{}\n", p.frame, p.x, p.y, status_to_str(p.status)));
    }
    out
}

/// Wraps status-less legacy points with metadata inferred from a
/// file-path hint, for callers that already have raw tuples in hand.
pub fn wrap_legacy(points: Vec<(i32, f64, f64)>, file_path: Option<&str>, width: Option<i32>, height: Option<i32>) -> Result<CurveDataWithMetadata> {
    let metadata = match file_path {
        Some(path) => create_metadata_from_file_type(path),
        None => create_metadata_from_file_type(""),
    };
    let metadata = CoordinateMetadata { width: width.unwrap_or(metadata.width), height: height.unwrap_or(metadata.height), ..metadata };

    let curve_points = points.into_iter().map(|(f, x, y)| Point::from_legacy_tuple(f, x, y)).collect();
    Ok(CurveDataWithMetadata::new(Curve::from_points(curve_points)?, Some(metadata)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_point_track_infers_status_by_position() {
        let content = "1\nPoint1\n0\n3\n1 640.0 100.0\n2 650.0 110.0\n3 660.0 120.0\n";
        let trajectories = parse_multi_point_track(content, "track.txt");
        assert_eq!(trajectories.len(), 1);
        let points = trajectories[0].data.data.points();
        assert_eq!(points[0].status, PointStatus::Keyframe);
        assert_eq!(points[1].status, PointStatus::Tracked);
        assert_eq!(points[2].status, PointStatus::Keyframe);
    }

    #[test]
    fn multi_point_track_denormalizes_when_flagged() {
        let content = "1\nPoint1\n0\n1\n1 0.5 0.25\n";
        let trajectories = parse_multi_point_track(content, "track.txt");
        let p = trajectories[0].data.data.point_at_frame(1).unwrap();
        assert_eq!((p.x, p.y), (640.0, 180.0));
    }

    #[test]
    fn single_curve_track_skips_four_header_lines() {
        let content = "1\nid1\nid2\n2\n1 10.0 20.0 keyframe\n2 15.0 25.0 tracked\n";
        let curve = parse_single_curve_track(content, "data.2dt");
        assert_eq!(curve.data.len(), 2);
        assert_eq!(curve.data.point_at_frame(1).unwrap().status, PointStatus::Keyframe);
    }

    #[test]
    fn json_array_of_objects_applies_key_aliasing() {
        let content = r#"[{"f": 1, "X": 10.0, "Y": 20.0, "type": "tracked"}]"#;
        let curve = parse_json(content).unwrap();
        let p = curve.point_at_frame(1).unwrap();
        assert_eq!((p.x, p.y), (10.0, 20.0));
        assert_eq!(p.status, PointStatus::Tracked);
    }

    #[test]
    fn json_array_of_arrays_requires_three_fields() {
        let content = r#"[[1, 10.0, 20.0], [2, 30.0]]"#;
        let curve = parse_json(content).unwrap();
        assert_eq!(curve.len(), 1);
    }

    #[test]
    fn json_points_object_has_no_key_aliasing() {
        let content = r#"{"metadata": {"label": "x"}, "points": [{"f": 1, "x": 10.0, "y": 20.0}]}"#;
        let curve = parse_json(content).unwrap();
        assert!(curve.is_empty(), "the 'f' alias must not be recognized in the points-object branch");
    }

    #[test]
    fn csv_detects_tab_delimiter_and_header() {
        let content = "frame\tx\ty\tstatus\n1\t10.0\t20.0\tkeyframe\n2\t15.0\t25.0\ttracked\n";
        let curve = parse_csv(content);
        assert_eq!(curve.len(), 2);
    }

    #[test]
    fn csv_without_header_parses_first_row_as_data() {
        let content = "1,10.0,20.0\n2,15.0,25.0\n";
        let curve = parse_csv(content);
        assert_eq!(curve.len(), 2);
    }

    #[test]
    fn save_json_round_trips_through_points_object() {
        let curve = Curve::from_points(vec![Point::new(1, 1.0, 2.0, PointStatus::Keyframe)]).unwrap();
        let json = save_json(&curve, "label", None).unwrap();
        let reparsed = parse_json(&json).unwrap();
        assert_eq!(reparsed.point_at_frame(1).unwrap().x, 1.0);
    }
}
