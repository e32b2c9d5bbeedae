//! Content-aware gap filling: replace a hole in a target curve with
//! data pulled from donor curves that overlap it outside the hole, by
//! a constant offset, a linearly interpolated (deformed) offset, or a
//! multi-donor average. Falls back to plain interpolation when no
//! donor is available.

use crate::curve::{Curve, Point, PointStatus};
use crate::error::{CurveEditorError, Result};
use crate::mathutil::lerp;

/// Inclusive frame range of a gap, as returned by
/// [`find_gap_around_frame`].
pub type Gap = (i32, i32);

/// Frames present in both curves outside the gap, split by which side
/// of the gap they fall on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OverlapFrames {
    pub before: Vec<i32>,
    pub after: Vec<i32>,
}

impl OverlapFrames {
    /// All overlap frames, before and after, sorted ascending.
    pub fn combined(&self) -> Vec<i32> {
        let mut frames: Vec<i32> = self.before.iter().chain(self.after.iter()).copied().collect();
        frames.sort_unstable();
        frames
    }
}

/// Finds the gap containing `frame`: either a pure absence of data
/// between two existing points, or the region strictly between an
/// `endframe` point and the next `keyframe` point (which may itself
/// contain data — status-based gaps are reported regardless of
/// density). Returns `None` when `frame` isn't inside a fillable gap,
/// including when the enclosing gap is open-ended.
pub fn find_gap_around_frame(curve: &Curve, frame: i32) -> Option<Gap> {
    if let Some(gap) = status_gap_containing(curve, frame) {
        return Some(gap);
    }

    if curve.point_at_frame(frame).is_some() {
        return None;
    }

    let frames = curve.frames();
    let lower = frames.iter().rev().find(|&&f| f < frame).copied();
    let upper = frames.iter().find(|&&f| f > frame).copied();

    match (lower, upper) {
        (Some(lo), Some(hi)) => {
            if trails_unterminated_endframe(curve, lo) {
                return None;
            }
            Some((lo + 1, hi - 1))
        }
        _ => None,
    }
}

/// True when the point at `frame` is an `endframe` with no `keyframe`
/// anywhere after it, marking the region past it an open-ended gap
/// rather than a fillable absence.
fn trails_unterminated_endframe(curve: &Curve, frame: i32) -> bool {
    let Some(point) = curve.point_at_frame(frame) else { return false };
    if point.status != PointStatus::Endframe {
        return false;
    }
    !curve.points().iter().any(|p| p.status == PointStatus::Keyframe && p.frame > frame)
}

fn status_gap_containing(curve: &Curve, frame: i32) -> Option<Gap> {
    for endframe in curve.points().iter().filter(|p| p.status == PointStatus::Endframe) {
        let next_keyframe = curve
            .points()
            .iter()
            .filter(|p| p.status == PointStatus::Keyframe && p.frame > endframe.frame)
            .min_by_key(|p| p.frame);

        if let Some(next_keyframe) = next_keyframe {
            if endframe.frame < frame && frame < next_keyframe.frame {
                return Some((endframe.frame + 1, next_keyframe.frame - 1));
            }
        }
    }
    None
}

/// Frames present in both `target` and `donor`, excluding the gap
/// itself, split into those before `gap.0` and those after `gap.1`.
pub fn find_overlap_frames(target: &Curve, donor: &Curve, gap: Gap) -> OverlapFrames {
    let donor_frames: std::collections::HashSet<i32> = donor.frames().into_iter().collect();
    let mut before = Vec::new();
    let mut after = Vec::new();

    for frame in target.frames() {
        if !donor_frames.contains(&frame) {
            continue;
        }
        if frame < gap.0 {
            before.push(frame);
        } else if frame > gap.1 {
            after.push(frame);
        }
    }

    before.sort_unstable();
    after.sort_unstable();
    OverlapFrames { before, after }
}

/// Mean of `target[f] - donor[f]` over `frames`, element-wise.
/// `(0, 0)` when `frames` is empty.
pub fn calculate_offset(target: &Curve, donor: &Curve, frames: &[i32]) -> (f64, f64) {
    if frames.is_empty() {
        return (0.0, 0.0);
    }
    let mut sum = (0.0, 0.0);
    let mut count = 0;
    for &frame in frames {
        if let (Some(t), Some(d)) = (target.point_at_frame(frame), donor.point_at_frame(frame)) {
            sum.0 += t.x - d.x;
            sum.1 += t.y - d.y;
            count += 1;
        }
    }
    if count == 0 {
        return (0.0, 0.0);
    }
    (sum.0 / count as f64, sum.1 / count as f64)
}

/// Curve with points inside `gap` dropped, ready to receive filled
/// points.
fn points_outside_gap(curve: &Curve, gap: Gap) -> Vec<Point> {
    curve
        .points()
        .iter()
        .filter(|p| p.frame < gap.0 || p.frame > gap.1)
        .copied()
        .collect()
}

fn assemble(mut points: Vec<Point>, mut filled: Vec<Point>) -> Curve {
    filled.sort_by_key(|p| p.frame);
    for (i, p) in filled.iter_mut().enumerate() {
        p.status = if i == 0 { PointStatus::Keyframe } else { PointStatus::Tracked };
    }
    points.extend(filled);
    Curve::from_points(points).expect("gap fill cannot reintroduce duplicate frames")
}

/// Fills the gap around `frame` using a single donor and a constant
/// offset (mean difference over the overlap frames).
pub fn fill_gap_with_source(target: &Curve, donor: &Curve, frame: i32) -> Result<Curve> {
    let gap = find_gap_around_frame(target, frame).ok_or(CurveEditorError::OpenGap)?;
    let overlap = find_overlap_frames(target, donor, gap).combined();
    let (offset_x, offset_y) = calculate_offset(target, donor, &overlap);

    let mut filled = Vec::new();
    for f in gap.0..=gap.1 {
        if let Some(d) = donor.point_at_frame(f) {
            filled.push(Point::new(f, d.x + offset_x, d.y + offset_y, PointStatus::Tracked));
        }
    }
    if filled.is_empty() {
        return Err(CurveEditorError::NoDonorData);
    }

    Ok(assemble(points_outside_gap(target, gap), filled))
}

/// Fills the gap around `frame` using a single donor whose offset is
/// linearly interpolated across the gap between the enclosing overlap
/// frames (3DEqualizer `deformCurve` formula). Requires at least two
/// overlap points.
pub fn deform_curve_with_interpolated_offset(target: &Curve, donor: &Curve, frame: i32) -> Result<Curve> {
    let gap = find_gap_around_frame(target, frame).ok_or(CurveEditorError::OpenGap)?;
    let overlap = find_overlap_frames(target, donor, gap).combined();
    if overlap.len() < 2 {
        return Err(CurveEditorError::InsufficientOverlap);
    }

    let offsets: Vec<(i32, f64, f64)> = overlap
        .iter()
        .map(|&f| {
            let (ox, oy) = calculate_offset(target, donor, std::slice::from_ref(&f));
            (f, ox, oy)
        })
        .collect();

    let mut filled = Vec::new();
    for f in gap.0..=gap.1 {
        let Some(d) = donor.point_at_frame(f) else { continue };

        let bracket = offsets.windows(2).find(|w| w[0].0 <= f && f <= w[1].0);
        let Some(pair) = bracket else { continue };
        let (f0, ox0, oy0) = pair[0];
        let (f1, ox1, oy1) = pair[1];
        let t = if f1 != f0 { (f - f0) as f64 / (f1 - f0) as f64 } else { 0.0 };
        let offset_x = lerp(ox0, ox1, t);
        let offset_y = lerp(oy0, oy1, t);

        filled.push(Point::new(f, d.x + offset_x, d.y + offset_y, PointStatus::Tracked));
    }
    if filled.is_empty() {
        return Err(CurveEditorError::NoDonorData);
    }

    Ok(assemble(points_outside_gap(target, gap), filled))
}

/// Fills the gap around `frame` by averaging multiple donors, each
/// contributing its own constant offset against `target`. A gap frame
/// is only filled when every donor has data there.
pub fn average_multiple_sources(target: &Curve, donors: &[Curve], frame: i32) -> Result<Curve> {
    if donors.is_empty() {
        return Err(CurveEditorError::NoDonorData);
    }
    let gap = find_gap_around_frame(target, frame).ok_or(CurveEditorError::OpenGap)?;

    let donor_offsets: Vec<(f64, f64)> = donors
        .iter()
        .map(|donor| {
            let overlap = find_overlap_frames(target, donor, gap).combined();
            calculate_offset(target, donor, &overlap)
        })
        .collect();

    let mut filled = Vec::new();
    for f in gap.0..=gap.1 {
        let mut sum = (0.0, 0.0);
        let mut all_present = true;
        for (donor, &(ox, oy)) in donors.iter().zip(donor_offsets.iter()) {
            match donor.point_at_frame(f) {
                Some(d) => {
                    sum.0 += d.x + ox;
                    sum.1 += d.y + oy;
                }
                None => {
                    all_present = false;
                    break;
                }
            }
        }
        if all_present {
            let n = donors.len() as f64;
            filled.push(Point::new(f, sum.0 / n, sum.1 / n, PointStatus::Tracked));
        }
    }
    if filled.is_empty() {
        return Err(CurveEditorError::NoDonorData);
    }

    Ok(assemble(points_outside_gap(target, gap), filled))
}

/// Builds a new curve at the intersection of `sources`' frame sets,
/// each point the per-frame mean across sources. An empty `sources`
/// list produces an empty curve (the trivial "no sources" case);
/// non-empty sources with no frame in common fail with
/// `NoCommonFrames`. Points carry `normal` status since this produces
/// an independent curve rather than a gap-fill overlay.
pub fn create_averaged_curve(sources: &[Curve]) -> Result<Curve> {
    if sources.is_empty() {
        return Ok(Curve::new());
    }

    let mut common: std::collections::BTreeSet<i32> = sources[0].frames().into_iter().collect();
    for source in &sources[1..] {
        let frames: std::collections::HashSet<i32> = source.frames().into_iter().collect();
        common.retain(|f| frames.contains(f));
    }
    if common.is_empty() {
        return Err(CurveEditorError::NoCommonFrames);
    }

    let mut points = Vec::with_capacity(common.len());
    for frame in common {
        let mut sum = (0.0, 0.0);
        for source in sources {
            let p = source.point_at_frame(frame).expect("frame is in the common intersection");
            sum.0 += p.x;
            sum.1 += p.y;
        }
        let n = sources.len() as f64;
        points.push(Point::new(frame, sum.0 / n, sum.1 / n, PointStatus::Normal));
    }
    Curve::from_points(points)
}

/// Linearly interpolates across the gap around `frame` using only
/// `target`'s own boundary points (no donor). Filled points get
/// `interpolated` status; the boundaries keep their original status.
/// Returns `target` unchanged if the gap is missing a boundary or not
/// fillable.
pub fn interpolate_gap(target: &Curve, frame: i32) -> Curve {
    let Some(gap) = find_gap_around_frame(target, frame) else {
        return target.clone();
    };
    let Some(lower) = target.point_at_frame(gap.0 - 1) else {
        return target.clone();
    };
    let Some(upper) = target.point_at_frame(gap.1 + 1) else {
        return target.clone();
    };

    let span = (upper.frame - lower.frame) as f64;
    let mut filled = Vec::new();
    for f in gap.0..=gap.1 {
        let t = (f - lower.frame) as f64 / span;
        filled.push(Point::new(f, lerp(lower.x, upper.x, t), lerp(lower.y, upper.y, t), PointStatus::Interpolated));
    }

    let mut points = points_outside_gap(target, gap);
    points.extend(filled);
    Curve::from_points(points).expect("gap fill cannot reintroduce duplicate frames")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(points: &[(i32, f64, f64, PointStatus)]) -> Curve {
        Curve::from_points(points.iter().map(|&(f, x, y, s)| Point::new(f, x, y, s)).collect()).unwrap()
    }

    #[test]
    fn s6_constant_offset_fill() {
        let target = curve(&[(1, 0.0, 0.0, PointStatus::Keyframe), (10, 10.0, 10.0, PointStatus::Keyframe)]);
        let donor_points: Vec<(i32, f64, f64, PointStatus)> =
            (1..=10).map(|f| (f, (f - 1) as f64, (f - 1) as f64, PointStatus::Tracked)).collect();
        let donor = curve(&donor_points);

        let filled = fill_gap_with_source(&target, &donor, 5).unwrap();

        for f in 2..=9 {
            let p = filled.point_at_frame(f).unwrap();
            assert!((p.x - f as f64).abs() < 1e-9, "frame {f} x mismatch: {}", p.x);
            assert!((p.y - f as f64).abs() < 1e-9, "frame {f} y mismatch: {}", p.y);
            if f == 2 {
                assert_eq!(p.status, PointStatus::Keyframe);
            } else {
                assert_eq!(p.status, PointStatus::Tracked);
            }
        }
    }

    #[test]
    fn open_gap_is_unfillable() {
        let target = curve(&[(1, 0.0, 0.0, PointStatus::Keyframe)]);
        assert_eq!(find_gap_around_frame(&target, 5), None);
    }

    #[test]
    fn status_based_gap_is_detected_even_with_data_present() {
        let target = curve(&[
            (1, 0.0, 0.0, PointStatus::Endframe),
            (5, 99.0, 99.0, PointStatus::Tracked),
            (10, 10.0, 10.0, PointStatus::Keyframe),
        ]);
        assert_eq!(find_gap_around_frame(&target, 5), Some((2, 9)));
    }

    #[test]
    fn unterminated_endframe_gap_is_unfillable_even_with_data_past_it() {
        let target = curve(&[
            (1, 0.0, 0.0, PointStatus::Keyframe),
            (5, 0.0, 0.0, PointStatus::Endframe),
            (20, 0.0, 0.0, PointStatus::Tracked),
        ]);
        assert_eq!(find_gap_around_frame(&target, 10), None);
    }

    #[test]
    fn deformation_requires_two_overlaps() {
        let target = curve(&[(1, 0.0, 0.0, PointStatus::Keyframe), (10, 0.0, 0.0, PointStatus::Keyframe)]);
        let donor = curve(&[(1, 0.0, 0.0, PointStatus::Tracked), (5, 1.0, 1.0, PointStatus::Tracked)]);
        let result = deform_curve_with_interpolated_offset(&target, &donor, 3);
        assert_eq!(result, Err(CurveEditorError::InsufficientOverlap));
    }

    #[test]
    fn deformation_interpolates_offset_linearly() {
        let target = curve(&[
            (0, 0.0, 0.0, PointStatus::Keyframe),
            (10, 20.0, 0.0, PointStatus::Keyframe),
        ]);
        let donor_points: Vec<(i32, f64, f64, PointStatus)> =
            (0..=10).map(|f| (f, 0.0, 0.0, PointStatus::Tracked)).collect();
        let donor = curve(&donor_points);

        let filled = deform_curve_with_interpolated_offset(&target, &donor, 5).unwrap();
        let p5 = filled.point_at_frame(5).unwrap();
        assert!((p5.x - 10.0).abs() < 1e-9);
    }

    #[test]
    fn averaging_skips_frames_missing_from_any_donor() {
        let target = curve(&[(1, 0.0, 0.0, PointStatus::Keyframe), (5, 0.0, 0.0, PointStatus::Keyframe)]);
        let donor_a = curve(&[(1, 0.0, 0.0, PointStatus::Tracked), (2, 2.0, 2.0, PointStatus::Tracked), (3, 3.0, 3.0, PointStatus::Tracked)]);
        let donor_b = curve(&[(1, 0.0, 0.0, PointStatus::Tracked), (2, 2.0, 2.0, PointStatus::Tracked)]);

        let filled = average_multiple_sources(&target, &[donor_a, donor_b], 2).unwrap();
        assert!(filled.point_at_frame(2).is_some());
        assert!(filled.point_at_frame(3).is_none());
    }

    #[test]
    fn averaged_curve_intersects_frame_sets() {
        let a = curve(&[(1, 0.0, 0.0, PointStatus::Normal), (2, 2.0, 2.0, PointStatus::Normal)]);
        let b = curve(&[(2, 4.0, 0.0, PointStatus::Normal), (3, 6.0, 6.0, PointStatus::Normal)]);
        let avg = create_averaged_curve(&[a, b]).unwrap();
        assert_eq!(avg.frames(), vec![2]);
        let p = avg.point_at_frame(2).unwrap();
        assert!((p.x - 3.0).abs() < 1e-9);
    }

    #[test]
    fn averaged_curve_empty_intersection_errors() {
        let a = curve(&[(1, 0.0, 0.0, PointStatus::Normal)]);
        let b = curve(&[(2, 0.0, 0.0, PointStatus::Normal)]);
        assert_eq!(create_averaged_curve(&[a, b]), Err(CurveEditorError::NoCommonFrames));
    }

    #[test]
    fn interpolate_gap_fills_linearly_with_interpolated_status() {
        let target = curve(&[(0, 0.0, 0.0, PointStatus::Keyframe), (10, 100.0, 0.0, PointStatus::Keyframe)]);
        let filled = interpolate_gap(&target, 5);
        let p = filled.point_at_frame(5).unwrap();
        assert!((p.x - 50.0).abs() < 1e-9);
        assert_eq!(p.status, PointStatus::Interpolated);
        assert_eq!(filled.point_at_frame(0).unwrap().status, PointStatus::Keyframe);
    }

    #[test]
    fn interpolate_gap_returns_unchanged_when_boundary_missing() {
        let target = curve(&[(0, 0.0, 0.0, PointStatus::Keyframe)]);
        let result = interpolate_gap(&target, 5);
        assert_eq!(result, target);
    }
}
