//! Reactive curve storage: a single-curve store with undo/redo and a
//! multi-curve store layering named curves, metadata, and selection on
//! top of it.

use std::collections::{BTreeSet, HashMap};

use tracing::trace;

use crate::curve::{Curve, CurveDataWithMetadata, Point, PointStatus};
use crate::error::{CurveEditorError, Result};

/// Cap on retained undo snapshots; the oldest is dropped past this.
pub const MAX_UNDO_LEVELS: usize = 50;

/// Semantic notifications a [`CurveStore`] emits on mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum CurveStoreEvent {
    DataChanged,
    PointAdded(usize, Point),
    PointUpdated(usize, f64, f64),
    PointRemoved(usize),
    PointStatusChanged(usize, PointStatus),
    SelectionChanged(BTreeSet<usize>),
    BatchOperationStarted,
    BatchOperationEnded,
}

type Listener = Box<dyn FnMut(&CurveStoreEvent)>;

/// Owns one curve's points in insertion order, a selection of point
/// indices, and an undo/redo history of whole-curve snapshots.
#[derive(Default)]
pub struct CurveStore {
    points: Vec<Point>,
    selection: BTreeSet<usize>,
    undo_stack: Vec<Vec<Point>>,
    redo_stack: Vec<Vec<Point>>,
    batch_mode: bool,
    batch_snapshotted: bool,
    listeners: Vec<Listener>,
}

impl CurveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback invoked with every notification this store
    /// emits, in order.
    pub fn on_event(&mut self, listener: impl FnMut(&CurveStoreEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn emit(&mut self, event: CurveStoreEvent) {
        trace!(target: "store.curve", ?event, "notify");
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    fn snapshot_for_undo(&mut self) {
        if self.batch_mode {
            if !self.batch_snapshotted {
                self.push_undo_snapshot();
                self.batch_snapshotted = true;
            }
            return;
        }
        self.push_undo_snapshot();
    }

    fn push_undo_snapshot(&mut self) {
        if self.undo_stack.len() >= MAX_UNDO_LEVELS {
            self.undo_stack.remove(0);
            trace!(target: "store.curve.undo", "dropped oldest snapshot past cap");
        }
        self.undo_stack.push(self.points.clone());
        self.redo_stack.clear();
    }

    /// Insertion-order view of the current points, matching
    /// [`Self::get_point`] and friends index-for-index.
    pub fn get_data(&self) -> Curve {
        Curve::from_raw_points(self.points.clone())
    }

    pub fn get_point(&self, index: usize) -> Option<&Point> {
        self.points.get(index)
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Replaces the stored points with `new_data`. Selection is
    /// cleared unless `preserve_selection_on_sync` is set and the
    /// incoming data is structurally equivalent to the current data
    /// (same length, same frame and x,y per index — status may
    /// differ).
    pub fn set_data(&mut self, new_data: Curve, preserve_selection_on_sync: bool) {
        self.snapshot_for_undo();

        let preserve = preserve_selection_on_sync && !self.selection.is_empty() && self.is_structurally_equivalent(&new_data);

        self.points = new_data.points().to_vec();
        if !preserve {
            self.selection.clear();
        }

        if !self.batch_mode {
            self.emit(CurveStoreEvent::DataChanged);
        }
    }

    fn is_structurally_equivalent(&self, new_data: &Curve) -> bool {
        let current = self.get_data();
        if current.len() != new_data.len() {
            return false;
        }
        current
            .points()
            .iter()
            .zip(new_data.points().iter())
            .all(|(a, b)| a.frame == b.frame && a.x == b.x && a.y == b.y)
    }

    /// Appends `point`, defaulting a missing status to `keyframe`.
    /// Rejects a frame already present. Returns the new index.
    pub fn add_point(&mut self, point: Point) -> Result<usize> {
        if self.points.iter().any(|p| p.frame == point.frame) {
            return Err(CurveEditorError::InvalidInput(format!("duplicate frame {}", point.frame)));
        }
        self.snapshot_for_undo();
        self.points.push(point);
        let index = self.points.len() - 1;
        if !self.batch_mode {
            self.emit(CurveStoreEvent::PointAdded(index, point));
        }
        Ok(index)
    }

    /// Replaces the x, y of point `index`, preserving frame and status.
    pub fn update_point(&mut self, index: usize, x: f64, y: f64) -> Result<()> {
        if index >= self.points.len() {
            return Err(CurveEditorError::IndexOutOfBounds(index));
        }
        self.snapshot_for_undo();
        self.points[index].x = x;
        self.points[index].y = y;
        if !self.batch_mode {
            self.emit(CurveStoreEvent::PointUpdated(index, x, y));
        }
        Ok(())
    }

    /// Deletes point `index`, shifting selection indices above it down
    /// by one and dropping it from the selection if present.
    pub fn remove_point(&mut self, index: usize) -> Result<()> {
        if index >= self.points.len() {
            return Err(CurveEditorError::IndexOutOfBounds(index));
        }
        self.snapshot_for_undo();
        self.points.remove(index);
        self.selection = self
            .selection
            .iter()
            .filter(|&&i| i != index)
            .map(|&i| if i > index { i - 1 } else { i })
            .collect();
        if !self.batch_mode {
            self.emit(CurveStoreEvent::PointRemoved(index));
        }
        Ok(())
    }

    pub fn set_point_status(&mut self, index: usize, status: PointStatus) -> Result<()> {
        if index >= self.points.len() {
            return Err(CurveEditorError::IndexOutOfBounds(index));
        }
        self.snapshot_for_undo();
        self.points[index].status = status;
        if !self.batch_mode {
            self.emit(CurveStoreEvent::PointStatusChanged(index, status));
        }
        Ok(())
    }

    /// Selection always notifies, regardless of batch mode. With
    /// `add = true`, toggles membership; otherwise replaces the
    /// selection with `{index}`.
    pub fn select(&mut self, index: usize, add: bool) {
        if add {
            if !self.selection.insert(index) {
                self.selection.remove(&index);
            }
        } else {
            self.selection.clear();
            self.selection.insert(index);
        }
        self.emit(CurveStoreEvent::SelectionChanged(self.selection.clone()));
    }

    pub fn deselect(&mut self, index: usize) {
        self.selection.remove(&index);
        self.emit(CurveStoreEvent::SelectionChanged(self.selection.clone()));
    }

    pub fn select_range(&mut self, a: usize, b: usize) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        self.selection.extend(lo..=hi);
        self.emit(CurveStoreEvent::SelectionChanged(self.selection.clone()));
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.emit(CurveStoreEvent::SelectionChanged(self.selection.clone()));
    }

    pub fn select_all(&mut self) {
        self.selection = (0..self.points.len()).collect();
        self.emit(CurveStoreEvent::SelectionChanged(self.selection.clone()));
    }

    pub fn selection(&self) -> &BTreeSet<usize> {
        &self.selection
    }

    /// Suppresses per-operation notifications until
    /// [`Self::end_batch_operation`]. Still snapshots once, at entry.
    pub fn begin_batch_operation(&mut self) {
        self.batch_mode = true;
        self.batch_snapshotted = false;
        self.emit(CurveStoreEvent::BatchOperationStarted);
    }

    pub fn end_batch_operation(&mut self) {
        self.batch_mode = false;
        self.batch_snapshotted = false;
        self.emit(CurveStoreEvent::DataChanged);
        self.emit(CurveStoreEvent::BatchOperationEnded);
    }

    /// Pushes the current state onto redo and restores the most recent
    /// undo snapshot.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.undo_stack.pop() else { return false };
        self.redo_stack.push(self.points.clone());
        self.points = previous;
        self.emit(CurveStoreEvent::DataChanged);
        true
    }

    /// Inverse of [`Self::undo`].
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo_stack.pop() else { return false };
        self.undo_stack.push(self.points.clone());
        self.points = next;
        self.emit(CurveStoreEvent::DataChanged);
        true
    }

    pub fn get_frame_range(&self) -> Option<(i32, i32)> {
        crate::mathutil::get_frame_range_from_curve(&self.points.iter().map(|p| p.frame).collect::<Vec<_>>())
    }

    pub fn get_points_at_frame(&self, frame: i32) -> Vec<&Point> {
        self.points.iter().filter(|p| p.frame == frame).collect()
    }

    pub fn clear(&mut self) {
        self.snapshot_for_undo();
        self.points.clear();
        self.selection.clear();
        if !self.batch_mode {
            self.emit(CurveStoreEvent::DataChanged);
        }
    }
}

/// Per-curve display metadata tracked alongside its data in a
/// [`MultiCurveStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct CurveDisplayMetadata {
    pub visible: bool,
    pub color: Option<String>,
    pub tracking_direction: TrackingDirection,
}

impl Default for CurveDisplayMetadata {
    fn default() -> Self {
        Self { visible: true, color: None, tracking_direction: TrackingDirection::Forward }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingDirection {
    Forward,
    Backward,
    Both,
}

/// Notifications a [`MultiCurveStore`] emits.
#[derive(Debug, Clone, PartialEq)]
pub enum MultiCurveStoreEvent {
    CurvesChanged,
    SelectionStateChanged,
    ActiveCurveChanged(Option<String>),
    FrameChanged(i32),
}

/// Owns the named-curve table, per-curve display metadata, and the
/// cross-curve selection/active state (a.k.a. `ApplicationState`).
#[derive(Default)]
pub struct MultiCurveStore {
    curves: HashMap<String, CurveDataWithMetadata>,
    curve_metadata: HashMap<String, CurveDisplayMetadata>,
    selected_curves: BTreeSet<String>,
    active_curve: Option<String>,
    current_frame: i32,
    image_files: Vec<String>,
    image_directory: Option<String>,
    batch_mode: bool,
    batch_dirty: bool,
    listeners: Vec<Box<dyn FnMut(&MultiCurveStoreEvent)>>,
}

impl MultiCurveStore {
    pub fn new() -> Self {
        Self { current_frame: 1, ..Self::default() }
    }

    pub fn on_event(&mut self, listener: impl FnMut(&MultiCurveStoreEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn emit(&mut self, event: MultiCurveStoreEvent) {
        if self.batch_mode {
            self.batch_dirty = true;
            return;
        }
        trace!(target: "store.multi", ?event, "notify");
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    pub fn set_curve_data(&mut self, name: impl Into<String>, data: CurveDataWithMetadata) {
        let name = name.into();
        self.curves.insert(name.clone(), data);
        self.curve_metadata.entry(name).or_default();
        self.emit(MultiCurveStoreEvent::CurvesChanged);
    }

    pub fn get_curve_data(&self, name: &str) -> Option<&CurveDataWithMetadata> {
        self.curves.get(name)
    }

    /// Removes `name`, clearing it from the active/selected state if
    /// it was referenced there.
    pub fn delete_curve(&mut self, name: &str) -> Result<()> {
        if self.curves.remove(name).is_none() {
            return Err(CurveEditorError::UnknownCurve(name.to_string()));
        }
        self.curve_metadata.remove(name);
        self.selected_curves.remove(name);
        if self.active_curve.as_deref() == Some(name) {
            self.active_curve = None;
        }
        self.emit(MultiCurveStoreEvent::CurvesChanged);
        Ok(())
    }

    pub fn get_all_curve_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.curves.keys().cloned().collect();
        names.sort();
        names
    }

    /// Sets the active curve; `None` clears it. Rejects names not
    /// present in the curve map.
    pub fn set_active_curve(&mut self, name: Option<String>) -> Result<()> {
        if let Some(name) = &name {
            if !self.curves.contains_key(name) {
                return Err(CurveEditorError::UnknownCurve(name.clone()));
            }
        }
        self.active_curve = name.clone();
        self.emit(MultiCurveStoreEvent::ActiveCurveChanged(name));
        Ok(())
    }

    pub fn active_curve(&self) -> Option<&str> {
        self.active_curve.as_deref()
    }

    /// Sets the selected-curves set, silently dropping names not
    /// present in the curve map (selection is always a subset of keys).
    pub fn set_selected_curves(&mut self, names: BTreeSet<String>) {
        self.selected_curves = names.into_iter().filter(|n| self.curves.contains_key(n)).collect();
        self.emit(MultiCurveStoreEvent::SelectionStateChanged);
    }

    pub fn selected_curves(&self) -> &BTreeSet<String> {
        &self.selected_curves
    }

    pub fn set_curve_visibility(&mut self, name: &str, visible: bool) -> Result<()> {
        let md = self.curve_metadata.get_mut(name).ok_or_else(|| CurveEditorError::UnknownCurve(name.to_string()))?;
        md.visible = visible;
        self.emit(MultiCurveStoreEvent::CurvesChanged);
        Ok(())
    }

    pub fn set_curve_metadata(&mut self, name: &str, metadata: CurveDisplayMetadata) -> Result<()> {
        if !self.curves.contains_key(name) {
            return Err(CurveEditorError::UnknownCurve(name.to_string()));
        }
        self.curve_metadata.insert(name.to_string(), metadata);
        self.emit(MultiCurveStoreEvent::CurvesChanged);
        Ok(())
    }

    pub fn get_curve_metadata(&self, name: &str) -> Option<&CurveDisplayMetadata> {
        self.curve_metadata.get(name)
    }

    pub fn set_frame(&mut self, frame: i32) {
        self.current_frame = frame;
        self.emit(MultiCurveStoreEvent::FrameChanged(frame));
    }

    pub fn current_frame(&self) -> i32 {
        self.current_frame
    }

    pub fn set_image_sequence(&mut self, files: Vec<String>, directory: Option<String>) {
        self.image_files = files;
        self.image_directory = directory;
    }

    pub fn image_files(&self) -> &[String] {
        &self.image_files
    }

    pub fn image_directory(&self) -> Option<&str> {
        self.image_directory.as_deref()
    }

    pub fn total_images(&self) -> usize {
        self.image_files.len()
    }

    /// Coalesces notifications emitted during the closure into a
    /// single `curves_changed` / `selection_state_changed` pair.
    pub fn begin_batch(&mut self) {
        self.batch_mode = true;
        self.batch_dirty = false;
    }

    pub fn end_batch(&mut self) {
        self.batch_mode = false;
        if self.batch_dirty {
            self.batch_dirty = false;
            self.emit(MultiCurveStoreEvent::CurvesChanged);
            self.emit(MultiCurveStoreEvent::SelectionStateChanged);
        }
    }
}
