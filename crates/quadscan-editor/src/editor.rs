//! The placement/drag state machine over one loaded image.

use crate::config::{EditorConfig, SnapPolicy};
use crate::corners::{CornerSet, SelectionPhase};
use crate::drag::{DragSession, FrameHandle, FrameScheduler};
use crate::mapper::CoordinateMapper;
use crate::pointer::{PointerEvent, PointerPhase};
use crate::types::{CanvasPoint, DisplayPoint, DisplaySize, SourcePoint};

/// What an input event invalidated.
///
/// Ordered so that combining two results is `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Repaint {
    /// Nothing visible changed.
    #[default]
    None,
    /// Only the display-space handle overlay moved.
    Handles,
    /// The canvas must be redrawn.
    Canvas,
}

/// Corner placement and dragging for one image.
///
/// Owns the [`CornerSet`], the optional [`DragSession`], and the
/// [`CoordinateMapper`] for the image's surfaces. All positions coming in
/// are in display space; everything stored is in canvas space.
#[derive(Debug, Clone)]
pub struct Editor {
    corners: CornerSet,
    drag: Option<DragSession>,
    mapper: CoordinateMapper,
    hit_radius: f64,
    snap: SnapPolicy,
}

impl Editor {
    /// An empty editor over `mapper`'s surfaces.
    #[must_use]
    pub fn new(mapper: CoordinateMapper, config: &EditorConfig) -> Self {
        Self {
            corners: CornerSet::new(),
            drag: None,
            mapper,
            hit_radius: config.hit_radius,
            snap: config.snap,
        }
    }

    /// Route a normalized pointer event.
    ///
    /// The event's surface size refreshes the mapper first, so a resize
    /// that happened since the last event is honoured.
    pub fn handle_event(
        &mut self,
        event: &PointerEvent,
        frames: &mut impl FrameScheduler,
    ) -> Repaint {
        let resized = self.mapper.set_display_size(event.surface);
        let repaint = match event.phase {
            PointerPhase::Press => self.press_start(event.position),
            PointerPhase::Move => self.press_move(event.position, frames),
            PointerPhase::Release | PointerPhase::Cancel => self.press_end(frames),
            PointerPhase::Leave => self.leave(frames),
        };
        if resized {
            repaint.max(Repaint::Handles)
        } else {
            repaint
        }
    }

    /// A press at `at`: grab the nearest corner in range, otherwise place
    /// a new one. A press with four corners already placed and none in
    /// range does nothing.
    pub fn press_start(&mut self, at: DisplayPoint) -> Repaint {
        if self.drag.is_some() {
            log::debug!("press while dragging; abandoning previous drag");
            self.drag = None;
        }
        let point = self.mapper.clamp(self.mapper.to_canvas(at));
        if let Some(index) = self.corners.hit_test(point, self.hit_radius)
            && let Some(current) = self.corners.get(index)
        {
            self.drag = Some(DragSession::new(index, current, self.mapper.to_display(current)));
            return Repaint::Canvas;
        }
        match self.corners.try_push(point) {
            Some(_) => Repaint::Canvas,
            None => Repaint::None,
        }
    }

    /// Pointer moved while pressed. Ignored unless a drag is active.
    ///
    /// The position is clamped onto the canvas and becomes the visual
    /// position immediately; the canonical corner is updated on the next
    /// frame (see [`on_frame`](Self::on_frame)).
    pub fn press_move(&mut self, at: DisplayPoint, frames: &mut impl FrameScheduler) -> Repaint {
        let Some(drag) = self.drag.as_mut() else {
            return Repaint::None;
        };
        let pending = self.mapper.clamp(self.mapper.to_canvas(at));
        drag.update(pending, self.mapper.to_display(pending), frames);
        Repaint::Handles
    }

    /// A scheduled frame fired: commit the pending drag position.
    ///
    /// Handles that are not the active drag's current frame are ignored,
    /// which covers frames that outlived a reset or a release.
    pub fn on_frame(&mut self, handle: FrameHandle) -> Repaint {
        let Some(drag) = self.drag.as_mut() else {
            return Repaint::None;
        };
        if !drag.take_frame(handle) {
            return Repaint::None;
        }
        let (index, pending) = (drag.index(), drag.pending());
        self.commit(index, pending);
        Repaint::Canvas
    }

    /// Release: commit the last pending position, snapped per policy.
    pub fn press_end(&mut self, frames: &mut impl FrameScheduler) -> Repaint {
        let Some(mut drag) = self.drag.take() else {
            return Repaint::None;
        };
        drag.cancel_frame(frames);
        let released = match self.snap {
            SnapPolicy::Off => drag.pending(),
            SnapPolicy::Grid { step } => self.mapper.clamp(drag.pending().snap(step)),
        };
        self.commit(drag.index(), released);
        Repaint::Canvas
    }

    /// The pointer left the surface; ends a drag exactly like a release.
    pub fn leave(&mut self, frames: &mut impl FrameScheduler) -> Repaint {
        self.press_end(frames)
    }

    /// Clear every corner and abort any drag.
    ///
    /// A frame still scheduled for the aborted drag becomes a no-op in
    /// [`on_frame`](Self::on_frame).
    pub fn reset(&mut self) {
        self.drag = None;
        self.corners.clear();
    }

    /// Replace the corners wholesale (used when restoring a selection).
    /// Aborts any drag.
    pub fn restore(&mut self, corners: CornerSet) {
        self.drag = None;
        self.corners = corners;
    }

    fn commit(&mut self, index: usize, point: CanvasPoint) {
        if let Err(err) = self.corners.replace(index, point) {
            log::warn!("{err}; abandoning drag");
            self.drag = None;
        }
    }

    /// Record the canvas element's on-screen size.
    pub fn set_display_size(&mut self, display: DisplaySize) -> bool {
        self.mapper.set_display_size(display)
    }

    /// Placed corners, canonical positions.
    #[must_use]
    pub const fn corners(&self) -> &CornerSet {
        &self.corners
    }

    /// Direct access to the corners.
    ///
    /// An active drag is not adjusted; if its corner disappears the drag
    /// is dropped at its next commit.
    pub const fn corners_mut(&mut self) -> &mut CornerSet {
        &mut self.corners
    }

    /// Active drag, if any.
    #[must_use]
    pub const fn drag(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    /// Whether a corner is being dragged.
    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Selection phase of the corners.
    #[must_use]
    pub fn phase(&self) -> SelectionPhase {
        self.corners.phase()
    }

    /// The surfaces this editor maps between.
    #[must_use]
    pub const fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    /// Display-space positions of every corner, for handle overlays.
    ///
    /// The dragged corner reports its pending position so the handle
    /// tracks the pointer ahead of the throttled canonical update.
    #[must_use]
    pub fn visual_corners(&self) -> Vec<DisplayPoint> {
        self.corners
            .points()
            .iter()
            .enumerate()
            .map(|(i, &p)| match self.drag {
                Some(drag) if drag.index() == i => drag.visual(),
                _ => self.mapper.to_display(p),
            })
            .collect()
    }

    /// Canvas-space corners as they should be drawn right now, with a
    /// pending drag position substituted.
    #[must_use]
    pub fn drawn_corners(&self) -> Vec<CanvasPoint> {
        self.corners
            .points()
            .iter()
            .enumerate()
            .map(|(i, &p)| match self.drag {
                Some(drag) if drag.index() == i => drag.pending(),
                _ => p,
            })
            .collect()
    }

    /// Canonical corners in source-image space.
    #[must_use]
    pub fn source_corners(&self) -> Vec<SourcePoint> {
        self.corners
            .points()
            .iter()
            .map(|&p| self.mapper.to_source(p))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::drag::ManualFrames;
    use crate::pointer::{PointerId, PointerKind};
    use crate::types::Dimensions;

    fn editor() -> Editor {
        let mapper = CoordinateMapper::for_image(Dimensions::new(1600, 1200), Dimensions::new(800, 600));
        Editor::new(mapper, &EditorConfig::default())
    }

    fn d(x: f64, y: f64) -> DisplayPoint {
        DisplayPoint::new(x, y)
    }

    fn c(x: f64, y: f64) -> CanvasPoint {
        CanvasPoint::new(x, y)
    }

    #[test]
    fn presses_place_up_to_four_corners() {
        let mut ed = editor();
        for (i, &(x, y)) in [(10.0, 10.0), (100.0, 10.0), (100.0, 100.0), (10.0, 100.0)]
            .iter()
            .enumerate()
        {
            assert_eq!(ed.press_start(d(x, y)), Repaint::Canvas);
            assert_eq!(ed.corners().len(), i + 1);
        }
        assert_eq!(ed.phase(), SelectionPhase::Complete);
        // Fifth press away from every corner: silently ignored.
        assert_eq!(ed.press_start(d(400.0, 400.0)), Repaint::None);
        assert_eq!(ed.corners().len(), 4);
        assert!(!ed.is_dragging());
    }

    #[test]
    fn press_near_corner_starts_drag() {
        let mut ed = editor();
        ed.press_start(d(100.0, 100.0));
        ed.press_start(d(300.0, 100.0));
        assert_eq!(ed.press_start(d(110.0, 95.0)), Repaint::Canvas);
        assert_eq!(ed.drag().map(DragSession::index), Some(0));
        assert_eq!(ed.corners().len(), 2);
    }

    #[test]
    fn moves_are_coalesced_to_one_commit_per_frame() {
        let mut frames = ManualFrames::new();
        let mut ed = editor();
        ed.press_start(d(100.0, 100.0));
        ed.press_start(d(100.0, 100.0));
        for x in [110.0, 120.0, 130.0] {
            assert_eq!(ed.press_move(d(x, 100.0), &mut frames), Repaint::Handles);
        }
        // Canonical corner untouched until the frame runs.
        assert_eq!(ed.corners().get(0), Some(c(100.0, 100.0)));
        assert_eq!(ed.visual_corners()[0], d(130.0, 100.0));
        assert_eq!(ed.drawn_corners()[0], c(130.0, 100.0));
        assert_eq!(frames.pending().len(), 1);

        let frame = frames.last().unwrap();
        assert_eq!(ed.on_frame(frame), Repaint::Canvas);
        assert_eq!(ed.corners().get(0), Some(c(130.0, 100.0)));
        // Same handle again is a no-op.
        assert_eq!(ed.on_frame(frame), Repaint::None);
        assert!(ed.is_dragging());
    }

    #[test]
    fn drag_is_clamped_to_canvas() {
        let mut frames = ManualFrames::new();
        let mut ed = editor();
        ed.press_start(d(5.0, 5.0));
        ed.press_start(d(5.0, 5.0));
        for &(x, y) in &[(-1e6, 50.0), (9e9, -3.0), (f64::NAN, 1e12), (-0.5, 600.5)] {
            ed.press_move(d(x, y), &mut frames);
            if let Some(frame) = frames.last() {
                ed.on_frame(frame);
            }
            let p = ed.corners().get(0).unwrap();
            assert!((0.0..=800.0).contains(&p.x) && (0.0..=600.0).contains(&p.y), "{p:?}");
        }
        ed.press_end(&mut frames);
        let p = ed.corners().get(0).unwrap();
        assert_eq!(p, c(0.0, 600.0));
    }

    #[test]
    fn overflowing_drag_lands_on_the_far_edge() {
        let mut frames = ManualFrames::new();
        let mut ed = editor();
        ed.press_start(d(700.0, 300.0));
        ed.press_start(d(700.0, 300.0));
        ed.press_move(d(f64::MAX, 300.0), &mut frames);
        ed.press_end(&mut frames);
        assert_eq!(ed.corners().get(0), Some(c(800.0, 300.0)));
    }

    #[test]
    fn release_commits_without_waiting_for_frame() {
        let mut frames = ManualFrames::new();
        let mut ed = editor();
        ed.press_start(d(50.0, 50.0));
        ed.press_start(d(50.0, 50.0));
        ed.press_move(d(77.25, 61.75), &mut frames);
        assert_eq!(ed.press_end(&mut frames), Repaint::Canvas);
        assert_eq!(ed.corners().get(0), Some(c(77.25, 61.75)));
        assert!(frames.pending().is_empty());
        assert!(!ed.is_dragging());
    }

    #[test]
    fn grid_snap_applies_only_at_release() {
        let mut frames = ManualFrames::new();
        let mapper = CoordinateMapper::for_image(Dimensions::new(798, 600), Dimensions::new(800, 600));
        let config = EditorConfig {
            snap: SnapPolicy::grid(),
            ..EditorConfig::default()
        };
        let mut ed = Editor::new(mapper, &config);
        ed.press_start(d(50.0, 50.0));
        ed.press_start(d(50.0, 50.0));
        ed.press_move(d(61.0, 73.0), &mut frames);
        ed.on_frame(frames.last().unwrap());
        assert_eq!(ed.corners().get(0), Some(c(61.0, 73.0)));
        ed.press_end(&mut frames);
        assert_eq!(ed.corners().get(0), Some(c(60.0, 75.0)));

        // Snapping near the far edge never leaves the canvas.
        ed.press_start(d(60.0, 75.0));
        ed.press_move(d(797.9, 10.0), &mut frames);
        ed.press_end(&mut frames);
        assert_eq!(ed.corners().get(0), Some(c(798.0, 10.0)));
    }

    #[test]
    fn leave_ends_drag_like_release() {
        let mut frames = ManualFrames::new();
        let mut ed = editor();
        ed.press_start(d(50.0, 50.0));
        ed.press_start(d(50.0, 50.0));
        ed.press_move(d(70.0, 70.0), &mut frames);
        assert_eq!(ed.leave(&mut frames), Repaint::Canvas);
        assert_eq!(ed.corners().get(0), Some(c(70.0, 70.0)));
        assert!(!ed.is_dragging());
    }

    #[test]
    fn stale_drag_index_aborts_silently() {
        let mut frames = ManualFrames::new();
        let mut ed = editor();
        ed.press_start(d(10.0, 10.0));
        ed.press_start(d(200.0, 10.0));
        ed.press_start(d(200.0, 10.0));
        assert_eq!(ed.drag().map(DragSession::index), Some(1));
        ed.press_move(d(210.0, 20.0), &mut frames);

        // Corners shrink under the drag.
        ed.corners_mut().clear();
        ed.corners_mut().try_push(c(10.0, 10.0));

        ed.on_frame(frames.last().unwrap());
        assert!(!ed.is_dragging());
        assert_eq!(ed.corners().points(), &[c(10.0, 10.0)]);
        // Subsequent input behaves normally.
        assert_eq!(ed.press_end(&mut frames), Repaint::None);
    }

    #[test]
    fn reset_aborts_drag_and_orphans_frame() {
        let mut frames = ManualFrames::new();
        let mut ed = editor();
        ed.press_start(d(10.0, 10.0));
        ed.press_start(d(10.0, 10.0));
        ed.press_move(d(40.0, 40.0), &mut frames);
        ed.reset();
        assert!(ed.corners().is_empty());
        assert!(!ed.is_dragging());
        assert_eq!(ed.on_frame(frames.last().unwrap()), Repaint::None);
        assert!(ed.corners().is_empty());
    }

    #[test]
    fn handle_event_tracks_surface_resizes() {
        let mut frames = ManualFrames::new();
        let mut ed = editor();
        let event = |phase, x, y, w, h| PointerEvent {
            phase,
            id: PointerId::MOUSE,
            kind: PointerKind::Mouse,
            position: d(x, y),
            surface: DisplaySize::new(w, h),
        };
        // Canvas shown at half size: display (50, 50) is canvas (100, 100).
        ed.handle_event(&event(PointerPhase::Press, 50.0, 50.0, 400.0, 300.0), &mut frames);
        assert_eq!(ed.corners().get(0), Some(c(100.0, 100.0)));

        // Layout grows to full size between events.
        ed.handle_event(&event(PointerPhase::Press, 300.0, 300.0, 800.0, 600.0), &mut frames);
        assert_eq!(ed.corners().get(1), Some(c(300.0, 300.0)));
        assert_eq!(ed.visual_corners()[0], d(100.0, 100.0));
    }

    #[test]
    fn source_corners_scale_by_size_ratio() {
        let mut ed = editor();
        for &(x, y) in &[(10.0, 10.0), (100.0, 10.0), (100.0, 100.0), (10.0, 100.0)] {
            ed.press_start(d(x, y));
        }
        let source = ed.source_corners();
        assert_eq!(
            source,
            vec![
                SourcePoint::new(20.0, 20.0),
                SourcePoint::new(200.0, 20.0),
                SourcePoint::new(200.0, 200.0),
                SourcePoint::new(20.0, 200.0),
            ]
        );
    }
}
