//! Drag sessions and frame-coalesced commits.

use crate::types::{CanvasPoint, DisplayPoint};

/// Handle of a scheduled frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// "Run once before the next paint".
///
/// The browser implementation wraps `requestAnimationFrame`; when the
/// frame fires, the host calls
/// [`Editor::on_frame`](crate::Editor::on_frame) with the handle that was
/// returned here.
pub trait FrameScheduler {
    /// Schedule a frame callback.
    fn request_frame(&mut self) -> FrameHandle;

    /// Drop a previously scheduled callback. Cancelling a handle that
    /// already fired is a no-op.
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// A corner being relocated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    index: usize,
    pending: CanvasPoint,
    visual: DisplayPoint,
    frame: Option<FrameHandle>,
}

impl DragSession {
    /// Start dragging corner `index`, currently at `at`.
    #[must_use]
    pub const fn new(index: usize, at: CanvasPoint, visual: DisplayPoint) -> Self {
        Self {
            index,
            pending: at,
            visual,
            frame: None,
        }
    }

    /// Index of the corner being dragged.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Latest clamped canvas position, not yet committed.
    #[must_use]
    pub const fn pending(&self) -> CanvasPoint {
        self.pending
    }

    /// Latest position in display space, for handle overlays.
    #[must_use]
    pub const fn visual(&self) -> DisplayPoint {
        self.visual
    }

    /// Frame callback that will commit [`pending`](Self::pending).
    #[must_use]
    pub const fn frame(&self) -> Option<FrameHandle> {
        self.frame
    }

    /// Record a move and reschedule the commit.
    ///
    /// Any previously scheduled frame is cancelled so at most one commit
    /// is outstanding.
    pub fn update(
        &mut self,
        pending: CanvasPoint,
        visual: DisplayPoint,
        frames: &mut impl FrameScheduler,
    ) {
        self.pending = pending;
        self.visual = visual;
        if let Some(old) = self.frame.take() {
            frames.cancel_frame(old);
        }
        self.frame = Some(frames.request_frame());
    }

    /// Consume the scheduled frame if `handle` is it.
    pub fn take_frame(&mut self, handle: FrameHandle) -> bool {
        if self.frame == Some(handle) {
            self.frame = None;
            true
        } else {
            false
        }
    }

    /// Cancel the outstanding frame, if any.
    pub fn cancel_frame(&mut self, frames: &mut impl FrameScheduler) {
        if let Some(handle) = self.frame.take() {
            frames.cancel_frame(handle);
        }
    }
}

/// Deterministic [`FrameScheduler`] that only records requests.
///
/// Frames never fire on their own; tests (and the preview CLI) fire them
/// explicitly with the handle from [`last`](Self::last).
#[derive(Debug, Clone, Default)]
pub struct ManualFrames {
    next: u64,
    pending: Vec<FrameHandle>,
    cancelled: usize,
}

impl ManualFrames {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently requested frame that has not been cancelled.
    #[must_use]
    pub fn last(&self) -> Option<FrameHandle> {
        self.pending.last().copied()
    }

    /// Frames requested and not cancelled.
    #[must_use]
    pub fn pending(&self) -> &[FrameHandle] {
        &self.pending
    }

    /// Number of cancellations seen.
    #[must_use]
    pub const fn cancelled(&self) -> usize {
        self.cancelled
    }

    /// Remove and return every pending frame, as if they all fired.
    pub fn drain(&mut self) -> Vec<FrameHandle> {
        std::mem::take(&mut self.pending)
    }
}

impl FrameScheduler for ManualFrames {
    fn request_frame(&mut self) -> FrameHandle {
        self.next += 1;
        let handle = FrameHandle(self.next);
        self.pending.push(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        let before = self.pending.len();
        self.pending.retain(|&h| h != handle);
        if self.pending.len() != before {
            self.cancelled += 1;
        }
    }
}
