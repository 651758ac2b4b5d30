//! `requestAnimationFrame` as a [`FrameScheduler`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use gloo_render::{AnimationFrame, request_animation_frame};
use quadscan_editor::{FrameHandle, FrameScheduler};

/// Live frame requests keyed by handle.
///
/// A request is owned here until it fires or is cancelled; dropping it
/// releases whatever it holds, the browser callback included.
struct Pending<R> {
    next: u64,
    live: HashMap<u64, R>,
}

impl<R> Default for Pending<R> {
    fn default() -> Self {
        Self {
            next: 0,
            live: HashMap::new(),
        }
    }
}

impl<R> Pending<R> {
    fn reserve(&mut self) -> FrameHandle {
        self.next += 1;
        FrameHandle(self.next)
    }

    fn insert(&mut self, handle: FrameHandle, request: R) {
        self.live.insert(handle.0, request);
    }

    /// Forget `handle`, handing back its request if it was still live.
    fn remove(&mut self, handle: FrameHandle) -> Option<R> {
        self.live.remove(&handle.0)
    }
}

/// Schedules frame callbacks with the browser.
///
/// When a frame fires, `on_frame` is called with the handle that
/// [`request_frame`](FrameScheduler::request_frame) returned. The callback
/// runs from the browser's frame loop, outside any borrow held by the
/// caller that scheduled it.
#[derive(Clone)]
pub struct BrowserFrames {
    pending: Rc<RefCell<Pending<AnimationFrame>>>,
    on_frame: Rc<dyn Fn(FrameHandle)>,
}

impl BrowserFrames {
    /// Scheduler delivering fired frames to `on_frame`.
    pub fn new(on_frame: impl Fn(FrameHandle) + 'static) -> Self {
        Self {
            pending: Rc::default(),
            on_frame: Rc::new(on_frame),
        }
    }

    /// Number of frames requested and not yet fired or cancelled.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.pending.borrow().live.len()
    }
}

impl FrameScheduler for BrowserFrames {
    fn request_frame(&mut self) -> FrameHandle {
        let handle = self.pending.borrow_mut().reserve();
        let fired = Rc::clone(&self.pending);
        let on_frame = Rc::clone(&self.on_frame);
        let frame = request_animation_frame(move |_timestamp| {
            fired.borrow_mut().remove(handle);
            on_frame(handle);
        });
        self.pending.borrow_mut().insert(handle, frame);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        // Dropping the request cancels it and frees its callback.
        self.pending.borrow_mut().remove(handle);
    }
}
