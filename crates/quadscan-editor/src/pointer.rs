//! Unification of mouse, pointer, and touch input.
//!
//! Browsers deliver the same physical gesture through several event
//! families: a finger on a touch screen fires pointer events, then touch
//! events, then emulated mouse events. Each family gets a thin
//! [`InputAdapter`] that turns its raw event into one [`PointerEvent`];
//! the [`PointerUnifier`] then decides which family is authoritative and
//! which pointer owns the gesture.

use crate::types::{DisplayPoint, DisplaySize};

/// Identity of one pointer (a mouse, a pen, or one finger).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointerId(pub i64);

impl PointerId {
    /// Id used for plain mouse events, which carry none of their own.
    pub const MOUSE: Self = Self(1);
}

/// Physical device behind a pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    /// Mouse or trackpad.
    Mouse,
    /// Stylus.
    Pen,
    /// Finger.
    Touch,
}

/// Event family an event was delivered through.
///
/// Ordered by precedence: once a richer family has been seen, events
/// from poorer families are compatibility duplicates and are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InputSource {
    /// `mousedown` / `mousemove` / `mouseup` / `mouseleave`.
    Mouse,
    /// `touchstart` / `touchmove` / `touchend` / `touchcancel`.
    Touch,
    /// `pointerdown` / `pointermove` / `pointerup` / `pointerleave` /
    /// `pointercancel`.
    Pointer,
}

/// Stage of a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    /// Button or contact went down.
    Press,
    /// Pointer moved.
    Move,
    /// Button or contact went up.
    Release,
    /// Pointer left the interactive surface.
    Leave,
    /// The platform took the gesture away (e.g. scrolling began).
    Cancel,
}

impl PointerPhase {
    /// Whether this phase ends any gesture the pointer owns.
    #[must_use]
    pub const fn ends_gesture(self) -> bool {
        matches!(self, Self::Release | Self::Leave | Self::Cancel)
    }
}

/// Viewport-relative box of the interactive surface, as reported by
/// `getBoundingClientRect()` at the time of the event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClientRect {
    /// Left edge in client coordinates.
    pub left: f64,
    /// Top edge in client coordinates.
    pub top: f64,
    /// Rendered width.
    pub width: f64,
    /// Rendered height.
    pub height: f64,
}

impl ClientRect {
    /// Convert client coordinates to a point relative to the surface.
    #[must_use]
    pub const fn local(&self, client_x: f64, client_y: f64) -> DisplayPoint {
        DisplayPoint::new(client_x - self.left, client_y - self.top)
    }

    /// On-screen size of the surface.
    #[must_use]
    pub const fn size(&self) -> DisplaySize {
        DisplaySize::new(self.width, self.height)
    }
}

/// One normalized input event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// Gesture stage.
    pub phase: PointerPhase,
    /// Pointer identity.
    pub id: PointerId,
    /// Device type.
    pub kind: PointerKind,
    /// Position relative to the surface's top-left corner.
    pub position: DisplayPoint,
    /// Surface size at the time of the event.
    pub surface: DisplaySize,
}

/// Raw mouse event fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseInput {
    /// Gesture stage.
    pub phase: PointerPhase,
    /// `clientX`.
    pub client_x: f64,
    /// `clientY`.
    pub client_y: f64,
    /// `button` (0 is the primary button).
    pub button: i16,
}

/// Raw pointer event fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    /// Gesture stage.
    pub phase: PointerPhase,
    /// `pointerId`.
    pub pointer_id: i32,
    /// `pointerType`.
    pub kind: PointerKind,
    /// `isPrimary`.
    pub is_primary: bool,
    /// `clientX`.
    pub client_x: f64,
    /// `clientY`.
    pub client_y: f64,
    /// `button` (0 is the primary button, -1 for moves).
    pub button: i16,
}

/// One entry of a touch event's `changedTouches`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    /// `identifier`.
    pub identifier: i64,
    /// `clientX`.
    pub client_x: f64,
    /// `clientY`.
    pub client_y: f64,
}

/// Raw touch event fields.
#[derive(Debug, Clone, PartialEq)]
pub struct TouchInput {
    /// Gesture stage.
    pub phase: PointerPhase,
    /// `changedTouches`.
    pub changed: Vec<TouchPoint>,
}

/// Translate one event family into [`PointerEvent`]s.
pub trait InputAdapter {
    /// Raw event shape.
    type Raw;

    /// Family this adapter handles.
    const SOURCE: InputSource;

    /// Normalize `raw`, or return `None` if it carries nothing the
    /// editor acts on.
    ///
    /// `captured` is the pointer currently owning the gesture; adapters
    /// that batch several contacts into one event use it to pick the
    /// relevant one.
    fn normalize(
        raw: &Self::Raw,
        rect: &ClientRect,
        captured: Option<PointerId>,
    ) -> Option<PointerEvent>;
}

/// Adapter for mouse events.
#[derive(Debug, Clone, Copy, Default)]
pub struct MouseAdapter;

impl InputAdapter for MouseAdapter {
    type Raw = MouseInput;
    const SOURCE: InputSource = InputSource::Mouse;

    fn normalize(
        raw: &MouseInput,
        rect: &ClientRect,
        _captured: Option<PointerId>,
    ) -> Option<PointerEvent> {
        // Secondary buttons neither start nor end a gesture.
        if matches!(raw.phase, PointerPhase::Press | PointerPhase::Release) && raw.button != 0 {
            return None;
        }
        Some(PointerEvent {
            phase: raw.phase,
            id: PointerId::MOUSE,
            kind: PointerKind::Mouse,
            position: rect.local(raw.client_x, raw.client_y),
            surface: rect.size(),
        })
    }
}

/// Adapter for pointer events.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerAdapter;

impl InputAdapter for PointerAdapter {
    type Raw = PointerInput;
    const SOURCE: InputSource = InputSource::Pointer;

    fn normalize(
        raw: &PointerInput,
        rect: &ClientRect,
        _captured: Option<PointerId>,
    ) -> Option<PointerEvent> {
        if raw.phase == PointerPhase::Press && (!raw.is_primary || raw.button != 0) {
            return None;
        }
        Some(PointerEvent {
            phase: raw.phase,
            id: PointerId(i64::from(raw.pointer_id)),
            kind: raw.kind,
            position: rect.local(raw.client_x, raw.client_y),
            surface: rect.size(),
        })
    }
}

/// Adapter for touch events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TouchAdapter;

impl InputAdapter for TouchAdapter {
    type Raw = TouchInput;
    const SOURCE: InputSource = InputSource::Touch;

    fn normalize(
        raw: &TouchInput,
        rect: &ClientRect,
        captured: Option<PointerId>,
    ) -> Option<PointerEvent> {
        let touch = match captured {
            Some(PointerId(id)) => raw.changed.iter().find(|t| t.identifier == id),
            None => raw.changed.first(),
        }?;
        Some(PointerEvent {
            phase: raw.phase,
            id: PointerId(touch.identifier),
            kind: PointerKind::Touch,
            position: rect.local(touch.client_x, touch.client_y),
            surface: rect.size(),
        })
    }
}

/// Merges all input families into one stream of [`PointerEvent`]s with
/// single-pointer capture semantics.
///
/// - The unifier locks onto the highest-precedence [`InputSource`] it
///   has seen; later events from lower families are dropped as
///   compatibility duplicates.
/// - The first press captures its pointer. Until that pointer releases,
///   leaves, or is cancelled, events from other pointers are dropped.
#[derive(Debug, Clone, Default)]
pub struct PointerUnifier {
    source: Option<InputSource>,
    captured: Option<PointerId>,
}

impl PointerUnifier {
    /// Create an unlocked unifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw event through adapter `A`.
    ///
    /// Returns the normalized event if the editor should see it.
    pub fn accept<A: InputAdapter>(&mut self, raw: &A::Raw, rect: &ClientRect) -> Option<PointerEvent> {
        match self.source {
            Some(locked) if A::SOURCE < locked => return None,
            Some(locked) if A::SOURCE > locked => {
                log::debug!("input source upgraded from {locked:?} to {:?}", A::SOURCE);
                self.source = Some(A::SOURCE);
                self.captured = None;
            }
            Some(_) => {}
            None => self.source = Some(A::SOURCE),
        }

        let event = A::normalize(raw, rect, self.captured)?;
        let owns = self.captured.is_none_or(|c| c == event.id);
        match event.phase {
            PointerPhase::Press => {
                if !owns {
                    return None;
                }
                self.captured = Some(event.id);
            }
            PointerPhase::Move => {
                if !owns {
                    return None;
                }
            }
            PointerPhase::Release | PointerPhase::Leave | PointerPhase::Cancel => {
                if !owns {
                    return None;
                }
                self.captured = None;
            }
        }
        Some(event)
    }

    /// Pointer currently owning the gesture.
    #[must_use]
    pub const fn captured(&self) -> Option<PointerId> {
        self.captured
    }

    /// Event family currently treated as authoritative.
    #[must_use]
    pub const fn source(&self) -> Option<InputSource> {
        self.source
    }

    /// Release any capture (the source lock is kept).
    pub const fn release(&mut self) {
        self.captured = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const RECT: ClientRect = ClientRect {
        left: 10.0,
        top: 20.0,
        width: 400.0,
        height: 300.0,
    };

    fn mouse(phase: PointerPhase, x: f64, y: f64) -> MouseInput {
        MouseInput {
            phase,
            client_x: x,
            client_y: y,
            button: 0,
        }
    }

    fn pointer(phase: PointerPhase, id: i32, x: f64, y: f64) -> PointerInput {
        PointerInput {
            phase,
            pointer_id: id,
            kind: PointerKind::Touch,
            is_primary: true,
            client_x: x,
            client_y: y,
            button: 0,
        }
    }

    fn touch(phase: PointerPhase, points: &[(i64, f64, f64)]) -> TouchInput {
        TouchInput {
            phase,
            changed: points
                .iter()
                .map(|&(identifier, client_x, client_y)| TouchPoint {
                    identifier,
                    client_x,
                    client_y,
                })
                .collect(),
        }
    }

    #[test]
    fn positions_are_relative_to_the_surface() {
        let mut unifier = PointerUnifier::new();
        let ev = unifier
            .accept::<MouseAdapter>(&mouse(PointerPhase::Press, 110.0, 70.0), &RECT)
            .unwrap();
        assert_eq!(ev.position, DisplayPoint::new(100.0, 50.0));
        assert_eq!(ev.surface, DisplaySize::new(400.0, 300.0));
        assert_eq!(ev.id, PointerId::MOUSE);
    }

    #[test]
    fn all_families_produce_the_same_event() {
        let from_mouse = PointerUnifier::new()
            .accept::<MouseAdapter>(&mouse(PointerPhase::Press, 50.0, 60.0), &RECT)
            .unwrap();
        let from_pointer = PointerUnifier::new()
            .accept::<PointerAdapter>(&pointer(PointerPhase::Press, 7, 50.0, 60.0), &RECT)
            .unwrap();
        let from_touch = PointerUnifier::new()
            .accept::<TouchAdapter>(&touch(PointerPhase::Press, &[(3, 50.0, 60.0)]), &RECT)
            .unwrap();
        assert_eq!(from_mouse.position, from_pointer.position);
        assert_eq!(from_pointer.position, from_touch.position);
        assert_eq!(from_mouse.phase, PointerPhase::Press);
        assert_eq!(from_touch.phase, PointerPhase::Press);
    }

    #[test]
    fn compatibility_mouse_events_are_dropped_after_pointer_events() {
        let mut unifier = PointerUnifier::new();
        assert!(unifier
            .accept::<PointerAdapter>(&pointer(PointerPhase::Press, 1, 0.0, 0.0), &RECT)
            .is_some());
        assert!(unifier
            .accept::<MouseAdapter>(&mouse(PointerPhase::Press, 0.0, 0.0), &RECT)
            .is_none());
        assert!(unifier
            .accept::<TouchAdapter>(&touch(PointerPhase::Move, &[(0, 5.0, 5.0)]), &RECT)
            .is_none());
        assert_eq!(unifier.source(), Some(InputSource::Pointer));
    }

    #[test]
    fn richer_source_takes_over() {
        let mut unifier = PointerUnifier::new();
        unifier.accept::<MouseAdapter>(&mouse(PointerPhase::Move, 0.0, 0.0), &RECT);
        assert_eq!(unifier.source(), Some(InputSource::Mouse));
        unifier.accept::<TouchAdapter>(&touch(PointerPhase::Press, &[(4, 0.0, 0.0)]), &RECT);
        assert_eq!(unifier.source(), Some(InputSource::Touch));
        assert_eq!(unifier.captured(), Some(PointerId(4)));
    }

    #[test]
    fn second_finger_is_ignored_while_first_is_captured() {
        let mut unifier = PointerUnifier::new();
        unifier
            .accept::<PointerAdapter>(&pointer(PointerPhase::Press, 1, 10.0, 10.0), &RECT)
            .unwrap();
        assert!(unifier
            .accept::<PointerAdapter>(&pointer(PointerPhase::Move, 2, 99.0, 99.0), &RECT)
            .is_none());
        assert!(unifier
            .accept::<PointerAdapter>(&pointer(PointerPhase::Release, 2, 99.0, 99.0), &RECT)
            .is_none());
        assert_eq!(unifier.captured(), Some(PointerId(1)));

        let up = unifier
            .accept::<PointerAdapter>(&pointer(PointerPhase::Release, 1, 12.0, 12.0), &RECT)
            .unwrap();
        assert_eq!(up.phase, PointerPhase::Release);
        assert_eq!(unifier.captured(), None);
    }

    #[test]
    fn touch_follows_the_captured_identifier() {
        let mut unifier = PointerUnifier::new();
        unifier
            .accept::<TouchAdapter>(&touch(PointerPhase::Press, &[(5, 10.0, 20.0)]), &RECT)
            .unwrap();
        let moved = unifier
            .accept::<TouchAdapter>(
                &touch(PointerPhase::Move, &[(6, 0.0, 0.0), (5, 30.0, 40.0)]),
                &RECT,
            )
            .unwrap();
        assert_eq!(moved.id, PointerId(5));
        assert_eq!(moved.position, DisplayPoint::new(20.0, 20.0));
    }

    #[test]
    fn leave_ends_the_gesture() {
        let mut unifier = PointerUnifier::new();
        unifier.accept::<MouseAdapter>(&mouse(PointerPhase::Press, 10.0, 20.0), &RECT);
        let left = unifier
            .accept::<MouseAdapter>(&mouse(PointerPhase::Leave, 500.0, 20.0), &RECT)
            .unwrap();
        assert!(left.phase.ends_gesture());
        assert_eq!(unifier.captured(), None);
    }

    #[test]
    fn secondary_buttons_are_ignored() {
        let mut unifier = PointerUnifier::new();
        let right_click = MouseInput {
            button: 2,
            ..mouse(PointerPhase::Press, 0.0, 0.0)
        };
        assert!(unifier.accept::<MouseAdapter>(&right_click, &RECT).is_none());
        assert_eq!(unifier.captured(), None);
    }
}
