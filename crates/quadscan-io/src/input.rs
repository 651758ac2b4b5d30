//! Dioxus DOM events to raw editor inputs.
//!
//! Each converter copies the fields the editor's input adapters read.
//! Coordinates stay in client space; [`surface_rect`] supplies the
//! surface box, measured afresh for every event so layout changes
//! between events are picked up.

use dioxus::html::input_data::MouseButton;
use dioxus::html::{InteractionLocation, PointerInteraction};
use dioxus::prelude::{MouseData, PointerData, TouchData};
use quadscan_editor::{
    ClientRect, MouseInput, PointerInput, PointerKind, PointerPhase, TouchInput, TouchPoint,
};

/// DOM `button` code of the button that triggered an event, or `-1` if
/// none did (moves).
fn button_code(button: Option<MouseButton>) -> i16 {
    match button {
        Some(MouseButton::Primary) => 0,
        Some(MouseButton::Auxiliary) => 1,
        Some(MouseButton::Secondary) => 2,
        Some(MouseButton::Fourth) => 3,
        Some(MouseButton::Fifth) => 4,
        Some(MouseButton::Unknown) | None => -1,
    }
}

/// Map a DOM `pointerType`.
#[must_use]
pub fn pointer_kind(pointer_type: &str) -> PointerKind {
    match pointer_type {
        "touch" => PointerKind::Touch,
        "pen" => PointerKind::Pen,
        _ => PointerKind::Mouse,
    }
}

/// Copy a mouse event.
#[must_use]
pub fn mouse_input(data: &MouseData, phase: PointerPhase) -> MouseInput {
    let client = data.client_coordinates();
    MouseInput {
        phase,
        client_x: client.x,
        client_y: client.y,
        button: button_code(data.trigger_button()),
    }
}

/// Copy a pointer event.
#[must_use]
pub fn pointer_input(data: &PointerData, phase: PointerPhase) -> PointerInput {
    let client = data.client_coordinates();
    PointerInput {
        phase,
        pointer_id: data.pointer_id(),
        kind: pointer_kind(&data.pointer_type()),
        is_primary: data.is_primary(),
        client_x: client.x,
        client_y: client.y,
        button: button_code(data.trigger_button()),
    }
}

/// Copy a touch event's changed contacts.
#[must_use]
pub fn touch_input(data: &TouchData, phase: PointerPhase) -> TouchInput {
    TouchInput {
        phase,
        changed: data
            .touches_changed()
            .iter()
            .map(|touch| {
                let client = touch.client_coordinates();
                TouchPoint {
                    identifier: i64::from(touch.identifier()),
                    client_x: client.x,
                    client_y: client.y,
                }
            })
            .collect(),
    }
}

/// Current viewport box of the element `id`.
#[must_use]
pub fn surface_rect(id: &str) -> Option<ClientRect> {
    let element = web_sys::window()?.document()?.get_element_by_id(id)?;
    let rect = element.get_bounding_client_rect();
    Some(ClientRect {
        left: rect.left(),
        top: rect.top(),
        width: rect.width(),
        height: rect.height(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_codes_follow_the_dom() {
        assert_eq!(button_code(Some(MouseButton::Primary)), 0);
        assert_eq!(button_code(Some(MouseButton::Secondary)), 2);
        assert_eq!(button_code(None), -1);
    }

    #[test]
    fn unknown_pointer_types_are_mice() {
        assert_eq!(pointer_kind("touch"), PointerKind::Touch);
        assert_eq!(pointer_kind("pen"), PointerKind::Pen);
        assert_eq!(pointer_kind(""), PointerKind::Mouse);
    }
}
