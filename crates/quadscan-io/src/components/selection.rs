//! Corner-selection canvas.
//!
//! The canvas shows a pixmap rendered natively by the caller and turns
//! every mouse, pointer, and touch event on it into one normalized
//! [`PointerEvent`] stream. While a corner is dragged, a lightweight
//! marker follows the pointer on every event; the canvas itself is only
//! repainted when the caller hands it a new pixmap.

use std::rc::Rc;

use dioxus::prelude::PointerEvent as DomPointerEvent;
use dioxus::prelude::*;
use quadscan_editor::{
    Dimensions, DisplayPoint, InputAdapter, MouseAdapter, PointerAdapter, PointerEvent,
    PointerPhase, PointerUnifier, TouchAdapter,
};
use tiny_skia::Pixmap;

use crate::{input, raster};

/// DOM id of the selection `<canvas>`.
pub const SELECTION_CANVAS_ID: &str = "selection-canvas";

/// Props for the [`SelectionCanvas`] component.
#[derive(Props, Clone, PartialEq)]
pub struct SelectionCanvasProps {
    /// Intrinsic surface size; the canvas never displays larger.
    canvas: Dimensions,
    /// Latest rendering of image plus selection.
    picture: Signal<Option<Rc<Pixmap>>>,
    /// Display-space position of the corner being dragged. Read only by
    /// this component, so drag moves do not re-render the page.
    marker: Signal<Option<DisplayPoint>>,
    /// Fired with each event the editor should see.
    on_pointer: EventHandler<PointerEvent>,
}

fn dispatch<A: InputAdapter>(
    mut unifier: CopyValue<PointerUnifier>,
    raw: &A::Raw,
    on_pointer: EventHandler<PointerEvent>,
) {
    let Some(rect) = input::surface_rect(SELECTION_CANVAS_ID) else {
        return;
    };
    let event = unifier.write().accept::<A>(raw, &rect);
    if let Some(event) = event {
        on_pointer.call(event);
    }
}

/// Canvas on which the user places and drags the four corners.
#[component]
pub fn SelectionCanvas(props: SelectionCanvasProps) -> Element {
    let unifier = use_hook(|| CopyValue::new(PointerUnifier::new()));
    let picture = props.picture;
    let on_pointer = props.on_pointer;

    use_effect(move || {
        if let Some(pixmap) = picture.read().as_ref()
            && let Err(err) = raster::paint_pixmap(SELECTION_CANVAS_ID, pixmap)
        {
            log::warn!("failed to paint selection: {err}");
        }
    });

    let pointer = move |evt: DomPointerEvent, phase: PointerPhase| {
        dispatch::<PointerAdapter>(unifier, &input::pointer_input(&evt.data(), phase), on_pointer);
    };
    let mouse = move |evt: MouseEvent, phase: PointerPhase| {
        dispatch::<MouseAdapter>(unifier, &input::mouse_input(&evt.data(), phase), on_pointer);
    };
    let touch = move |evt: TouchEvent, phase: PointerPhase| {
        // Keep the page from scrolling or synthesizing mouse events.
        evt.prevent_default();
        dispatch::<TouchAdapter>(unifier, &input::touch_input(&evt.data(), phase), on_pointer);
    };

    let Dimensions { width, height } = props.canvas;

    rsx! {
        div {
            class: "selection-surface",
            style: "max-width: {width}px;",

            canvas {
                id: SELECTION_CANVAS_ID,
                width: "{width}",
                height: "{height}",

                onpointerdown: move |evt| pointer(evt, PointerPhase::Press),
                onpointermove: move |evt| pointer(evt, PointerPhase::Move),
                onpointerup: move |evt| pointer(evt, PointerPhase::Release),
                onpointerleave: move |evt| pointer(evt, PointerPhase::Leave),
                onpointercancel: move |evt| pointer(evt, PointerPhase::Cancel),

                onmousedown: move |evt| mouse(evt, PointerPhase::Press),
                onmousemove: move |evt| mouse(evt, PointerPhase::Move),
                onmouseup: move |evt| mouse(evt, PointerPhase::Release),
                onmouseleave: move |evt| mouse(evt, PointerPhase::Leave),

                ontouchstart: move |evt| touch(evt, PointerPhase::Press),
                ontouchmove: move |evt| touch(evt, PointerPhase::Move),
                ontouchend: move |evt| touch(evt, PointerPhase::Release),
                ontouchcancel: move |evt| touch(evt, PointerPhase::Cancel),
            }

            if let Some(at) = (props.marker)() {
                div {
                    class: "drag-marker",
                    style: "left: {at.x}px; top: {at.y}px;",
                }
            }
        }
    }
}
