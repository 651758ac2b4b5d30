//! Processed result view with rotate, download, and navigation actions.

use dioxus::prelude::*;
use dioxus_free_icons::Icon;
use dioxus_free_icons::icons::ld_icons::{
    LdArrowLeft, LdDownload, LdRefreshCw, LdRotateCcw, LdRotateCw,
};
use quadscan_editor::Rotation;

/// Props for the [`ResultPanel`] component.
#[derive(Props, Clone, PartialEq)]
pub struct ResultPanelProps {
    /// Object URL of the rendered result.
    image_url: Option<String>,
    /// A render request is in flight; rotation is unavailable.
    busy: bool,
    /// Rotate the result a quarter turn.
    on_rotate: EventHandler<Rotation>,
    /// Save the result.
    on_download: EventHandler<()>,
    /// Return to corner selection.
    on_back: EventHandler<()>,
    /// Discard everything and upload another image.
    on_start_over: EventHandler<()>,
}

/// The processed document and what can be done with it.
#[component]
pub fn ResultPanel(props: ResultPanelProps) -> Element {
    let busy = props.busy;

    rsx! {
        div { class: "result-panel",
            div { class: if busy { "result-frame busy" } else { "result-frame" },
                if let Some(ref url) = props.image_url {
                    img { src: "{url}", alt: "Processed document" }
                }
                if busy {
                    p { class: "muted pulse overlay", "Processing..." }
                }
            }

            div { class: "actions",
                button {
                    class: "button",
                    title: "Rotate left",
                    disabled: busy,
                    onclick: move |_| props.on_rotate.call(Rotation::CounterClockwise),
                    Icon { width: 16, height: 16, icon: LdRotateCcw }
                }
                button {
                    class: "button",
                    title: "Rotate right",
                    disabled: busy,
                    onclick: move |_| props.on_rotate.call(Rotation::Clockwise),
                    Icon { width: 16, height: 16, icon: LdRotateCw }
                }
                button {
                    class: "button primary",
                    onclick: move |_| props.on_download.call(()),
                    Icon { width: 16, height: 16, icon: LdDownload }
                    " Download"
                }
                button {
                    class: "button",
                    onclick: move |_| props.on_back.call(()),
                    Icon { width: 16, height: 16, icon: LdArrowLeft }
                    " Adjust corners"
                }
                button {
                    class: "button",
                    onclick: move |_| props.on_start_over.call(()),
                    Icon { width: 16, height: 16, icon: LdRefreshCw }
                    " Start over"
                }
            }
        }
    }
}
