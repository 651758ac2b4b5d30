//! User-visible error messages.

use dioxus::prelude::*;
use quadscan_editor::{Notice, Severity};

/// Props for the [`NoticeBanner`] component.
#[derive(Props, Clone, PartialEq)]
pub struct NoticeBannerProps {
    /// Message to show, if any.
    notice: Option<Notice>,
    /// The user closed the message.
    on_dismiss: EventHandler<()>,
}

/// Shows the current notice: banners across the top of the page, inline
/// messages in the flow of the current step.
#[component]
pub fn NoticeBanner(props: NoticeBannerProps) -> Element {
    let Some(notice) = props.notice else {
        return rsx! {};
    };
    let class = match notice.severity {
        Severity::Banner => "notice banner",
        Severity::Inline => "notice inline-error",
    };

    rsx! {
        div { class: "{class}", role: "alert",
            span { "{notice.message}" }
            button {
                class: "dismiss",
                aria_label: "Dismiss",
                onclick: move |_| props.on_dismiss.call(()),
                "×"
            }
        }
    }
}
