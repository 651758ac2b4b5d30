//! Output parameter controls.

use dioxus::prelude::*;
use quadscan_editor::{OutputMode, OutputPreferences, ProcessingOption};

/// Props for the [`OutputControls`] component.
#[derive(Props, Clone, PartialEq)]
pub struct OutputControlsProps {
    /// Currently chosen parameters.
    prefs: OutputPreferences,
    /// Fired with the complete new parameter set on any change.
    on_change: EventHandler<OutputPreferences>,
}

/// Color mode toggle and processing option select.
///
/// Changes take effect immediately; in the result step the caller turns
/// rapid changes into a single reprocess.
#[component]
pub fn OutputControls(props: OutputControlsProps) -> Element {
    let prefs = props.prefs;
    let on_change = props.on_change;
    let selected_processing = ProcessingOption::ALL
        .iter()
        .position(|choice| *choice == prefs.processing)
        .unwrap_or_default();

    rsx! {
        div { class: "output-controls",
            fieldset { class: "mode-toggle",
                legend { "Output" }
                for mode in OutputMode::ALL {
                    label { key: "{mode}",
                        input {
                            r#type: "radio",
                            name: "color-mode",
                            value: "{mode}",
                            checked: prefs.mode == mode,
                            onchange: move |_| on_change.call(OutputPreferences { mode, ..prefs }),
                        }
                        "{mode.label()}"
                    }
                }
            }

            label { r#for: "processing-option", "Processing" }
            select {
                id: "processing-option",
                value: "{selected_processing}",
                onchange: move |e| {
                    let chosen = e
                        .value()
                        .parse::<usize>()
                        .ok()
                        .and_then(|index| ProcessingOption::ALL.get(index).copied());
                    if let Some(processing) = chosen {
                        on_change.call(OutputPreferences { processing, ..prefs });
                    }
                },
                for (index, choice) in ProcessingOption::ALL.iter().enumerate() {
                    option {
                        value: "{index}",
                        selected: index == selected_processing,
                        "{choice.label()}"
                    }
                }
            }
        }
    }
}
