//! File upload component with drag-and-drop and file picker.

use dioxus::html::{FileData, HasFileData};
use dioxus::prelude::*;
use quadscan_editor::UploadFile;

/// Props for the [`FileUpload`] component.
#[derive(Props, Clone, PartialEq)]
pub struct FileUploadProps {
    /// Called with the chosen file. Type checks happen downstream so the
    /// message ends up in the same place as every other upload error.
    on_upload: EventHandler<UploadFile>,
    /// An upload is in flight; further files are refused.
    busy: bool,
}

/// A drag-and-drop zone with a file picker button.
#[component]
pub fn FileUpload(props: FileUploadProps) -> Element {
    let mut dragging = use_signal(|| false);
    let mut read_error = use_signal(|| Option::<String>::None);
    let busy = props.busy;

    // Shared by the picker and drop paths.
    let process_files = move |files: Vec<FileData>| async move {
        if busy {
            return;
        }
        let Some(file) = files.first() else {
            return;
        };
        let name = file.name();
        match file.read_bytes().await {
            Ok(bytes) => {
                read_error.set(None);
                props.on_upload.call(UploadFile {
                    name,
                    bytes: bytes.to_vec(),
                });
            }
            Err(e) => {
                read_error.set(Some(format!("Failed to read {name}: {e}")));
            }
        }
    };

    let handle_files = move |evt: FormEvent| async move {
        process_files(evt.files()).await;
    };

    let handle_drop = move |evt: DragEvent| async move {
        evt.prevent_default();
        dragging.set(false);
        process_files(evt.files()).await;
    };

    let accept = UploadFile::ALLOWED_EXTENSIONS
        .iter()
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(",");
    let types = UploadFile::ALLOWED_EXTENSIONS.join(", ").to_uppercase();
    let zone_class = if dragging() { "drop-zone dragging" } else { "drop-zone" };

    rsx! {
        div {
            class: "{zone_class}",
            ondragover: move |evt| {
                evt.prevent_default();
                dragging.set(true);
            },
            ondragleave: move |_| {
                dragging.set(false);
            },
            ondrop: handle_drop,

            if let Some(ref err) = read_error() {
                p { class: "inline-error", "{err}" }
            }

            if busy {
                p { class: "muted pulse", "Uploading..." }
            } else {
                p { class: "muted", "Drop a photo of a document here or " }
                label { class: "button primary",
                    input {
                        r#type: "file",
                        accept: "{accept}",
                        class: "hidden",
                        onchange: handle_files,
                    }
                    "Choose File"
                }
                p { class: "hint", "{types}" }
            }
        }
    }
}
