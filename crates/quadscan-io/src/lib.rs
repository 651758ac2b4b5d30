//! quadscan-io: Browser I/O and Dioxus component library.
//!
//! Implements the editor's I/O seams for the browser (the HTTP
//! [`ProcessingGateway`](quadscan_editor::ProcessingGateway), the
//! `localStorage` preference store, and the `requestAnimationFrame`
//! frame scheduler), converts DOM events into editor inputs, paints
//! rendered selections onto a canvas, and provides the UI components
//! of the quadscan web application.

pub mod components;
pub mod download;
pub mod frame;
pub mod http;
pub mod input;
pub mod raster;
pub mod storage;

pub use components::{
    FileUpload, NoticeBanner, OutputControls, ResultPanel, SELECTION_CANVAS_ID, SelectionCanvas,
};
pub use frame::BrowserFrames;
pub use http::HttpGateway;
pub use storage::LocalStorage;
