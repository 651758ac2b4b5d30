//! Dioxus UI components for quadscan.
//!
//! Provides the upload drop zone, the corner-selection canvas, output
//! parameter controls, the result view with its actions, and the notice
//! banner.

mod notice;
mod output;
mod result;
mod selection;
mod upload;

pub use notice::NoticeBanner;
pub use output::OutputControls;
pub use result::ResultPanel;
pub use selection::{SELECTION_CANVAS_ID, SelectionCanvas};
pub use upload::FileUpload;
