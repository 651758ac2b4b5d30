//! quadscan-editor: Quadrilateral selection editor and scan workflow (sans-IO).
//!
//! Lets a user mark a document's four corners on a displayed image and
//! drives the upload → select → result workflow against an external
//! processing service:
//!
//! - [`CoordinateMapper`] converts between display, canvas, and
//!   source-image space.
//! - [`PointerUnifier`] folds mouse, pointer, and touch events into one
//!   [`PointerEvent`] stream.
//! - [`Editor`] owns the [`CornerSet`] and the optional [`DragSession`],
//!   coalescing drag commits to animation frames.
//! - [`render`] paints the selection over the cached base image.
//! - [`Workflow`] is the step machine with its durable
//!   [`WorkflowSnapshot`]; [`Controller`] drives it over a
//!   [`ProcessingGateway`].
//!
//! This crate has **no I/O dependencies**. Browser APIs, HTTP, and
//! storage live in `quadscan-io`.

pub mod config;
pub mod controller;
pub mod corners;
pub mod debounce;
pub mod drag;
pub mod editor;
pub mod error;
pub mod gateway;
pub mod mapper;
pub mod pointer;
pub mod prefs;
pub mod render;
pub mod token;
pub mod types;
pub mod wire;
pub mod workflow;

pub use config::{
    EditorConfig, GatewayConfig, OutputMode, OutputPreferences, ProcessingOption, SnapPolicy,
};
pub use controller::Controller;
pub use corners::{CornerSet, MAX_CORNERS, SelectionPhase};
pub use debounce::Debouncer;
pub use drag::{DragSession, FrameHandle, FrameScheduler, ManualFrames};
pub use editor::{Editor, Repaint};
pub use error::{
    GatewayError, Notice, Operation, Severity, StateInconsistency, ValidationError, WorkflowError,
};
pub use gateway::{
    ImageRef, ProcessRequest, ProcessingGateway, RenderedResult, ReprocessRequest, ResultRef,
    Rotation, UploadFile, UploadReply,
};
pub use mapper::{CoordinateMapper, fit_canvas};
pub use pointer::{
    ClientRect, InputAdapter, InputSource, MouseAdapter, MouseInput, PointerAdapter, PointerEvent,
    PointerId, PointerInput, PointerKind, PointerPhase, PointerUnifier, TouchAdapter, TouchInput,
    TouchPoint,
};
pub use prefs::{MemoryPreferences, OUTPUT_MODE_KEY, PreferenceStore};
pub use render::{BaseImage, RenderError, SelectionStyle, render, render_into, to_rgba_image};
pub use token::{RequestToken, Slot, TokenLedger};
pub use types::{
    CanvasPoint, CanvasSpace, Dimensions, DisplayPoint, DisplaySize, DisplaySpace, Point,
    SourcePoint, SourceSpace, Space,
};
pub use workflow::{
    Completion, LoadedImage, ResultView, Step, SubmittedSelection, Workflow, WorkflowSnapshot,
};
