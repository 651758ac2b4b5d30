//! Error taxonomy and user-facing notices.
//!
//! - [`ValidationError`]: the user asked for something that cannot be
//!   done yet (no file, incomplete selection). Shown inline; no state
//!   transition.
//! - [`GatewayError`]: the processing service or transport failed. Shown
//!   as a transient banner; state reverts to what it was before the call.
//! - [`StateInconsistency`]: an internal race (e.g. a drag index that
//!   outlived its corner). Logged, never shown.

use std::fmt;
use std::time::Duration;

/// A user action that cannot be carried out in the current state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// No file was chosen for upload.
    #[error("please choose an image file")]
    MissingFile,

    /// The chosen file has no content.
    #[error("the chosen file is empty")]
    EmptyFile,

    /// The chosen file's extension is not an accepted image type.
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Submission with a partially placed quadrilateral.
    #[error("select all four corners (or none for the whole image); {placed} placed")]
    IncompleteSelection {
        /// Number of corners currently placed (1 to 3).
        placed: usize,
    },

    /// Rotation by an angle that is not a quarter turn.
    #[error("unsupported rotation angle: {degrees}°")]
    UnsupportedRotation {
        /// Requested angle.
        degrees: i32,
    },
}

/// A failed exchange with the processing service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The request could not be sent or the connection failed.
    #[error("network error: {0}")]
    Transport(String),

    /// The service answered with a failure.
    #[error("{message}")]
    Service {
        /// HTTP status, when known.
        status: Option<u16>,
        /// Message reported by the service.
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The returned image could not be decoded.
    #[error("could not read returned image: {0}")]
    Image(String),
}

impl From<image::ImageError> for GatewayError {
    fn from(err: image::ImageError) -> Self {
        Self::Image(err.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<base64::DecodeError> for GatewayError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Decode(format!("invalid base64 image data: {err}"))
    }
}

/// Internal state that no longer lines up, caused by a race rather than
/// by the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateInconsistency {
    /// The corner being dragged no longer exists.
    #[error("drag index {index} out of range for {len} corners")]
    StaleDragIndex {
        /// Index held by the drag session.
        index: usize,
        /// Current corner count.
        len: usize,
    },
}

/// A workflow operation that talks to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Upload a source image.
    Upload,
    /// First processing of a selection.
    Process,
    /// Re-render an existing result with new parameters.
    Reprocess,
    /// Rotate the current result.
    Rotate,
    /// Fetch the current result's bytes.
    Download,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Upload => "upload",
            Self::Process => "process",
            Self::Reprocess => "reprocess",
            Self::Rotate => "rotate",
            Self::Download => "download",
        })
    }
}

/// Errors surfaced by workflow operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    /// Rejected locally before any request was made.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The gateway call failed.
    #[error("{operation} failed: {source}")]
    Gateway {
        /// Which call failed.
        operation: Operation,
        /// Underlying failure.
        source: GatewayError,
    },

    /// A request of the same kind is already in flight.
    #[error("{0} already in progress")]
    Busy(Operation),

    /// The operation is not available in the current step.
    #[error("{operation} is not available while {step}")]
    WrongStep {
        /// Requested operation.
        operation: Operation,
        /// Step the workflow is in.
        step: crate::workflow::Step,
    },
}

impl WorkflowError {
    /// Wrap a gateway failure for `operation`.
    #[must_use]
    pub const fn gateway(operation: Operation, source: GatewayError) -> Self {
        Self::Gateway { operation, source }
    }

    /// How this error should be presented to the user.
    #[must_use]
    pub fn notice(&self) -> Notice {
        match self {
            Self::Validation(_) | Self::WrongStep { .. } | Self::Busy(_) => Notice {
                severity: Severity::Inline,
                message: self.to_string(),
                auto_dismiss: None,
            },
            Self::Gateway { .. } => Notice {
                severity: Severity::Banner,
                message: self.to_string(),
                auto_dismiss: Some(Notice::BANNER_TIMEOUT),
            },
        }
    }
}

/// Where a user-visible message is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Next to the control that was used; stays until the next action.
    Inline,
    /// Transient banner at the top of the page.
    Banner,
}

/// A user-visible message derived from a [`WorkflowError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Placement.
    pub severity: Severity,
    /// Message text.
    pub message: String,
    /// How long until the notice disappears on its own.
    pub auto_dismiss: Option<Duration>,
}

impl Notice {
    /// Lifetime of banner notices.
    pub const BANNER_TIMEOUT: Duration = Duration::from_secs(5);
}
