//! Boundary to the external processing service.
//!
//! [`ProcessingGateway`] is the only place the workflow performs I/O.
//! Requests carry immutable copies of everything the service needs; the
//! editor's live state is never handed across.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::OutputPreferences;
use crate::corners::MAX_CORNERS;
use crate::error::{GatewayError, ValidationError};
use crate::types::SourcePoint;

/// Service-side identifier of an uploaded source image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(pub String);

/// Service-side identifier of a processed result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultRef(pub String);

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ResultRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A file chosen for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// Original file name, used for the extension check.
    pub name: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Extensions the service accepts (compared case-insensitively).
    pub const ALLOWED_EXTENSIONS: [&'static str; 5] = ["png", "jpg", "jpeg", "gif", "bmp"];

    /// Lower-cased extension of [`name`](Self::name).
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
    }

    /// Check the file before any request is made.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::MissingFile`] if the name is blank.
    /// - [`ValidationError::UnsupportedFileType`] for other extensions.
    /// - [`ValidationError::EmptyFile`] if there are no bytes.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingFile);
        }
        match self.extension() {
            Some(ext) if Self::ALLOWED_EXTENSIONS.contains(&ext.as_str()) => {}
            _ => return Err(ValidationError::UnsupportedFileType(self.name.clone())),
        }
        if self.bytes.is_empty() {
            return Err(ValidationError::EmptyFile);
        }
        Ok(())
    }
}

/// Successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReply {
    /// Identifier for subsequent requests.
    pub image_ref: ImageRef,
    /// Encoded image for the selection canvas.
    pub preview: Vec<u8>,
}

/// A first processing request.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRequest {
    /// Image to process.
    pub image: ImageRef,
    /// Quadrilateral in source-image space, or `None` for the whole image.
    pub corners: Option<[SourcePoint; MAX_CORNERS]>,
    /// Output parameters.
    pub prefs: OutputPreferences,
}

/// A refinement of an existing result with new parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ReprocessRequest {
    /// Same fields as the original submission, with the new parameters.
    pub process: ProcessRequest,
    /// Result being refined.
    pub prior: ResultRef,
}

/// A rendered result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedResult {
    /// Identifier of the stored result.
    pub result_ref: ResultRef,
    /// Encoded result image.
    pub image: Vec<u8>,
}

/// Quarter-turn rotation of a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rotation {
    /// +90°.
    Clockwise,
    /// -90°.
    CounterClockwise,
}

impl Rotation {
    /// Signed angle in degrees as sent to the service.
    #[must_use]
    pub const fn degrees(self) -> i32 {
        match self {
            Self::Clockwise => 90,
            Self::CounterClockwise => -90,
        }
    }

    /// Parse a signed angle.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnsupportedRotation`] unless `degrees`
    /// is ±90 (or the equivalent 270 / -270).
    pub const fn from_degrees(degrees: i32) -> Result<Self, ValidationError> {
        match degrees.rem_euclid(360) {
            90 => Ok(Self::Clockwise),
            270 => Ok(Self::CounterClockwise),
            _ => Err(ValidationError::UnsupportedRotation { degrees }),
        }
    }
}

/// The external processing service.
///
/// Implementations are single-threaded (`!Send` futures are fine); the
/// workflow never issues two calls whose results could both be applied
/// without checking request tokens first.
#[allow(async_fn_in_trait)]
pub trait ProcessingGateway {
    /// Store a source image.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] on transport or service failure.
    async fn upload(&self, file: &UploadFile) -> Result<UploadReply, GatewayError>;

    /// Process a selection for the first time.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] on transport or service failure.
    async fn process(&self, request: &ProcessRequest) -> Result<RenderedResult, GatewayError>;

    /// Re-render an existing result with new parameters.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] on transport or service failure.
    async fn reprocess(&self, request: &ReprocessRequest)
    -> Result<RenderedResult, GatewayError>;

    /// Rotate a stored result; returns the new rendering.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] on transport or service failure.
    async fn rotate(&self, result: &ResultRef, rotation: Rotation)
    -> Result<Vec<u8>, GatewayError>;

    /// Fetch a stored result's bytes for saving.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] on transport or service failure.
    async fn download(&self, result: &ResultRef) -> Result<Vec<u8>, GatewayError>;
}
