//! JSON wire format of the processing service.
//!
//! Kept separate from any HTTP client so the request bodies and reply
//! decoding can be checked natively.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::config::{OutputMode, ProcessingOption};
use crate::error::GatewayError;
use crate::gateway::{
    ImageRef, ProcessRequest, RenderedResult, ReprocessRequest, ResultRef, Rotation, UploadReply,
};

/// Multipart upload endpoint.
pub const UPLOAD_PATH: &str = "/upload";
/// First-time processing endpoint.
pub const PROCESS_PATH: &str = "/process";
/// Refinement endpoint.
pub const REPROCESS_PATH: &str = "/reprocess";
/// Rotation endpoint.
pub const ROTATE_PATH: &str = "/rotate";
/// Multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "file";

/// Path of the download endpoint for `result`.
#[must_use]
pub fn download_path(result: &ResultRef) -> String {
    format!("/download/{result}")
}

/// Body of `/process` and `/reprocess`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessBody {
    /// Uploaded image identifier.
    pub filename: String,
    /// `[[x, y]; 4]` in source pixels, or `null` for the whole image.
    pub corners: Option<Vec<[f64; 2]>>,
    /// Color treatment.
    pub color_mode: OutputMode,
    /// Post-processing option.
    pub processing: ProcessingOption,
    /// Result being refined (`/reprocess` only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_filename: Option<String>,
}

impl From<&ProcessRequest> for ProcessBody {
    fn from(request: &ProcessRequest) -> Self {
        Self {
            filename: request.image.0.clone(),
            corners: request
                .corners
                .map(|quad| quad.iter().map(|p| p.to_array()).collect()),
            color_mode: request.prefs.mode,
            processing: request.prefs.processing,
            prior_filename: None,
        }
    }
}

impl From<&ReprocessRequest> for ProcessBody {
    fn from(request: &ReprocessRequest) -> Self {
        Self {
            prior_filename: Some(request.prior.0.clone()),
            ..Self::from(&request.process)
        }
    }
}

/// Body of `/rotate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotateBody {
    /// Result to rotate.
    pub filename: String,
    /// `90` (clockwise) or `-90` (counter-clockwise).
    pub angle: i32,
}

impl RotateBody {
    /// Body rotating `result`.
    #[must_use]
    pub fn new(result: &ResultRef, rotation: Rotation) -> Self {
        Self {
            filename: result.0.clone(),
            angle: rotation.degrees(),
        }
    }
}

/// Any JSON reply from the service.
///
/// Fields are optional because each endpoint fills a different subset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Reply {
    /// `true` on success.
    #[serde(default)]
    pub success: bool,
    /// Stored upload name.
    #[serde(default)]
    pub filename: Option<String>,
    /// Stored result name.
    #[serde(default)]
    pub processed_filename: Option<String>,
    /// Base64 image.
    #[serde(default)]
    pub image_data: Option<String>,
    /// Failure message.
    #[serde(default)]
    pub error: Option<String>,
}

impl Reply {
    /// Parse a reply and turn failure replies into errors.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::Service`] when the reply carries `error`, lacks
    ///   `success: true`, or has a non-2xx status without a JSON body.
    /// - [`GatewayError::Decode`] when a 2xx body is not valid JSON.
    pub fn parse(status: u16, body: &[u8]) -> Result<Self, GatewayError> {
        let ok = (200..300).contains(&status);
        let reply: Self = match serde_json::from_slice(body) {
            Ok(reply) => reply,
            Err(_) if !ok => {
                return Err(GatewayError::Service {
                    status: Some(status),
                    message: format!("request failed with HTTP {status}"),
                });
            }
            Err(err) => return Err(err.into()),
        };
        if let Some(message) = reply.error {
            return Err(GatewayError::Service {
                status: Some(status),
                message,
            });
        }
        if !ok || !reply.success {
            return Err(GatewayError::Service {
                status: Some(status),
                message: format!("request failed with HTTP {status}"),
            });
        }
        Ok(reply)
    }

    fn image(&self) -> Result<Vec<u8>, GatewayError> {
        let data = self
            .image_data
            .as_deref()
            .ok_or_else(|| GatewayError::Decode("reply has no image_data".into()))?;
        decode_image_data(data)
    }

    /// Interpret as an `/upload` reply.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Decode`] if `filename` or `image_data` is
    /// missing or malformed.
    pub fn into_upload(self) -> Result<UploadReply, GatewayError> {
        let preview = self.image()?;
        let filename = self
            .filename
            .ok_or_else(|| GatewayError::Decode("reply has no filename".into()))?;
        Ok(UploadReply {
            image_ref: ImageRef(filename),
            preview,
        })
    }

    /// Interpret as a `/process` or `/reprocess` reply.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Decode`] if `processed_filename` or
    /// `image_data` is missing or malformed.
    pub fn into_rendered(self) -> Result<RenderedResult, GatewayError> {
        let image = self.image()?;
        let name = self
            .processed_filename
            .ok_or_else(|| GatewayError::Decode("reply has no processed_filename".into()))?;
        Ok(RenderedResult {
            result_ref: ResultRef(name),
            image,
        })
    }

    /// Interpret as a `/rotate` reply.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Decode`] if `image_data` is missing or
    /// malformed.
    pub fn into_image(self) -> Result<Vec<u8>, GatewayError> {
        self.image()
    }
}

/// Decode a base64 `image_data` field.
///
/// Tolerates a `data:<mime>;base64,` prefix.
///
/// # Errors
///
/// Returns [`GatewayError::Decode`] for invalid base64.
pub fn decode_image_data(data: &str) -> Result<Vec<u8>, GatewayError> {
    let payload = data
        .split_once(";base64,")
        .map_or(data, |(_, payload)| payload);
    Ok(STANDARD.decode(payload.trim())?)
}
