//! Canvas painting and Blob URL creation.
//!
//! The selection overlay is rendered natively into a tiny-skia pixmap
//! and copied onto the `<canvas>` with `putImageData`. Encoded images
//! from the service are shown through object URLs.

use quadscan_editor::to_rgba_image;
use tiny_skia::Pixmap;
use wasm_bindgen::{Clamped, JsCast, JsValue};
use web_sys::{BlobPropertyBag, CanvasRenderingContext2d, HtmlCanvasElement, ImageData};

/// Errors that can occur while painting or creating Blob URLs.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    /// The target canvas is not in the document.
    #[error("no canvas with id {0:?}")]
    MissingCanvas(String),

    /// A browser API call returned an error.
    #[error("browser API error: {0}")]
    JsError(String),
}

impl From<JsValue> for RasterError {
    fn from(value: JsValue) -> Self {
        Self::JsError(format!("{value:?}"))
    }
}

/// MIME type of an encoded image, sniffed from its header.
#[must_use]
pub fn mime_type(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes).map_or("application/octet-stream", |format| format.to_mime_type())
}

/// Wrap encoded bytes in a Blob URL for use as an `<img src>` or
/// download link.
///
/// The returned URL must be revoked via [`revoke_blob_url`] when no
/// longer needed.
///
/// # Errors
///
/// Returns [`RasterError::JsError`] if Blob or URL creation fails.
pub fn bytes_to_blob_url(bytes: &[u8]) -> Result<String, RasterError> {
    let parts = js_sys::Array::new();
    parts.push(&js_sys::Uint8Array::from(bytes));

    let opts = BlobPropertyBag::new();
    opts.set_type(mime_type(bytes));
    let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &opts)?;

    Ok(web_sys::Url::create_object_url_with_blob(&blob)?)
}

/// Revoke a Blob URL previously created by [`bytes_to_blob_url`].
///
/// Best-effort: failures are silently ignored since the URL may have
/// already been revoked.
pub fn revoke_blob_url(url: &str) {
    let _ = web_sys::Url::revoke_object_url(url);
}

/// Copy `pixmap` onto the canvas element `canvas_id`, resizing its
/// backing store to match.
///
/// # Errors
///
/// Returns [`RasterError::MissingCanvas`] if the element does not exist
/// (yet) and [`RasterError::JsError`] if a 2D context cannot be obtained.
pub fn paint_pixmap(canvas_id: &str, pixmap: &Pixmap) -> Result<(), RasterError> {
    let canvas = web_sys::window()
        .and_then(|window| window.document())
        .and_then(|document| document.get_element_by_id(canvas_id))
        .and_then(|element| element.dyn_into::<HtmlCanvasElement>().ok())
        .ok_or_else(|| RasterError::MissingCanvas(canvas_id.to_owned()))?;

    if canvas.width() != pixmap.width() {
        canvas.set_width(pixmap.width());
    }
    if canvas.height() != pixmap.height() {
        canvas.set_height(pixmap.height());
    }

    let context: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or_else(|| RasterError::JsError("canvas has no 2d context".into()))?
        .dyn_into()
        .map_err(|e| RasterError::JsError(format!("unexpected context type: {e:?}")))?;

    let rgba = to_rgba_image(pixmap);
    let data = ImageData::new_with_u8_clamped_array_and_sh(
        Clamped(rgba.as_raw().as_slice()),
        rgba.width(),
        rgba.height(),
    )?;
    context.put_image_data(&data, 0.0, 0.0)?;
    Ok(())
}
