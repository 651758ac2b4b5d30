//! [`ProcessingGateway`] over the browser `fetch` API.
//!
//! Request bodies and reply decoding come from
//! [`quadscan_editor::wire`]; this module only moves bytes.

use quadscan_editor::wire::{self, ProcessBody, Reply, RotateBody};
use quadscan_editor::{
    GatewayConfig, GatewayError, ProcessRequest, ProcessingGateway, RenderedResult,
    ReprocessRequest, ResultRef, Rotation, UploadFile, UploadReply,
};
use serde::Serialize;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{BlobPropertyBag, FormData, Request, RequestInit, Response};

/// Talks to the scanner service over HTTP.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpGateway {
    config: GatewayConfig,
}

impl HttpGateway {
    /// Gateway rooted at `config.base_url`.
    #[must_use]
    pub const fn new(config: GatewayConfig) -> Self {
        Self { config }
    }

    /// Gateway rooted at `window.API_BASE`, or same origin if unset.
    #[must_use]
    pub fn from_window() -> Self {
        let base_url = web_sys::window()
            .and_then(|window| js_sys::Reflect::get(&window, &JsValue::from_str("API_BASE")).ok())
            .and_then(|value| value.as_string())
            .unwrap_or_default();
        log::debug!("service base url: {base_url:?}");
        Self::new(GatewayConfig { base_url })
    }

    /// Where requests go.
    #[must_use]
    pub const fn config(&self) -> &GatewayConfig {
        &self.config
    }

    #[allow(clippy::future_not_send)] // WASM is single-threaded
    async fn post_json(&self, path: &str, body: &impl Serialize) -> Result<Reply, GatewayError> {
        let json = serde_json::to_string(body)?;
        let init = RequestInit::new();
        init.set_method("POST");
        init.set_body(&JsValue::from_str(&json));
        let request =
            Request::new_with_str_and_init(&self.config.endpoint(path), &init).map_err(js_error)?;
        request
            .headers()
            .set("Content-Type", "application/json")
            .map_err(js_error)?;
        let (status, bytes) = send(&request).await?;
        Reply::parse(status, &bytes)
    }
}

impl ProcessingGateway for HttpGateway {
    async fn upload(&self, file: &UploadFile) -> Result<UploadReply, GatewayError> {
        let parts = js_sys::Array::new();
        parts.push(&js_sys::Uint8Array::from(file.bytes.as_slice()));
        let opts = BlobPropertyBag::new();
        if let Ok(format) = image::guess_format(&file.bytes) {
            opts.set_type(format.to_mime_type());
        }
        let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &opts)
            .map_err(js_error)?;

        let form = FormData::new().map_err(js_error)?;
        form.append_with_blob_and_filename(wire::UPLOAD_FIELD, &blob, &file.name)
            .map_err(js_error)?;

        let init = RequestInit::new();
        init.set_method("POST");
        init.set_body(&form);
        let request = Request::new_with_str_and_init(&self.config.endpoint(wire::UPLOAD_PATH), &init)
            .map_err(js_error)?;
        let (status, bytes) = send(&request).await?;
        Reply::parse(status, &bytes)?.into_upload()
    }

    async fn process(&self, request: &ProcessRequest) -> Result<RenderedResult, GatewayError> {
        self.post_json(wire::PROCESS_PATH, &ProcessBody::from(request))
            .await?
            .into_rendered()
    }

    async fn reprocess(&self, request: &ReprocessRequest) -> Result<RenderedResult, GatewayError> {
        self.post_json(wire::REPROCESS_PATH, &ProcessBody::from(request))
            .await?
            .into_rendered()
    }

    async fn rotate(&self, result: &ResultRef, rotation: Rotation) -> Result<Vec<u8>, GatewayError> {
        self.post_json(wire::ROTATE_PATH, &RotateBody::new(result, rotation))
            .await?
            .into_image()
    }

    async fn download(&self, result: &ResultRef) -> Result<Vec<u8>, GatewayError> {
        let url = self.config.endpoint(&wire::download_path(result));
        let request = Request::new_with_str(&url).map_err(js_error)?;
        let (status, bytes) = send(&request).await?;
        if (200..300).contains(&status) {
            Ok(bytes)
        } else {
            // Failure bodies are JSON `{error}`; parse() turns them into
            // the service's message.
            Reply::parse(status, &bytes).and(Err(GatewayError::Service {
                status: Some(status),
                message: format!("download failed with HTTP {status}"),
            }))
        }
    }
}

/// Fetch `request` and collect the status and full body.
#[allow(clippy::future_not_send)] // WASM is single-threaded
async fn send(request: &Request) -> Result<(u16, Vec<u8>), GatewayError> {
    let window =
        web_sys::window().ok_or_else(|| GatewayError::Transport("no global window".into()))?;
    let response: Response = JsFuture::from(window.fetch_with_request(request))
        .await
        .map_err(js_error)?
        .dyn_into()
        .map_err(|value| GatewayError::Transport(format!("fetch did not yield a Response: {value:?}")))?;
    let buffer = JsFuture::from(response.array_buffer().map_err(js_error)?)
        .await
        .map_err(js_error)?;
    let bytes = js_sys::Uint8Array::new(&buffer).to_vec();
    log::debug!("{} {} -> {}", request.method(), request.url(), response.status());
    Ok((response.status(), bytes))
}

/// A failed browser call is a transport failure: the service never saw
/// (or never answered) the request.
fn js_error(value: JsValue) -> GatewayError {
    GatewayError::Transport(
        value
            .as_string()
            .or_else(|| {
                value
                    .dyn_ref::<js_sys::Error>()
                    .map(|err| String::from(err.message()))
            })
            .unwrap_or_else(|| format!("{value:?}")),
    )
}
