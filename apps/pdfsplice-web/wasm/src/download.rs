//! Browser download plumbing
//!
//! Hands finished artifacts to the browser through object URLs and a
//! synthetic anchor click. URLs created for one-shot downloads are revoked
//! shortly after the click; URLs backing visible page tiles are owned by the
//! session and revoked when their entry goes away.

use crate::validation::PDF_MEDIA_TYPE;
use pdfsplice_core::{Artifact, PdfSpliceError};
use wasm_bindgen::prelude::*;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::JsCast;

const ZIP_MEDIA_TYPE: &str = "application/zip";

/// How long a one-shot download URL stays alive after the click
pub const REVOKE_DELAY_MS: i32 = 1000;

/// Media type an artifact downloads under, by extension
pub fn media_type_for(filename: &str) -> &'static str {
    if filename.to_ascii_lowercase().ends_with(".zip") {
        ZIP_MEDIA_TYPE
    } else {
        PDF_MEDIA_TYPE
    }
}

/// Wrap bytes in a Blob and return an object URL for it
#[cfg(target_arch = "wasm32")]
pub fn create_blob_url(bytes: &[u8], media_type: &str) -> Result<String, PdfSpliceError> {
    let parts = js_sys::Array::new();
    parts.push(&js_sys::Uint8Array::from(bytes));

    let options = web_sys::BlobPropertyBag::new();
    options.set_type(media_type);

    let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &options)
        .map_err(|e| js_error("Blob creation failed", e))?;
    web_sys::Url::create_object_url_with_blob(&blob)
        .map_err(|e| js_error("Object URL creation failed", e))
}

#[cfg(not(target_arch = "wasm32"))]
pub fn create_blob_url(_bytes: &[u8], _media_type: &str) -> Result<String, PdfSpliceError> {
    Err(PdfSpliceError::CapabilityUnavailable(
        "Downloads require a browser environment".to_string(),
    ))
}

/// Release an object URL. Safe to call with an already-revoked URL.
pub fn revoke_blob_url(url: &str) {
    #[cfg(target_arch = "wasm32")]
    {
        let _ = web_sys::Url::revoke_object_url(url);
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = url;
    }
}

/// Download a URL by clicking a hidden anchor
#[cfg(target_arch = "wasm32")]
pub fn trigger_download(url: &str, filename: &str) -> Result<(), PdfSpliceError> {
    let window = web_sys::window()
        .ok_or_else(|| PdfSpliceError::OperationError("No window object".to_string()))?;
    let document = window
        .document()
        .ok_or_else(|| PdfSpliceError::OperationError("No document object".to_string()))?;

    let anchor: web_sys::HtmlAnchorElement = document
        .create_element("a")
        .map_err(|e| js_error("Element creation failed", e))?
        .dyn_into()
        .map_err(|_| PdfSpliceError::OperationError("Unexpected element type".to_string()))?;
    anchor.set_href(url);
    anchor.set_download(filename);
    anchor
        .set_attribute("style", "display: none")
        .map_err(|e| js_error("Could not hide link", e))?;

    let body = document
        .body()
        .ok_or_else(|| PdfSpliceError::OperationError("No document body".to_string()))?;
    body.append_child(&anchor)
        .map_err(|e| js_error("Could not attach link", e))?;
    anchor.click();
    anchor.remove();

    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
pub fn trigger_download(_url: &str, _filename: &str) -> Result<(), PdfSpliceError> {
    Err(PdfSpliceError::CapabilityUnavailable(
        "Downloads require a browser environment".to_string(),
    ))
}

/// Download an artifact under its own filename, revoking the temporary URL
/// once the browser has had time to take it
pub fn save_artifact(artifact: &Artifact) -> Result<(), PdfSpliceError> {
    let url = create_blob_url(&artifact.bytes, media_type_for(&artifact.filename))?;
    trigger_download(&url, &artifact.filename)?;
    schedule_revoke(url);
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn schedule_revoke(url: String) {
    let window = match web_sys::window() {
        Some(w) => w,
        None => return,
    };
    let callback = Closure::once_into_js(move || {
        revoke_blob_url(&url);
    });
    let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
        callback.unchecked_ref(),
        REVOKE_DELAY_MS,
    );
}

#[cfg(not(target_arch = "wasm32"))]
fn schedule_revoke(_url: String) {}

#[cfg(target_arch = "wasm32")]
fn js_error(context: &str, e: JsValue) -> PdfSpliceError {
    PdfSpliceError::OperationError(format!("{}: {:?}", context, e))
}
