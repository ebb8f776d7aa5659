//! Thumbnail rendering via the page's pdf.js bridge
//!
//! Page tiles are rendered with the pdf.js build the host page already
//! loads. Rendering is best-effort: when the library is missing the tiles
//! stay blank and everything else keeps working.

use pdfsplice_core::PdfSpliceError;
use wasm_bindgen::prelude::*;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::JsCast;
use web_sys::HtmlCanvasElement;

#[cfg(target_arch = "wasm32")]
use js_sys::{Object, Promise, Reflect, Uint8Array};
#[cfg(target_arch = "wasm32")]
use wasm_bindgen_futures::JsFuture;

/// Renders single-page artifacts onto canvas tiles
pub struct ThumbnailRenderer;

impl ThumbnailRenderer {
    /// Check if pdf.js is available in the browser environment
    pub fn is_available() -> bool {
        #[cfg(target_arch = "wasm32")]
        {
            let window = match web_sys::window() {
                Some(w) => w,
                None => return false,
            };
            if let Ok(val) = Reflect::get(&window, &JsValue::from_str("pdfjsLib")) {
                return !val.is_undefined();
            }
            false
        }

        #[cfg(not(target_arch = "wasm32"))]
        false
    }

    /// Render the first page of a PDF onto a canvas, scaled to the target
    /// width
    #[cfg(target_arch = "wasm32")]
    pub async fn render_page(
        bytes: &[u8],
        canvas: &HtmlCanvasElement,
        target_width: f64,
    ) -> Result<(), PdfSpliceError> {
        let window = web_sys::window()
            .ok_or_else(|| PdfSpliceError::OperationError("No window object".to_string()))?;

        let pdfjs = Reflect::get(&window, &JsValue::from_str("pdfjsLib")).map_err(|_| {
            PdfSpliceError::CapabilityUnavailable("pdf.js is not loaded".to_string())
        })?;
        if pdfjs.is_undefined() {
            return Err(PdfSpliceError::CapabilityUnavailable(
                "pdf.js is not loaded".to_string(),
            ));
        }

        // pdfjsLib.getDocument({ data }).promise
        let get_document = get_function(&pdfjs, "getDocument")?;
        let options = Object::new();
        Reflect::set(
            &options,
            &JsValue::from_str("data"),
            &Uint8Array::from(bytes),
        )
        .map_err(|e| js_error("Failed to set data", e))?;
        let loading_task = get_document
            .call1(&pdfjs, &options)
            .map_err(|e| js_error("getDocument failed", e))?;
        let document = await_promise_property(&loading_task, "promise").await?;

        // document.getPage(1)
        let get_page = get_function(&document, "getPage")?;
        let page_promise: Promise = get_page
            .call1(&document, &JsValue::from_f64(1.0))
            .map_err(|e| js_error("getPage failed", e))?
            .dyn_into()
            .map_err(|_| PdfSpliceError::OperationError("getPage: not a promise".to_string()))?;
        let page = JsFuture::from(page_promise)
            .await
            .map_err(|e| js_error("Page load failed", e))?;

        // Measure at scale 1, then scale the viewport to the target width
        let viewport = page_viewport(&page, 1.0)?;
        let width = Reflect::get(&viewport, &JsValue::from_str("width"))
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        let scale = if width > 0.0 { target_width / width } else { 1.0 };
        let viewport = page_viewport(&page, scale)?;

        let scaled_width = Reflect::get(&viewport, &JsValue::from_str("width"))
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(target_width);
        let scaled_height = Reflect::get(&viewport, &JsValue::from_str("height"))
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(target_width);
        canvas.set_width(scaled_width.ceil() as u32);
        canvas.set_height(scaled_height.ceil() as u32);

        let context = canvas
            .get_context("2d")
            .map_err(|e| js_error("Canvas context failed", e))?
            .ok_or_else(|| {
                PdfSpliceError::OperationError("Canvas has no 2d context".to_string())
            })?
            .dyn_into::<web_sys::CanvasRenderingContext2d>()
            .map_err(|_| {
                PdfSpliceError::OperationError("Unexpected canvas context type".to_string())
            })?;

        // page.render({ canvasContext, viewport }).promise
        let render = get_function(&page, "render")?;
        let params = Object::new();
        Reflect::set(&params, &JsValue::from_str("canvasContext"), &context)
            .map_err(|e| js_error("Failed to set canvasContext", e))?;
        Reflect::set(&params, &JsValue::from_str("viewport"), &viewport)
            .map_err(|e| js_error("Failed to set viewport", e))?;
        let render_task = render
            .call1(&page, &params)
            .map_err(|e| js_error("render failed", e))?;
        await_promise_property(&render_task, "promise").await?;

        Ok(())
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub async fn render_page(
        _bytes: &[u8],
        _canvas: &HtmlCanvasElement,
        _target_width: f64,
    ) -> Result<(), PdfSpliceError> {
        Err(PdfSpliceError::CapabilityUnavailable(
            "Thumbnail rendering requires a browser environment".to_string(),
        ))
    }
}

#[cfg(target_arch = "wasm32")]
fn js_error(context: &str, e: JsValue) -> PdfSpliceError {
    PdfSpliceError::OperationError(format!("{}: {:?}", context, e))
}

#[cfg(target_arch = "wasm32")]
fn get_function(target: &JsValue, name: &str) -> Result<js_sys::Function, PdfSpliceError> {
    let value = Reflect::get(target, &JsValue::from_str(name))
        .map_err(|e| js_error(name, e))?;
    value
        .dyn_into::<js_sys::Function>()
        .map_err(|_| PdfSpliceError::OperationError(format!("{} is not a function", name)))
}

/// Await a promise held in a property of `target` (the pdf.js task pattern)
#[cfg(target_arch = "wasm32")]
async fn await_promise_property(target: &JsValue, name: &str) -> Result<JsValue, PdfSpliceError> {
    let promise: Promise = Reflect::get(target, &JsValue::from_str(name))
        .map_err(|e| js_error(name, e))?
        .dyn_into()
        .map_err(|_| PdfSpliceError::OperationError(format!("{} is not a promise", name)))?;
    JsFuture::from(promise)
        .await
        .map_err(|e| js_error(name, e))
}

#[cfg(target_arch = "wasm32")]
fn page_viewport(page: &JsValue, scale: f64) -> Result<JsValue, PdfSpliceError> {
    let get_viewport = get_function(page, "getViewport")?;
    let params = Object::new();
    Reflect::set(&params, &JsValue::from_str("scale"), &JsValue::from_f64(scale))
        .map_err(|e| js_error("Failed to set scale", e))?;
    get_viewport
        .call1(page, &params)
        .map_err(|e| js_error("getViewport failed", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renderer_unavailable_off_browser() {
        assert!(!ThumbnailRenderer::is_available());
    }
}
