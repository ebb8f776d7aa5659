//! WASM bindings for PDF split and merge sessions
//!
//! Everything stateful lives on the Rust side of the boundary; the page
//! scripts stay thin.
//!
//! ## Architecture
//!
//! - `PdfSpliceSession` owns staged files, parsed entries and the merge list
//! - Validation, page extraction and merging run in Rust on raw bytes
//! - Blob URL lifecycle and download triggering handled via web-sys
//! - The host page forwards DOM events and `File` bytes, nothing more
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { PdfSpliceSession, SessionMode } from './pkg/pdfsplice_wasm.js';
//!
//! await init();
//!
//! // Split mode
//! const session = new PdfSpliceSession(SessionMode.Split);
//! session.setProgressCallback((percent) => updateBar(percent));
//! session.stageFile(file.name, file.type, bytes);
//! const reports = await session.commitBatch();
//! await session.downloadSelected([1, 3, 4]);
//!
//! // Merge mode
//! const session = new PdfSpliceSession(SessionMode.Merge);
//! session.addMergeFile("a.pdf", "application/pdf", bytesA);
//! session.addMergeFile("b.pdf", "application/pdf", bytesB);
//! session.moveMergeFileBefore(1, 0); // a.pdf now second
//! await session.mergeAll();
//! ```

pub mod download;
pub mod render;
pub mod session;
pub mod validation;

use wasm_bindgen::prelude::*;

// Surface the session types at the package root
pub use session::{PdfSpliceSession, SessionMode};
pub use validation::PdfInfo;

/// Module entry point, run once by wasm-bindgen on load
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Crate version, shown in the page footer
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Structural check on raw bytes, usable before any session exists
#[wasm_bindgen]
pub fn quick_validate(bytes: &[u8]) -> Result<(), JsValue> {
    validation::quick_validate(bytes).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Parse a file and return its metadata without staging it anywhere
#[wasm_bindgen]
pub fn get_pdf_info(bytes: &[u8]) -> Result<JsValue, JsValue> {
    let info = validation::validate_pdf(bytes).map_err(|e| JsValue::from_str(&e.to_string()))?;

    serde_wasm_bindgen::to_value(&info)
        .map_err(|e| JsValue::from_str(&format!("Could not serialize info: {}", e)))
}

/// Human-readable size for the staged-file list
#[wasm_bindgen]
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_version() {
        assert!(get_version().split('.').count() >= 2);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(999), "999 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1_572_864), "1.5 MB");
        assert_eq!(format_bytes(3_221_225_472), "3.0 GB");
    }
}
