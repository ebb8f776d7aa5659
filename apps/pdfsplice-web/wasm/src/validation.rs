//! File checks and metadata probes
//!
//! Cheap checks for files as they are picked, plus metadata extraction for
//! the merge file list.

use lopdf::Document;
use pdfsplice_core::PdfSpliceError;
use serde::Serialize;

/// MIME type browsers report for PDF files
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Info shown next to a staged file
#[derive(Debug, Clone, Serialize, Default)]
pub struct PdfInfo {
    /// Page count
    pub page_count: u32,
    /// Version taken from the header line, e.g. "1.7"
    pub version: String,
    /// True when the document carries an /Encrypt entry
    pub encrypted: bool,
    /// Raw file size
    pub size_bytes: usize,
    /// /Title from the Info dictionary, when set
    pub title: Option<String>,
    /// /Author from the Info dictionary, when set
    pub author: Option<String>,
}

/// Whether a picked file claims to be a PDF, by media type or extension
pub fn is_pdf_file(name: &str, media_type: &str) -> bool {
    media_type == PDF_MEDIA_TYPE || name.to_ascii_lowercase().ends_with(".pdf")
}

/// Parse a PDF and extract the info the file list displays
pub fn validate_pdf(bytes: &[u8]) -> Result<PdfInfo, PdfSpliceError> {
    quick_validate(bytes)?;

    let version = header_version(bytes);
    let document = Document::load_mem(bytes).map_err(|e| PdfSpliceError::ParseError(e.to_string()))?;

    let pages = document.get_pages();
    if pages.is_empty() {
        return Err(PdfSpliceError::ValidationError("PDF has no pages".into()));
    }

    Ok(PdfInfo {
        page_count: pages.len() as u32,
        version,
        encrypted: document.is_encrypted(),
        size_bytes: bytes.len(),
        title: info_string(&document, b"Title"),
        author: info_string(&document, b"Author"),
    })
}

/// Structural sniff without parsing, for rejecting obvious non-PDFs early
pub fn quick_validate(bytes: &[u8]) -> Result<(), PdfSpliceError> {
    if bytes.len() < 8 {
        return Err(PdfSpliceError::ValidationError(
            "File too small to be a PDF".into(),
        ));
    }
    if !bytes.starts_with(b"%PDF-") {
        return Err(PdfSpliceError::ValidationError(
            "Missing %PDF- header at start of file".into(),
        ));
    }

    // The EOF marker should sit within the last KiB
    let tail = &bytes[bytes.len().saturating_sub(1024)..];
    if !tail.windows(5).any(|w| w == b"%%EOF") {
        return Err(PdfSpliceError::ValidationError(
            "No %%EOF marker near end of file".into(),
        ));
    }

    Ok(())
}

/// Version from the `%PDF-` header line
fn header_version(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(b"%PDF-") {
        let end = rest
            .iter()
            .position(|b| b.is_ascii_whitespace())
            .unwrap_or(rest.len())
            .min(8);
        if let Ok(version) = std::str::from_utf8(&rest[..end]) {
            if !version.is_empty() {
                return version.to_string();
            }
        }
    }
    "1.4".to_string()
}

/// String entry from the trailer's Info dictionary, when present
fn info_string(document: &Document, key: &[u8]) -> Option<String> {
    let info_id = document.trailer.get(b"Info").ok()?.as_reference().ok()?;
    let info = document.objects.get(&info_id)?.as_dict().ok()?;
    let raw = info.get(key).ok()?.as_str().ok()?;
    let decoded = String::from_utf8_lossy(raw);
    if decoded.is_empty() {
        None
    } else {
        Some(decoded.into_owned())
    }
}
