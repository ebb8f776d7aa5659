//! Core PDF splitting and merging engine
//!
//! Pure-Rust page manipulation behind the pdfsplice web app. Parses PDFs
//! with `lopdf`, extracts every page into a standalone document, merges
//! whole files or hand-picked pages, and packs selections into ZIP
//! archives. The crate has no browser or I/O dependencies; long operations
//! report progress through callbacks so a UI layer can drive them.

pub mod archive;
pub mod error;
pub mod export;
pub mod merge;
pub mod pages;
pub mod split;
pub mod store;

pub use archive::{build_archive, ZIP_SUFFIX};
pub use error::PdfSpliceError;
pub use export::{archive_base, execute_plan, plan_export, ExportAction, ExportPlan};
pub use merge::{merge_files, merge_selected};
pub use pages::DocumentBuilder;
pub use split::{split_batch, split_source, BatchProgress, IngestReport};
pub use store::{Artifact, Entry, EntryId, EntryStore, SourceDocument};

use lopdf::Document;

/// Count the pages of a PDF without keeping the parse around
pub fn page_count(bytes: &[u8]) -> Result<u32, PdfSpliceError> {
    let document =
        Document::load_mem(bytes).map_err(|e| PdfSpliceError::ParseError(e.to_string()))?;
    Ok(document.get_pages().len() as u32)
}

/// File name with a trailing `.pdf` (any case) stripped, for building
/// derived output names
pub fn base_name(file_name: &str) -> &str {
    let len = file_name.len();
    if len >= 4 {
        let split = len - 4;
        if file_name.is_char_boundary(split) && file_name[split..].eq_ignore_ascii_case(".pdf")
        {
            return &file_name[..split];
        }
    }
    file_name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name_strips_extension() {
        assert_eq!(base_name("report.pdf"), "report");
        assert_eq!(base_name("SCAN.PDF"), "SCAN");
        assert_eq!(base_name("a.b.pdf"), "a.b");
    }

    #[test]
    fn test_base_name_keeps_other_names() {
        assert_eq!(base_name("notes.txt"), "notes.txt");
        assert_eq!(base_name("pdf"), "pdf");
        assert_eq!(base_name(""), "");
    }

    #[test]
    fn test_base_name_handles_multibyte_names() {
        assert_eq!(base_name("文書.pdf"), "文書");
        // Last four bytes land inside a character; name passes through
        assert_eq!(base_name("文書"), "文書");
    }

    #[test]
    fn test_page_count_rejects_non_pdf_bytes() {
        assert!(page_count(&[1, 2, 3]).is_err());
        assert!(page_count(&[]).is_err());
    }
}
