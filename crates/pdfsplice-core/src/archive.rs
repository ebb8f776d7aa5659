//! ZIP archive building
//!
//! Packs selected single-page artifacts into an in-memory ZIP for download.
//! Progress is weighted by bytes written rather than file count, so large
//! pages move the bar proportionally.

use crate::error::PdfSpliceError;
use crate::store::{Artifact, Entry};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Suffix appended to the archive base name
pub const ZIP_SUFFIX: &str = "_pages.zip";

/// Pack the given entries' artifacts into a ZIP named `{base}{ZIP_SUFFIX}`.
///
/// Entries are stored deflated under their artifact filenames, in the order
/// given. The callback receives cumulative byte percents after each file.
pub fn build_archive<F>(
    entries: &[&Entry],
    base: &str,
    mut progress: F,
) -> Result<Artifact, PdfSpliceError>
where
    F: FnMut(u8),
{
    if entries.is_empty() {
        return Err(PdfSpliceError::ValidationError("Nothing to archive".into()));
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let total: usize = entries.iter().map(|e| e.artifact.bytes.len()).sum();
    let mut written = 0usize;

    for entry in entries {
        writer
            .start_file(entry.artifact.filename.as_str(), options)
            .map_err(|e| {
                PdfSpliceError::ArchiveError(format!(
                    "Could not add {}: {}",
                    entry.artifact.filename, e
                ))
            })?;
        writer.write_all(&entry.artifact.bytes).map_err(|e| {
            PdfSpliceError::ArchiveError(format!(
                "Could not write {}: {}",
                entry.artifact.filename, e
            ))
        })?;

        written += entry.artifact.bytes.len();
        let percent = if total == 0 {
            100
        } else {
            ((written as f64 / total as f64) * 100.0).round() as u8
        };
        progress(percent);
    }

    let cursor = writer
        .finish()
        .map_err(|e| PdfSpliceError::ArchiveError(format!("Could not finalize: {}", e)))?;

    Ok(Artifact {
        bytes: cursor.into_inner(),
        filename: format!("{}{}", base, ZIP_SUFFIX),
    })
}
