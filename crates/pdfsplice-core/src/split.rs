//! PDF split operations
//!
//! Extracts every page of a source document into a standalone single-page
//! PDF. Batch splits normalize progress across all files so one bar can run
//! 0-100 over the whole ingest.

use crate::base_name;
use crate::error::PdfSpliceError;
use crate::pages::DocumentBuilder;
use crate::store::{Artifact, EntryId, EntryStore, SourceDocument};
use serde::Serialize;

/// Progress accounting for a multi-file split.
///
/// The denominator is the combined page count of every file that parsed, so
/// a single run over several files reports one monotone 0-100 sequence.
#[derive(Debug, Clone, Copy)]
pub struct BatchProgress {
    processed: u32,
    total: u32,
}

impl BatchProgress {
    pub fn new(total: u32) -> Self {
        Self {
            processed: 0,
            total,
        }
    }

    /// Percent complete once `page` pages of the current file are done
    pub fn percent(&self, page: u32) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let done = (self.processed + page) as f64;
        ((done / self.total as f64) * 100.0).round() as u8
    }

    /// Fold a finished file's pages into the running count
    pub fn file_done(&mut self, pages: u32) {
        self.processed += pages;
    }
}

/// Outcome of ingesting one file in a batch: either the ids of the entries
/// it produced, or the error that kept it out of the store
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub file_name: String,
    pub entry_ids: Vec<EntryId>,
    pub error: Option<String>,
}

/// Split a parsed source into one artifact per page.
///
/// Artifacts are named `{base}_page_{n}.pdf` after the source file. The
/// callback receives `(pages_done, total_pages)` after each page.
pub fn split_source<F>(
    source: &SourceDocument,
    mut progress: F,
) -> Result<Vec<Artifact>, PdfSpliceError>
where
    F: FnMut(u32, u32),
{
    let total = source.page_count();
    let base = base_name(&source.name);
    let mut artifacts = Vec::with_capacity(total as usize);

    for page in 1..=total {
        let mut builder = DocumentBuilder::new();
        builder.append_page(&source.document, page)?;
        let bytes = builder.finish()?;
        artifacts.push(Artifact {
            bytes,
            filename: format!("{}_page_{}.pdf", base, page),
        });
        progress(page, total);
    }

    Ok(artifacts)
}

/// Split a batch of raw files into the store.
///
/// Files are handled independently: a file that fails to parse or split is
/// reported and skipped without touching the store or the other files. A
/// file's entries are ingested only once all of its pages split, so the
/// store never holds a partial file. The callback receives overall percents;
/// it is never called when no file parses.
pub fn split_batch<F>(
    store: &mut EntryStore,
    files: Vec<(String, Vec<u8>)>,
    mut progress: F,
) -> Vec<IngestReport>
where
    F: FnMut(u8),
{
    let mut parsed: Vec<Option<SourceDocument>> = Vec::with_capacity(files.len());
    let mut reports: Vec<IngestReport> = Vec::with_capacity(files.len());

    for (name, bytes) in files {
        match SourceDocument::new(name.clone(), bytes) {
            Ok(source) => {
                reports.push(IngestReport {
                    file_name: name,
                    entry_ids: Vec::new(),
                    error: None,
                });
                parsed.push(Some(source));
            }
            Err(e) => {
                reports.push(IngestReport {
                    file_name: name,
                    entry_ids: Vec::new(),
                    error: Some(e.to_string()),
                });
                parsed.push(None);
            }
        }
    }

    let total: u32 = parsed.iter().flatten().map(|s| s.page_count()).sum();
    let mut batch = BatchProgress::new(total);

    for (report, source) in reports.iter_mut().zip(parsed) {
        let source = match source {
            Some(source) => source,
            None => continue,
        };
        let pages = source.page_count();

        match split_source(&source, |page, _| progress(batch.percent(page))) {
            Ok(artifacts) => {
                let index = store.add_source(source);
                for (offset, artifact) in artifacts.into_iter().enumerate() {
                    report
                        .entry_ids
                        .push(store.ingest(index, offset as u32 + 1, artifact));
                }
            }
            Err(e) => {
                report.error = Some(e.to_string());
                // Its pages stay in the denominator, so catch the bar up
                progress(batch.percent(pages));
            }
        }
        batch.file_done(pages);
    }

    reports
}
