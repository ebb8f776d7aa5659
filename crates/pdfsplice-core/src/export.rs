//! Export planning
//!
//! Routes a selection of entries to the right delivery shape: a single
//! selected page downloads directly, several pages go out as a ZIP, and a
//! merge request produces one combined document. Plans carry entry ids in
//! store order, so exports always follow the on-screen arrangement rather
//! than selection order.

use crate::archive::build_archive;
use crate::error::PdfSpliceError;
use crate::merge::merge_selected;
use crate::store::{Artifact, EntryId, EntryStore};

/// What the user asked to do with the current selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportAction {
    DownloadSelected,
    MergeSelected,
}

/// A resolved export: which entries, delivered how
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportPlan {
    /// One selected page, downloaded as-is
    DirectDownload(EntryId),
    /// Several selected pages, packed into a ZIP
    BuildArchive(Vec<EntryId>),
    /// Selected pages combined into one document
    BuildMerged(Vec<EntryId>),
}

/// Resolve a selection into a plan.
///
/// Ids are validated against the store and reordered to match it; unknown
/// ids drop out. An empty (or fully stale) selection is rejected.
pub fn plan_export(
    store: &EntryStore,
    action: ExportAction,
    selected: &[EntryId],
) -> Result<ExportPlan, PdfSpliceError> {
    let ids: Vec<EntryId> = store
        .selected_subset(selected)
        .iter()
        .map(|e| e.id)
        .collect();
    if ids.is_empty() {
        return Err(PdfSpliceError::ValidationError("No pages selected".into()));
    }

    Ok(match action {
        ExportAction::DownloadSelected => {
            if ids.len() == 1 {
                ExportPlan::DirectDownload(ids[0])
            } else {
                ExportPlan::BuildArchive(ids)
            }
        }
        ExportAction::MergeSelected => ExportPlan::BuildMerged(ids),
    })
}

/// Produce the plan's artifact. Archive and merge plans report progress;
/// a direct download completes without progress callbacks.
pub fn execute_plan<F>(
    store: &EntryStore,
    plan: &ExportPlan,
    progress: F,
) -> Result<Artifact, PdfSpliceError>
where
    F: FnMut(u8),
{
    match plan {
        ExportPlan::DirectDownload(id) => {
            let entry = store
                .get(*id)
                .ok_or_else(|| PdfSpliceError::ValidationError("No pages selected".into()))?;
            Ok(entry.artifact.clone())
        }
        ExportPlan::BuildArchive(ids) => {
            let entries = store.selected_subset(ids);
            build_archive(&entries, archive_base(store), progress)
        }
        ExportPlan::BuildMerged(ids) => {
            let entries = store.selected_subset(ids);
            merge_selected(&entries, progress)
        }
    }
}

/// Base name for the selection archive
pub fn archive_base(store: &EntryStore) -> &'static str {
    if store.source_count() > 0 {
        "split"
    } else {
        "documents"
    }
}
