//! Stateful split & merge session
//!
//! Holds all document state (staged uploads, extracted page entries, the
//! merge file list) in Rust, so the page script only wires DOM events to
//! session calls. Long operations disable their button, narrate progress
//! through its label, and surface failures as alerts.

use crate::download::{
    create_blob_url, media_type_for, revoke_blob_url, save_artifact, trigger_download,
};
use crate::render::ThumbnailRenderer;
use crate::validation::{is_pdf_file, quick_validate, validate_pdf, PdfInfo};
use pdfsplice_core::{
    execute_plan, plan_export, split_batch, EntryId, EntryStore, ExportAction, ExportPlan,
    IngestReport, PdfSpliceError, SourceDocument,
};
use std::collections::HashMap;
use wasm_bindgen::prelude::*;
use web_sys::{HtmlButtonElement, HtmlCanvasElement};

/// Which workflow a session drives
#[wasm_bindgen]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Split mode: explode uploads into single pages, curate, re-export
    Split,
    /// Merge mode: combine whole files in a chosen order
    Merge,
}

/// Stateful session backing one page of the app
#[wasm_bindgen]
pub struct PdfSpliceSession {
    mode: SessionMode,
    store: EntryStore,
    staged: Vec<(String, Vec<u8>)>,
    merge_sources: Vec<SourceDocument>,
    entry_urls: HashMap<EntryId, String>,
    progress_callback: Option<js_sys::Function>,
    download_button: Option<HtmlButtonElement>,
    merge_button: Option<HtmlButtonElement>,
    busy: bool,
}

#[wasm_bindgen]
impl PdfSpliceSession {
    /// Fresh session for the given workflow
    #[wasm_bindgen(constructor)]
    pub fn new(mode: SessionMode) -> Self {
        Self {
            mode,
            store: EntryStore::new(),
            staged: Vec::new(),
            merge_sources: Vec::new(),
            entry_urls: HashMap::new(),
            progress_callback: None,
            download_button: None,
            merge_button: None,
            busy: false,
        }
    }

    #[wasm_bindgen(getter)]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Install the percent callback long operations report through
    /// Callback signature: (percent: number) => void
    #[wasm_bindgen(js_name = setProgressCallback)]
    pub fn set_progress_callback(&mut self, callback: js_sys::Function) {
        self.progress_callback = Some(callback);
    }

    /// Bind the download-selected button so the session can manage its
    /// label and disabled state
    #[wasm_bindgen(js_name = setDownloadButton)]
    pub fn set_download_button(&mut self, button: HtmlButtonElement) {
        self.download_button = Some(button);
    }

    /// Bind the merge button (merge-selected in split mode, merge-all in
    /// merge mode)
    #[wasm_bindgen(js_name = setMergeButton)]
    pub fn set_merge_button(&mut self, button: HtmlButtonElement) {
        self.merge_button = Some(button);
    }

    #[wasm_bindgen(js_name = isBusy)]
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Whether page tiles can be rendered (pdf.js present)
    #[wasm_bindgen(js_name = thumbnailsAvailable)]
    pub fn thumbnails_available() -> bool {
        ThumbnailRenderer::is_available()
    }

    // ------------------------------------------------------------
    // Split mode: staging and ingest
    // ------------------------------------------------------------

    /// Internal method to stage a file (testable without JsValue)
    fn stage_file_internal(
        &mut self,
        name: &str,
        media_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), String> {
        if self.mode != SessionMode::Split {
            return Err("Staging files is only available in split mode".to_string());
        }
        if !is_pdf_file(name, media_type) {
            return Err("Please choose PDF files!".to_string());
        }
        quick_validate(&bytes).map_err(|e| e.to_string())?;
        self.staged.push((name.to_string(), bytes));
        Ok(())
    }

    /// Stage a picked file for the next ingest batch
    #[wasm_bindgen(js_name = stageFile)]
    pub fn stage_file(
        &mut self,
        name: &str,
        media_type: &str,
        bytes: &[u8],
    ) -> Result<(), JsValue> {
        self.stage_file_internal(name, media_type, bytes.to_vec())
            .map_err(|e| JsValue::from_str(&e))
    }

    /// Number of files waiting in the current batch
    #[wasm_bindgen(js_name = stagedCount)]
    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }

    /// Split everything staged so far into page entries.
    ///
    /// Files are independent: a broken file is reported and skipped while
    /// the rest ingest. Returns one report per staged file.
    #[wasm_bindgen(js_name = commitBatch)]
    pub async fn commit_batch(&mut self) -> Result<JsValue, JsValue> {
        if self.mode != SessionMode::Split {
            return Err(JsValue::from_str(
                "Staging files is only available in split mode",
            ));
        }

        // Let the browser paint before the synchronous split runs
        yield_now().await;

        let reports = self.commit_batch_internal();
        let pages: usize = reports.iter().map(|r| r.entry_ids.len()).sum();
        log(&format!(
            "Batch split: {} pages from {} files",
            pages,
            reports.len()
        ));
        serde_wasm_bindgen::to_value(&reports)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    fn commit_batch_internal(&mut self) -> Vec<IngestReport> {
        let files = std::mem::take(&mut self.staged);
        let callback = self.progress_callback.clone();
        split_batch(&mut self.store, files, |percent| {
            if let Some(ref cb) = callback {
                let _ = cb.call1(&JsValue::null(), &JsValue::from(percent));
            }
        })
    }

    // ------------------------------------------------------------
    // Split mode: the entry list
    // ------------------------------------------------------------

    /// Current entries in display order
    pub fn entries(&self) -> Result<JsValue, JsValue> {
        let views: Vec<EntryView> = self
            .store
            .entries()
            .iter()
            .map(|e| EntryView {
                id: e.id,
                source_name: e.source_name.clone(),
                page_number: e.page_number,
                source: e.source,
            })
            .collect();
        serde_wasm_bindgen::to_value(&views)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    #[wasm_bindgen(js_name = entryCount)]
    pub fn entry_count(&self) -> usize {
        self.store.len()
    }

    fn entry_url_internal(&mut self, id: EntryId) -> Result<String, PdfSpliceError> {
        if let Some(url) = self.entry_urls.get(&id) {
            return Ok(url.clone());
        }
        let entry = self.store.get(id).ok_or_else(|| {
            PdfSpliceError::ValidationError(format!("Unknown entry id {}", id))
        })?;
        let url = create_blob_url(
            &entry.artifact.bytes,
            media_type_for(&entry.artifact.filename),
        )?;
        self.entry_urls.insert(id, url.clone());
        Ok(url)
    }

    /// Object URL for an entry's single-page PDF, created lazily and owned
    /// by the session until the entry is removed
    #[wasm_bindgen(js_name = entryUrl)]
    pub fn entry_url(&mut self, id: u32) -> Result<String, JsValue> {
        self.entry_url_internal(id)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Remove an entry and release its object URL
    #[wasm_bindgen(js_name = removeEntry)]
    pub fn remove_entry(&mut self, id: u32) -> bool {
        match self.store.remove(id) {
            Some(_) => {
                if let Some(url) = self.entry_urls.remove(&id) {
                    revoke_blob_url(&url);
                }
                true
            }
            None => false,
        }
    }

    /// Move one entry to the position another currently holds (drag and
    /// drop semantics)
    #[wasm_bindgen(js_name = moveEntryBefore)]
    pub fn move_entry_before(&mut self, moved: u32, target: u32) -> bool {
        self.store.move_before(moved, target)
    }

    /// Render an entry's page onto a canvas tile
    #[wasm_bindgen(js_name = renderThumbnail)]
    pub async fn render_thumbnail(
        &self,
        id: u32,
        canvas: HtmlCanvasElement,
        target_width: f64,
    ) -> Result<(), JsValue> {
        let entry = self
            .store
            .get(id)
            .ok_or_else(|| JsValue::from_str(&format!("Unknown entry id {}", id)))?;
        ThumbnailRenderer::render_page(&entry.artifact.bytes, &canvas, target_width)
            .await
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    // ------------------------------------------------------------
    // Split mode: exports
    // ------------------------------------------------------------

    /// Refresh the download button for the current selection
    #[wasm_bindgen(js_name = updateDownloadLabel)]
    pub fn update_download_label(&self, selected: Vec<u32>) {
        self.refresh_download_label(&selected);
    }

    /// Refresh the merge button for the current selection
    #[wasm_bindgen(js_name = updateMergeLabel)]
    pub fn update_merge_label(&self, selected: Vec<u32>) {
        self.refresh_merge_label(&selected);
    }

    fn refresh_download_label(&self, selected: &[u32]) {
        if self.busy {
            return;
        }
        let count = self.store.selected_subset(selected).len();
        set_label(&self.download_button, &download_button_label(count));
    }

    fn refresh_merge_label(&self, selected: &[u32]) {
        if self.busy {
            return;
        }
        let count = self.store.selected_subset(selected).len();
        set_label(&self.merge_button, &merge_button_label(count));
    }

    /// Download the selected pages: one page directly, several as a ZIP
    #[wasm_bindgen(js_name = downloadSelected)]
    pub async fn download_selected(&mut self, selected: Vec<u32>) -> Result<(), JsValue> {
        if self.busy {
            return Ok(());
        }

        let plan = match plan_export(&self.store, ExportAction::DownloadSelected, &selected) {
            Ok(plan) => plan,
            Err(_) => {
                self.surface_error(
                    "Error while preparing download",
                    "Please select at least 1 page(s)!",
                );
                return Ok(());
            }
        };

        if let ExportPlan::DirectDownload(id) = plan {
            if let Err(e) = self.download_entry_internal(id) {
                self.surface_error("Error while preparing download", &e.to_string());
            }
            return Ok(());
        }

        self.busy = true;
        set_enabled(&self.download_button, false);
        set_label(&self.download_button, "Preparing ZIP for selected pages");
        yield_now().await;

        let outcome = {
            let callback = self.progress_callback.clone();
            let button = self.download_button.clone();
            execute_plan(&self.store, &plan, |percent| {
                set_label(&button, &format!("Preparing ZIP ({}%)", percent));
                if let Some(ref cb) = callback {
                    let _ = cb.call1(&JsValue::null(), &JsValue::from(percent));
                }
            })
        };
        match outcome.and_then(|artifact| {
            save_artifact(&artifact)?;
            Ok(artifact.filename)
        }) {
            Ok(filename) => log(&format!("Prepared {}", filename)),
            Err(e) => self.surface_error("Error while preparing download", &e.to_string()),
        }

        self.busy = false;
        set_enabled(&self.download_button, true);
        self.refresh_download_label(&selected);
        Ok(())
    }

    /// Merge the selected pages into one document, in display order
    #[wasm_bindgen(js_name = mergeSelected)]
    pub async fn merge_selected(&mut self, selected: Vec<u32>) -> Result<(), JsValue> {
        if self.busy {
            return Ok(());
        }

        let plan = match plan_export(&self.store, ExportAction::MergeSelected, &selected) {
            Ok(plan) => plan,
            Err(_) => {
                self.surface_error(
                    "Error while creating PDF",
                    "Please select at least 1 page(s)!",
                );
                return Ok(());
            }
        };

        self.busy = true;
        set_enabled(&self.merge_button, false);
        set_label(&self.merge_button, "Preparing merge");
        yield_now().await;

        let outcome = {
            let callback = self.progress_callback.clone();
            let button = self.merge_button.clone();
            execute_plan(&self.store, &plan, |percent| {
                set_label(&button, &format!("Preparing merge ({}%)", percent));
                if let Some(ref cb) = callback {
                    let _ = cb.call1(&JsValue::null(), &JsValue::from(percent));
                }
            })
        };
        match outcome.and_then(|artifact| {
            save_artifact(&artifact)?;
            Ok(artifact.filename)
        }) {
            Ok(filename) => log(&format!("Prepared {}", filename)),
            Err(e) => self.surface_error("Error while creating PDF", &e.to_string()),
        }

        self.busy = false;
        set_enabled(&self.merge_button, true);
        self.refresh_merge_label(&selected);
        Ok(())
    }

    // ------------------------------------------------------------
    // Merge mode: the file list
    // ------------------------------------------------------------

    /// Internal method to add a merge file (testable without JsValue)
    fn add_merge_file_internal(
        &mut self,
        name: &str,
        media_type: &str,
        bytes: Vec<u8>,
    ) -> Result<PdfInfo, String> {
        if self.mode != SessionMode::Merge {
            return Err("The file list is only available in merge mode".to_string());
        }
        if !is_pdf_file(name, media_type) {
            return Err("Please choose PDF files!".to_string());
        }

        let info = validate_pdf(&bytes).map_err(|e| e.to_string())?;
        let source = SourceDocument::new(name.to_string(), bytes).map_err(|e| e.to_string())?;
        self.merge_sources.push(source);

        Ok(info)
    }

    /// Add a file to the merge list
    /// Returns file info on success
    #[wasm_bindgen(js_name = addMergeFile)]
    pub fn add_merge_file(
        &mut self,
        name: &str,
        media_type: &str,
        bytes: &[u8],
    ) -> Result<JsValue, JsValue> {
        let info = self
            .add_merge_file_internal(name, media_type, bytes.to_vec())
            .map_err(|e| JsValue::from_str(&e))?;
        serde_wasm_bindgen::to_value(&info)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    fn remove_merge_file_internal(&mut self, index: usize) -> Result<(), String> {
        if index >= self.merge_sources.len() {
            return Err("File index out of bounds".to_string());
        }
        self.merge_sources.remove(index);
        Ok(())
    }

    /// Remove a file from the merge list by index
    #[wasm_bindgen(js_name = removeMergeFile)]
    pub fn remove_merge_file(&mut self, index: usize) -> Result<(), JsValue> {
        self.remove_merge_file_internal(index)
            .map_err(|e| JsValue::from_str(&e))
    }

    /// Move a merge file to the position another currently holds
    #[wasm_bindgen(js_name = moveMergeFileBefore)]
    pub fn move_merge_file_before(&mut self, from: usize, to: usize) -> bool {
        if from == to || from >= self.merge_sources.len() || to >= self.merge_sources.len() {
            return false;
        }
        let source = self.merge_sources.remove(from);
        self.merge_sources.insert(to, source);
        true
    }

    /// Names and sizes for the merge list display
    #[wasm_bindgen(js_name = mergeFileInfos)]
    pub fn merge_file_infos(&self) -> Result<JsValue, JsValue> {
        let infos: Vec<MergeFileView> = self
            .merge_sources
            .iter()
            .map(|s| MergeFileView {
                name: s.name.clone(),
                page_count: s.page_count(),
                size_bytes: s.bytes.len(),
            })
            .collect();
        serde_wasm_bindgen::to_value(&infos)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    #[wasm_bindgen(js_name = mergeFileCount)]
    pub fn merge_file_count(&self) -> usize {
        self.merge_sources.len()
    }

    /// Merge every listed file, in list order, into one download
    #[wasm_bindgen(js_name = mergeAll)]
    pub async fn merge_all(&mut self) -> Result<(), JsValue> {
        if self.busy {
            return Ok(());
        }
        if self.mode != SessionMode::Merge {
            return Err(JsValue::from_str(
                "Merging files is only available in merge mode",
            ));
        }
        if self.merge_sources.is_empty() {
            self.alert("Please select PDF files first!");
            return Ok(());
        }

        // The merge button keeps its page-provided label outside of runs
        let idle_label = self.merge_button.as_ref().and_then(|b| b.text_content());

        self.busy = true;
        set_enabled(&self.merge_button, false);
        set_label(&self.merge_button, "Preparing merge");
        yield_now().await;

        let outcome = {
            let callback = self.progress_callback.clone();
            let button = self.merge_button.clone();
            pdfsplice_core::merge_files(&self.merge_sources, |percent| {
                set_label(&button, &format!("Preparing merge ({}%)", percent));
                if let Some(ref cb) = callback {
                    let _ = cb.call1(&JsValue::null(), &JsValue::from(percent));
                }
            })
        };
        match outcome.and_then(|artifact| {
            save_artifact(&artifact)?;
            Ok(artifact.filename)
        }) {
            Ok(filename) => log(&format!("Prepared {}", filename)),
            Err(e) => self.surface_error("Error while merging PDFs", &e.to_string()),
        }

        self.busy = false;
        set_enabled(&self.merge_button, true);
        if let Some(label) = idle_label {
            set_label(&self.merge_button, &label);
        }
        Ok(())
    }

    // ------------------------------------------------------------
    // Shared
    // ------------------------------------------------------------

    /// Drop all session state and release every object URL
    pub fn reset(&mut self) {
        for (_, url) in self.entry_urls.drain() {
            revoke_blob_url(&url);
        }
        self.store.clear();
        self.staged.clear();
        self.merge_sources.clear();
        self.busy = false;
    }

    fn download_entry_internal(&mut self, id: EntryId) -> Result<(), PdfSpliceError> {
        let filename = self
            .store
            .get(id)
            .map(|e| e.artifact.filename.clone())
            .ok_or_else(|| {
                PdfSpliceError::ValidationError(format!("Unknown entry id {}", id))
            })?;
        // Reuse the tile URL; it lives until the entry is removed
        let url = self.entry_url_internal(id)?;
        trigger_download(&url, &filename)
    }

    /// Plain alert for guard conditions (empty merge list)
    fn alert(&self, message: &str) {
        #[cfg(target_arch = "wasm32")]
        {
            if let Some(window) = web_sys::window() {
                let _ = window.alert_with_message(message);
            }
        }

        #[cfg(not(target_arch = "wasm32"))]
        eprintln!("{}", message);
    }

    /// Log and alert an operation failure with its context
    fn surface_error(&self, context: &str, message: &str) {
        let text = format!("{}: {}", context, message);

        #[cfg(target_arch = "wasm32")]
        {
            web_sys::console::error_1(&JsValue::from_str(&text));
            if let Some(window) = web_sys::window() {
                let _ = window.alert_with_message(&text);
            }
        }

        #[cfg(not(target_arch = "wasm32"))]
        eprintln!("{}", text);
    }
}

/// Idle label for the download button
fn download_button_label(count: usize) -> String {
    match count {
        0 => "Download selected pages".to_string(),
        1 => "Download selected page".to_string(),
        n => format!("Download selected pages (ZIP: {})", n),
    }
}

/// Idle label for the merge-selected button
fn merge_button_label(count: usize) -> String {
    if count > 0 {
        format!("Merge selected ({} pages)", count)
    } else {
        "Merge selected".to_string()
    }
}

/// One-line completion note for the developer console
fn log(message: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::log_1(&JsValue::from_str(message));

    #[cfg(not(target_arch = "wasm32"))]
    let _ = message;
}

fn set_label(button: &Option<HtmlButtonElement>, text: &str) {
    if let Some(button) = button {
        button.set_text_content(Some(text));
    }
}

fn set_enabled(button: &Option<HtmlButtonElement>, enabled: bool) {
    if let Some(button) = button {
        button.set_disabled(!enabled);
    }
}

/// Hand control back to the event loop so the browser can paint
#[cfg(target_arch = "wasm32")]
async fn yield_now() {
    let promise = js_sys::Promise::resolve(&JsValue::NULL);
    let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
}

#[cfg(not(target_arch = "wasm32"))]
async fn yield_now() {}

/// Entry data for JS serialization
#[derive(serde::Serialize)]
struct EntryView {
    id: u32,
    source_name: String,
    page_number: u32,
    source: usize,
}

/// Merge list row for JS serialization
#[derive(serde::Serialize)]
struct MergeFileView {
    name: String,
    page_count: u32,
    size_bytes: usize,
}
