//! Entry store
//!
//! Ordered collection of single-page artifacts extracted from source
//! documents. Entries keep insertion order, carry stable numeric ids (never
//! reused within a store's lifetime), and can be reordered with
//! splice-style moves.

use crate::error::PdfSpliceError;
use lopdf::Document;

/// Stable identifier for a store entry. Ids start at 1 and stay within the
/// safe integer range of JS consumers.
pub type EntryId = u32;

/// A parsed source file kept alongside its original bytes
pub struct SourceDocument {
    pub name: String,
    pub bytes: Vec<u8>,
    pub document: Document,
}

impl SourceDocument {
    /// Parse a PDF from raw bytes. Fails on unparseable input and on
    /// documents without any pages.
    pub fn new(name: String, bytes: Vec<u8>) -> Result<Self, PdfSpliceError> {
        let document = Document::load_mem(&bytes)
            .map_err(|e| PdfSpliceError::ParseError(format!("{}: {}", name, e)))?;
        if document.get_pages().is_empty() {
            return Err(PdfSpliceError::ParseError(format!(
                "{}: PDF has no pages",
                name
            )));
        }
        Ok(Self {
            name,
            bytes,
            document,
        })
    }

    pub fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }
}

/// A finished output document with its download filename
#[derive(Debug, Clone)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub filename: String,
}

/// One extracted page: a standalone single-page PDF plus enough metadata to
/// label it
#[derive(Debug, Clone)]
pub struct Entry {
    pub id: EntryId,
    pub source_name: String,
    pub page_number: u32,
    /// Index of the originating document in the store's source list
    pub source: usize,
    pub artifact: Artifact,
}

/// Ordered store of extracted pages and the documents they came from
pub struct EntryStore {
    sources: Vec<SourceDocument>,
    entries: Vec<Entry>,
    next_id: EntryId,
}

impl EntryStore {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            entries: Vec::new(),
            next_id: 1,
        }
    }

    /// Register a parsed source and return its index
    pub fn add_source(&mut self, source: SourceDocument) -> usize {
        self.sources.push(source);
        self.sources.len() - 1
    }

    pub fn source(&self, index: usize) -> Option<&SourceDocument> {
        self.sources.get(index)
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Append an entry for a page of a registered source, assigning the next
    /// id
    pub fn ingest(&mut self, source: usize, page_number: u32, artifact: Artifact) -> EntryId {
        let id = self.next_id;
        self.next_id += 1;
        let source_name = self
            .sources
            .get(source)
            .map(|s| s.name.clone())
            .unwrap_or_default();
        self.entries.push(Entry {
            id,
            source_name,
            page_number,
            source,
            artifact,
        });
        id
    }

    /// Entries in display order
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove an entry by id, keeping the relative order of the rest
    pub fn remove(&mut self, id: EntryId) -> Option<Entry> {
        let index = self.position(id)?;
        Some(self.entries.remove(index))
    }

    /// Reorder by moving one entry to the position another currently holds.
    ///
    /// Both positions are read before anything moves, then the entry is
    /// removed and reinserted at the target's old index. Moving forward this
    /// lands the entry directly before the target's successor; moving
    /// backward it lands directly before the target. Returns false (and
    /// leaves the order untouched) when either id is unknown or both are the
    /// same.
    pub fn move_before(&mut self, moved: EntryId, target: EntryId) -> bool {
        if moved == target {
            return false;
        }
        let from = match self.position(moved) {
            Some(index) => index,
            None => return false,
        };
        let to = match self.position(target) {
            Some(index) => index,
            None => return false,
        };
        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        true
    }

    /// Entries matching the given ids, in store order regardless of the order
    /// ids were supplied in. Unknown ids are ignored.
    pub fn selected_subset(&self, ids: &[EntryId]) -> Vec<&Entry> {
        self.entries
            .iter()
            .filter(|e| ids.contains(&e.id))
            .collect()
    }

    /// Drop all entries and sources, returning the removed entries so
    /// callers can release resources tied to them. Ids keep counting up
    /// afterwards.
    pub fn clear(&mut self) -> Vec<Entry> {
        self.sources.clear();
        std::mem::take(&mut self.entries)
    }

    fn position(&self, id: EntryId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }
}

impl Default for EntryStore {
    fn default() -> Self {
        Self::new()
    }
}
