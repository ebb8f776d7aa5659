//! Page-copy primitive
//!
//! Builds new PDF documents by copying individual pages out of parsed
//! sources. Every output is assembled from scratch: copied objects get fresh
//! ids in the target, and the page tree and catalog are rebuilt, so an
//! artifact never drags along the rest of its source document.

use crate::error::PdfSpliceError;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;

/// Page attributes that may live on an ancestor node instead of the page
/// itself. They must be materialized before the page loses its Parent link.
const INHERITED_PAGE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Assembles a fresh document from pages copied out of source documents.
///
/// The algorithm per page:
/// 1. Resolve the page object and materialize inherited attributes
/// 2. Walk the page's reference closure (skipping Parent links, which would
///    pull in the whole source page tree)
/// 3. Allocate target ids for every reachable object and deep-copy with
///    remapped references
/// 4. Re-parent the copied page under the target's page tree
pub struct DocumentBuilder {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            page_ids: Vec::new(),
        }
    }

    /// Number of pages appended so far
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Copy one page (1-indexed) from a parsed source into this document
    pub fn append_page(
        &mut self,
        source: &Document,
        page_number: u32,
    ) -> Result<(), PdfSpliceError> {
        let pages = source.get_pages();
        let page_id = *pages.get(&page_number).ok_or_else(|| {
            PdfSpliceError::OperationError(format!(
                "Page {} does not exist (document has {} pages)",
                page_number,
                pages.len()
            ))
        })?;

        let page_dict = materialized_page_dict(source, page_id)?;

        // Map the page id first so back-references to it (e.g. annotation /P
        // entries) resolve to the copy instead of spawning a duplicate.
        let copied_page_id = self.doc.new_object_id();
        let mut id_map: BTreeMap<ObjectId, ObjectId> = BTreeMap::new();
        id_map.insert(page_id, copied_page_id);

        let mut queue: Vec<ObjectId> = Vec::new();
        collect_dict_refs(&page_dict, &mut queue);
        while let Some(id) = queue.pop() {
            if id_map.contains_key(&id) {
                continue;
            }
            let obj = match source.get_object(id) {
                Ok(obj) => obj,
                // Dangling in the source; remaps to Null below
                Err(_) => continue,
            };
            id_map.insert(id, self.doc.new_object_id());
            collect_refs(obj, &mut queue);
        }

        for (&old_id, &new_id) in &id_map {
            if old_id == page_id {
                continue;
            }
            if let Ok(obj) = source.get_object(old_id) {
                self.doc.objects.insert(new_id, remap_object(obj, &id_map));
            }
        }

        let mut copied = remap_dictionary(&page_dict, &id_map);
        copied.set("Parent", Object::Reference(self.pages_id));
        self.doc
            .objects
            .insert(copied_page_id, Object::Dictionary(copied));
        self.page_ids.push(copied_page_id);

        Ok(())
    }

    /// Finalize the page tree and catalog, then serialize
    pub fn finish(mut self) -> Result<Vec<u8>, PdfSpliceError> {
        if self.page_ids.is_empty() {
            return Err(PdfSpliceError::OperationError(
                "Document has no pages".into(),
            ));
        }

        let kids: Vec<Object> = self
            .page_ids
            .iter()
            .map(|&id| Object::Reference(id))
            .collect();
        let pages = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(self.page_ids.len() as i64)),
            ("Kids", Object::Array(kids)),
        ]);
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_id)),
        ]);
        let catalog_id = self.doc.add_object(catalog);
        self.doc.trailer.set("Root", Object::Reference(catalog_id));

        self.doc.prune_objects();
        self.doc.compress();

        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|e| PdfSpliceError::OperationError(format!("Save failed: {}", e)))?;

        Ok(buffer)
    }
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Clone the page dictionary with inheritable attributes resolved from its
/// ancestor chain
fn materialized_page_dict(
    source: &Document,
    page_id: ObjectId,
) -> Result<Dictionary, PdfSpliceError> {
    let page_dict = source
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| PdfSpliceError::OperationError(format!("Invalid page object: {}", e)))?;

    let mut dict = page_dict.clone();
    for key in INHERITED_PAGE_KEYS {
        if !dict.has(key) {
            if let Some(value) = inherited_attribute(source, page_dict, key) {
                dict.set(key, value);
            }
        }
    }
    Ok(dict)
}

/// Walk up the Parent chain looking for an inheritable attribute
fn inherited_attribute(source: &Document, page_dict: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut current = page_dict.get(b"Parent").ok()?.as_reference().ok()?;
    // Depth guard against malformed Parent cycles
    for _ in 0..64 {
        let node = source.get_object(current).ok()?.as_dict().ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        current = node.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

/// Collect every object id referenced by an object
fn collect_refs(obj: &Object, out: &mut Vec<ObjectId>) {
    match obj {
        Object::Reference(id) => out.push(*id),
        Object::Array(items) => {
            for item in items {
                collect_refs(item, out);
            }
        }
        Object::Dictionary(dict) => collect_dict_refs(dict, out),
        Object::Stream(stream) => collect_dict_refs(&stream.dict, out),
        _ => {}
    }
}

fn collect_dict_refs(dict: &Dictionary, out: &mut Vec<ObjectId>) {
    for (key, value) in dict.iter() {
        if key.as_slice() == b"Parent" {
            continue;
        }
        collect_refs(value, out);
    }
}

/// Deep-copy an object, rewriting references through the id map.
/// References with no mapping become Null, matching how readers treat a
/// dangling indirect reference.
fn remap_object(obj: &Object, id_map: &BTreeMap<ObjectId, ObjectId>) -> Object {
    match obj {
        Object::Reference(id) => match id_map.get(id) {
            Some(new_id) => Object::Reference(*new_id),
            None => Object::Null,
        },
        Object::Array(items) => {
            Object::Array(items.iter().map(|o| remap_object(o, id_map)).collect())
        }
        Object::Dictionary(dict) => Object::Dictionary(remap_dictionary(dict, id_map)),
        Object::Stream(stream) => {
            let mut copied = stream.clone();
            copied.dict = remap_dictionary(&stream.dict, id_map);
            Object::Stream(copied)
        }
        other => other.clone(),
    }
}

fn remap_dictionary(dict: &Dictionary, id_map: &BTreeMap<ObjectId, ObjectId>) -> Dictionary {
    let mut out = Dictionary::new();
    for (key, value) in dict.iter() {
        if key.as_slice() == b"Parent" {
            continue;
        }
        out.set(key.clone(), remap_object(value, id_map));
    }
    out
}
