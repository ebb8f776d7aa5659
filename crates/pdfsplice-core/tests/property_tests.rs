//! Property-based tests for pdfsplice-core
//!
//! Exercises the split, reorder, merge, and archive pipeline end to end
//! using proptest.

use proptest::prelude::*;

use lopdf::{content::Content, content::Operation, dictionary, Document, Object, Stream};
use pdfsplice_core::{
    base_name, build_archive, merge_files, merge_selected, page_count, plan_export,
    split_batch, split_source, EntryId, EntryStore, ExportAction, ExportPlan,
    SourceDocument,
};
use std::io::Cursor;

// ============================================================
// PDF builders
// ============================================================

/// A simple PDF where page `i` (1-based) has MediaBox width `600 + i`, so
/// page identity survives copying
fn create_test_pdf(num_pages: u32) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let tree_id = doc.new_object_id();

    let kids: Vec<Object> = (1..=num_pages)
        .map(|n| {
            let marker = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![100.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(format!("Page {}", n))]),
                    Operation::new("ET", vec![]),
                ],
            };
            let contents = doc.add_object(Stream::new(dictionary! {}, marker.encode().unwrap()));
            let page = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(tree_id),
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(600 + n as i64),
                    Object::Integer(792),
                ],
                "Contents" => Object::Reference(contents),
            });
            Object::Reference(page)
        })
        .collect();

    doc.objects.insert(
        tree_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => Object::Integer(num_pages as i64),
            "Kids" => kids,
        }),
    );
    let root_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(tree_id),
    });
    doc.trailer.set("Root", Object::Reference(root_id));

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

fn split_store(num_pages: u32) -> EntryStore {
    let mut store = EntryStore::new();
    let files = vec![("report.pdf".to_string(), create_test_pdf(num_pages))];
    let reports = split_batch(&mut store, files, |_| {});
    assert!(reports[0].error.is_none());
    store
}

fn page_widths(bytes: &[u8]) -> Vec<i64> {
    let doc = Document::load_mem(bytes).unwrap();
    let pages = doc.get_pages();
    (1..=pages.len() as u32)
        .map(|n| {
            let dict = doc.get_object(pages[&n]).unwrap().as_dict().unwrap();
            let media_box = dict.get(b"MediaBox").unwrap().as_array().unwrap();
            media_box[2].as_i64().unwrap()
        })
        .collect()
}

fn entry_ids(store: &EntryStore) -> Vec<EntryId> {
    store.entries().iter().map(|e| e.id).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // ============================================================
    // Split
    // ============================================================

    #[test]
    fn split_yields_one_valid_artifact_per_page(num_pages in 1u32..=6) {
        let source =
            SourceDocument::new("report.pdf".to_string(), create_test_pdf(num_pages))
                .unwrap();
        let artifacts = split_source(&source, |_, _| {}).unwrap();

        prop_assert_eq!(artifacts.len(), num_pages as usize);
        for (i, artifact) in artifacts.iter().enumerate() {
            prop_assert_eq!(&artifact.filename, &format!("report_page_{}.pdf", i + 1));
            // Each artifact is a standalone PDF carrying exactly its page
            prop_assert_eq!(page_widths(&artifact.bytes), vec![600 + i as i64 + 1]);
        }
    }

    #[test]
    fn parsed_page_count_matches_builder(num_pages in 1u32..=6) {
        let bytes = create_test_pdf(num_pages);
        prop_assert_eq!(page_count(&bytes).unwrap(), num_pages);
    }

    #[test]
    fn batch_progress_is_monotone_and_finishes(
        counts in proptest::collection::vec(1u32..=4, 1..=3)
    ) {
        let files: Vec<(String, Vec<u8>)> = counts
            .iter()
            .enumerate()
            .map(|(i, &n)| (format!("file{}.pdf", i), create_test_pdf(n)))
            .collect();

        let mut store = EntryStore::new();
        let mut percents: Vec<u8> = Vec::new();
        split_batch(&mut store, files, |p| percents.push(p));

        let total: u32 = counts.iter().sum();
        prop_assert_eq!(percents.len(), total as usize);
        prop_assert!(percents.windows(2).all(|w| w[0] <= w[1]));
        prop_assert_eq!(percents.last().copied(), Some(100));
        prop_assert_eq!(store.len(), total as usize);
    }

    #[test]
    fn batch_survives_a_broken_file_in_the_middle(
        counts in proptest::collection::vec(1u32..=3, 1..=2),
        garbage in proptest::collection::vec(any::<u8>(), 0..64)
    ) {
        let mut files: Vec<(String, Vec<u8>)> = counts
            .iter()
            .enumerate()
            .map(|(i, &n)| (format!("file{}.pdf", i), create_test_pdf(n)))
            .collect();
        files.insert(files.len() / 2, ("broken.pdf".to_string(), garbage));

        let mut store = EntryStore::new();
        let mut percents: Vec<u8> = Vec::new();
        let reports = split_batch(&mut store, files, |p| percents.push(p));

        let total: u32 = counts.iter().sum();
        prop_assert_eq!(store.len(), total as usize);
        prop_assert_eq!(reports.iter().filter(|r| r.error.is_some()).count(), 1);
        prop_assert!(percents.windows(2).all(|w| w[0] <= w[1]));
        prop_assert_eq!(percents.last().copied(), Some(100));
    }

    #[test]
    fn garbage_bytes_never_reach_the_store(
        garbage in proptest::collection::vec(any::<u8>(), 0..64)
    ) {
        let mut store = EntryStore::new();
        let mut calls = 0u32;
        let reports = split_batch(
            &mut store,
            vec![("junk.pdf".to_string(), garbage)],
            |_| calls += 1,
        );

        prop_assert!(reports[0].error.is_some());
        prop_assert!(store.is_empty());
        prop_assert_eq!(store.source_count(), 0);
        prop_assert_eq!(calls, 0);
    }

    // ============================================================
    // Store ordering
    // ============================================================

    #[test]
    fn entry_ids_are_unique_and_increasing(counts in proptest::collection::vec(1u32..=3, 1..=3)) {
        let files: Vec<(String, Vec<u8>)> = counts
            .iter()
            .enumerate()
            .map(|(i, &n)| (format!("file{}.pdf", i), create_test_pdf(n)))
            .collect();
        let mut store = EntryStore::new();
        split_batch(&mut store, files, |_| {});

        let ids = entry_ids(&store);
        prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn removing_everything_empties_the_store(num_pages in 1u32..=6) {
        let mut store = split_store(num_pages);
        for id in entry_ids(&store) {
            prop_assert!(store.remove(id).is_some());
        }
        prop_assert!(store.is_empty());
    }

    #[test]
    fn move_before_matches_the_splice_model(
        num_pages in 2u32..=6,
        a in 0u32..6,
        b in 0u32..6,
    ) {
        let a = (a % num_pages) as usize;
        let b = (b % num_pages) as usize;

        let mut store = split_store(num_pages);
        let mut model = entry_ids(&store);
        let moved = model[a];
        let target = model[b];

        let changed = store.move_before(moved, target);
        if a == b {
            prop_assert!(!changed);
        } else {
            prop_assert!(changed);
            let id = model.remove(a);
            model.insert(b, id);
        }
        prop_assert_eq!(entry_ids(&store), model);
    }

    #[test]
    fn selection_resolves_in_store_order(mask in proptest::collection::vec(any::<bool>(), 1..=6)) {
        prop_assume!(mask.iter().any(|&m| m));

        let store = split_store(mask.len() as u32);
        let selected: Vec<EntryId> = entry_ids(&store)
            .into_iter()
            .zip(&mask)
            .filter(|(_, &m)| m)
            .map(|(id, _)| id)
            .rev() // feed ids backwards; order must not matter
            .collect();

        let subset = store.selected_subset(&selected);
        let ids: Vec<EntryId> = subset.iter().map(|e| e.id).collect();
        let mut expected = selected.clone();
        expected.reverse();
        prop_assert_eq!(ids, expected);
    }

    // ============================================================
    // Merge
    // ============================================================

    #[test]
    fn merged_documents_carry_all_pages_in_order(
        counts in proptest::collection::vec(1u32..=3, 1..=3)
    ) {
        let sources: Vec<SourceDocument> = counts
            .iter()
            .enumerate()
            .map(|(i, &n)| {
                SourceDocument::new(format!("file{}.pdf", i), create_test_pdf(n)).unwrap()
            })
            .collect();

        let merged = merge_files(&sources, |_| {}).unwrap();
        prop_assert_eq!(merged.filename, "file0_merged.pdf");

        let expected: Vec<i64> = counts
            .iter()
            .flat_map(|&n| (1..=n as i64).map(|i| 600 + i))
            .collect();
        prop_assert_eq!(page_widths(&merged.bytes), expected);
    }

    #[test]
    fn selected_merge_follows_the_selection(mask in proptest::collection::vec(any::<bool>(), 1..=6)) {
        prop_assume!(mask.iter().any(|&m| m));

        let store = split_store(mask.len() as u32);
        let selected: Vec<EntryId> = entry_ids(&store)
            .into_iter()
            .zip(&mask)
            .filter(|(_, &m)| m)
            .map(|(id, _)| id)
            .collect();

        let subset = store.selected_subset(&selected);
        let expected: Vec<i64> = subset
            .iter()
            .map(|e| 600 + e.page_number as i64)
            .collect();

        let merged = merge_selected(&subset, |_| {}).unwrap();
        prop_assert_eq!(merged.filename, "selected_merged.pdf");
        prop_assert_eq!(page_widths(&merged.bytes), expected);
    }

    // ============================================================
    // Archive
    // ============================================================

    #[test]
    fn archive_holds_every_selected_page(mask in proptest::collection::vec(any::<bool>(), 1..=6)) {
        prop_assume!(mask.iter().any(|&m| m));

        let store = split_store(mask.len() as u32);
        let selected: Vec<EntryId> = entry_ids(&store)
            .into_iter()
            .zip(&mask)
            .filter(|(_, &m)| m)
            .map(|(id, _)| id)
            .collect();
        let subset = store.selected_subset(&selected);

        let mut percents: Vec<u8> = Vec::new();
        let archive = build_archive(&subset, "split", |p| percents.push(p)).unwrap();

        prop_assert_eq!(archive.filename, "split_pages.zip");
        prop_assert!(percents.windows(2).all(|w| w[0] <= w[1]));
        prop_assert_eq!(percents.last().copied(), Some(100));

        let mut zip = zip::ZipArchive::new(Cursor::new(archive.bytes)).unwrap();
        prop_assert_eq!(zip.len(), subset.len());
        for (i, entry) in subset.iter().enumerate() {
            let file = zip.by_index(i).unwrap();
            prop_assert_eq!(file.name(), &entry.artifact.filename);
        }
    }

    // ============================================================
    // Export routing
    // ============================================================

    #[test]
    fn download_routing_depends_on_selection_size(mask in proptest::collection::vec(any::<bool>(), 1..=6)) {
        prop_assume!(mask.iter().any(|&m| m));

        let store = split_store(mask.len() as u32);
        let selected: Vec<EntryId> = entry_ids(&store)
            .into_iter()
            .zip(&mask)
            .filter(|(_, &m)| m)
            .map(|(id, _)| id)
            .collect();

        let plan = plan_export(&store, ExportAction::DownloadSelected, &selected).unwrap();
        match plan {
            ExportPlan::DirectDownload(id) => {
                prop_assert_eq!(selected.len(), 1);
                prop_assert_eq!(id, selected[0]);
            }
            ExportPlan::BuildArchive(ids) => {
                prop_assert!(selected.len() > 1);
                prop_assert_eq!(ids, selected);
            }
            ExportPlan::BuildMerged(_) => prop_assert!(false, "download never merges"),
        }
    }

    // ============================================================
    // Naming
    // ============================================================

    #[test]
    fn base_name_strips_exactly_one_pdf_suffix(stem in "[a-zA-Z0-9_ .-]{1,24}") {
        let name = format!("{}.pdf", stem);
        prop_assert_eq!(base_name(&name), stem.as_str());
    }
}

// ============================================================
// Scenario tests (non-property)
// ============================================================

#[cfg(test)]
mod unit_tests {
    use super::*;
    use pdfsplice_core::execute_plan;

    /// Full session flow: split a three page report, drop a page, reorder,
    /// then export the remainder both ways.
    #[test]
    fn test_split_curate_and_export_flow() {
        let mut store = EntryStore::new();
        let reports = split_batch(
            &mut store,
            vec![("report.pdf".to_string(), create_test_pdf(3))],
            |_| {},
        );
        assert_eq!(reports[0].entry_ids, vec![1, 2, 3]);

        // Drop page two, move page three to the front
        assert!(store.remove(2).is_some());
        assert!(store.move_before(3, 1));
        assert_eq!(entry_ids(&store), vec![3, 1]);

        // Merge follows the curated order
        let plan = plan_export(&store, ExportAction::MergeSelected, &[1, 3]).unwrap();
        let merged = execute_plan(&store, &plan, |_| {}).unwrap();
        assert_eq!(merged.filename, "selected_merged.pdf");
        assert_eq!(page_widths(&merged.bytes), vec![603, 601]);

        // So does the archive
        let plan = plan_export(&store, ExportAction::DownloadSelected, &[1, 3]).unwrap();
        let archive = execute_plan(&store, &plan, |_| {}).unwrap();
        assert_eq!(archive.filename, "split_pages.zip");
        let mut zip = zip::ZipArchive::new(Cursor::new(archive.bytes)).unwrap();
        assert_eq!(zip.by_index(0).unwrap().name(), "report_page_3.pdf");
        assert_eq!(zip.by_index(1).unwrap().name(), "report_page_1.pdf");

        // A single remaining selection downloads the page itself
        store.remove(1);
        let plan = plan_export(&store, ExportAction::DownloadSelected, &[3]).unwrap();
        let single = execute_plan(&store, &plan, |_| {}).unwrap();
        assert_eq!(single.filename, "report_page_3.pdf");
        assert_eq!(page_widths(&single.bytes), vec![603]);
    }

    #[test]
    fn test_two_document_merge_flow() {
        let sources = vec![
            SourceDocument::new("report.pdf".to_string(), create_test_pdf(2)).unwrap(),
            SourceDocument::new("notes.pdf".to_string(), create_test_pdf(1)).unwrap(),
        ];
        let mut percents: Vec<u8> = Vec::new();
        let merged = merge_files(&sources, |p| percents.push(p)).unwrap();

        assert_eq!(merged.filename, "report_merged.pdf");
        assert_eq!(percents, vec![50, 100]);
        assert_eq!(page_widths(&merged.bytes), vec![601, 602, 601]);
    }
}
