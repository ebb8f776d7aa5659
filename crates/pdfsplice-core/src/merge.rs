//! PDF merge operations
//!
//! Combines whole documents or individually selected pages into one output.
//! Merged documents are always assembled from scratch through the page-copy
//! builder, so the result carries a fresh page tree and catalog even when a
//! single input is merged.

use crate::base_name;
use crate::error::PdfSpliceError;
use crate::pages::DocumentBuilder;
use crate::store::{Artifact, Entry, SourceDocument};
use lopdf::Document;

fn step_percent(done: usize, total: usize) -> u8 {
    ((done as f64 / total as f64) * 100.0).round() as u8
}

/// Merge whole documents in the given order.
///
/// The output is named `{base}_merged.pdf` after the first input. Progress
/// is reported once per input document. Any page failure aborts the whole
/// merge.
pub fn merge_files<F>(
    sources: &[SourceDocument],
    mut progress: F,
) -> Result<Artifact, PdfSpliceError>
where
    F: FnMut(u8),
{
    if sources.is_empty() {
        return Err(PdfSpliceError::ValidationError(
            "No documents to merge".into(),
        ));
    }

    let mut builder = DocumentBuilder::new();
    let total = sources.len();
    for (i, source) in sources.iter().enumerate() {
        for page in 1..=source.page_count() {
            builder.append_page(&source.document, page)?;
        }
        progress(step_percent(i + 1, total));
    }

    let bytes = builder.finish()?;
    Ok(Artifact {
        bytes,
        filename: format!("{}_merged.pdf", base_name(&sources[0].name)),
    })
}

/// Merge single-page artifacts in the given order.
///
/// Each artifact is parsed back from its bytes and its page copied into the
/// output, so the result stays independent of the store. The output is
/// always named `selected_merged.pdf`. Progress is reported once per page.
pub fn merge_selected<F>(entries: &[&Entry], mut progress: F) -> Result<Artifact, PdfSpliceError>
where
    F: FnMut(u8),
{
    if entries.is_empty() {
        return Err(PdfSpliceError::ValidationError("No pages selected".into()));
    }

    let mut builder = DocumentBuilder::new();
    let total = entries.len();
    for (i, entry) in entries.iter().enumerate() {
        let document = Document::load_mem(&entry.artifact.bytes).map_err(|e| {
            PdfSpliceError::ParseError(format!("{}: {}", entry.artifact.filename, e))
        })?;
        builder.append_page(&document, 1)?;
        progress(step_percent(i + 1, total));
    }

    let bytes = builder.finish()?;
    Ok(Artifact {
        bytes,
        filename: "selected_merged.pdf".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::split_source;
    use crate::store::EntryId;
    use lopdf::{content::Content, content::Operation, dictionary, Object, Stream};

    fn create_test_pdf(num_pages: u32) -> Vec<u8> {
        create_test_pdf_widths(&vec![612; num_pages as usize])
    }

    // Pages get distinct MediaBox widths so ordering is observable in the
    // merged output
    fn create_test_pdf_widths(widths: &[i64]) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let tree_id = doc.new_object_id();

        let kids: Vec<Object> = widths
            .iter()
            .enumerate()
            .map(|(i, width)| {
                let marker = Content {
                    operations: vec![
                        Operation::new("BT", vec![]),
                        Operation::new("Tf", vec!["F1".into(), 10.into()]),
                        Operation::new("Td", vec![40.into(), 740.into()]),
                        Operation::new("Tj", vec![Object::string_literal(format!("m {}", i + 1))]),
                        Operation::new("ET", vec![]),
                    ],
                };
                let contents =
                    doc.add_object(Stream::new(dictionary! {}, marker.encode().unwrap()));
                let page = doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => Object::Reference(tree_id),
                    "MediaBox" => vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(*width),
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
                "Count" => Object::Integer(widths.len() as i64),
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

    fn entries_from(name: &str, bytes: Vec<u8>) -> Vec<Entry> {
        let source = SourceDocument::new(name.to_string(), bytes).unwrap();
        let artifacts = split_source(&source, |_, _| {}).unwrap();
        artifacts
            .into_iter()
            .enumerate()
            .map(|(i, artifact)| Entry {
                id: i as EntryId + 1,
                source_name: name.to_string(),
                page_number: i as u32 + 1,
                source: 0,
                artifact,
            })
            .collect()
    }

    #[test]
    fn test_merge_files_rejects_empty_input() {
        let result = merge_files(&[], |_| {});
        assert!(matches!(
            result,
            Err(PdfSpliceError::ValidationError(_))
        ));
    }

    #[test]
    fn test_merge_files_combines_all_pages_in_order() {
        let sources = vec![
            SourceDocument::new(
                "a.pdf".to_string(),
                create_test_pdf_widths(&[601, 602]),
            )
            .unwrap(),
            SourceDocument::new("b.pdf".to_string(), create_test_pdf_widths(&[603]))
                .unwrap(),
        ];
        let merged = merge_files(&sources, |_| {}).unwrap();

        assert_eq!(merged.filename, "a_merged.pdf");
        assert_eq!(page_widths(&merged.bytes), vec![601, 602, 603]);
    }

    #[test]
    fn test_merge_files_reports_progress_per_document() {
        let sources = vec![
            SourceDocument::new("a.pdf".to_string(), create_test_pdf(2)).unwrap(),
            SourceDocument::new("b.pdf".to_string(), create_test_pdf(3)).unwrap(),
        ];
        let mut percents = Vec::new();
        merge_files(&sources, |p| percents.push(p)).unwrap();
        assert_eq!(percents, vec![50, 100]);
    }

    #[test]
    fn test_merge_single_file_still_builds_fresh_document() {
        let input = create_test_pdf(3);
        let sources =
            vec![SourceDocument::new("solo.pdf".to_string(), input.clone()).unwrap()];
        let merged = merge_files(&sources, |_| {}).unwrap();

        assert_eq!(merged.filename, "solo_merged.pdf");
        assert_ne!(merged.bytes, input);
        let doc = Document::load_mem(&merged.bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
    }

    #[test]
    fn test_merge_selected_rejects_empty_selection() {
        let result = merge_selected(&[], |_| {});
        assert!(matches!(
            result,
            Err(PdfSpliceError::ValidationError(_))
        ));
    }

    #[test]
    fn test_merge_selected_keeps_given_order() {
        let entries = entries_from("v.pdf", create_test_pdf_widths(&[601, 602, 603]));
        let picked = vec![&entries[2], &entries[0]];
        let merged = merge_selected(&picked, |_| {}).unwrap();

        assert_eq!(merged.filename, "selected_merged.pdf");
        assert_eq!(page_widths(&merged.bytes), vec![603, 601]);
    }

    #[test]
    fn test_merge_selected_reports_progress_per_page() {
        let entries = entries_from("v.pdf", create_test_pdf(3));
        let picked: Vec<&Entry> = entries.iter().collect();
        let mut percents = Vec::new();
        merge_selected(&picked, |p| percents.push(p)).unwrap();
        assert_eq!(percents, vec![33, 67, 100]);
    }

    #[test]
    fn test_merge_selected_fails_atomically_on_bad_artifact() {
        let mut entries = entries_from("v.pdf", create_test_pdf(2));
        entries[1].artifact.bytes = vec![0, 1, 2];
        let picked: Vec<&Entry> = entries.iter().collect();
        let result = merge_selected(&picked, |_| {});
        assert!(matches!(result, Err(PdfSpliceError::ParseError(_))));
    }
}
