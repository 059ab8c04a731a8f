//! PDF Merge algorithm
//!
//! Combines multiple PDFs into a single document.

use lopdf::{dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::document::{inherited_attribute, load_pdf, save_pdf, INHERITABLE_KEYS};
use crate::error::ConvertError;

#[derive(Debug, Clone)]
pub struct MergedPdf {
    pub bytes: Vec<u8>,
    pub page_count: u32,
}

/// Merge multiple PDFs into one
///
/// The algorithm:
/// 1. If empty, return error
/// 2. If single document, return it as-is
/// 3. Create a new destination document with its own page tree root
/// 4. For each source document:
///    a. Copy inherited page attributes onto its pages
///    b. Import all objects with IDs shifted past the destination's
///    c. Re-parent its pages under the new root, in order
/// 5. Drop the sources' old catalogs and page tree nodes, compress, save
pub fn merge_documents(documents: Vec<Vec<u8>>) -> Result<MergedPdf, ConvertError> {
    if documents.is_empty() {
        return Err(ConvertError::InvalidRequest("No documents to merge".into()));
    }

    if documents.len() == 1 {
        let bytes = documents.into_iter().next().unwrap_or_default();
        let page_count = load_pdf(&bytes)?.get_pages().len() as u32;
        return Ok(MergedPdf { bytes, page_count });
    }

    let mut dest = Document::with_version("1.7");
    let pages_id = dest.new_object_id();
    let mut kids: Vec<ObjectId> = Vec::new();

    for (index, bytes) in documents.iter().enumerate() {
        let mut source = load_pdf(bytes).map_err(|e| match e {
            ConvertError::ParseError(detail) => {
                ConvertError::ParseError(format!("document {}: {}", index + 1, detail))
            }
            other => other,
        })?;

        // BTreeMap keyed by page number, so values come out in reading order
        let source_pages: Vec<ObjectId> = source.get_pages().into_values().collect();
        for &page_id in &source_pages {
            materialize_inherited(&mut source, page_id);
        }

        let offset = dest.max_id;
        let source_max_id = source.max_id;
        for (old_id, object) in std::mem::take(&mut source.objects) {
            dest.objects
                .insert((old_id.0 + offset, old_id.1), remap_object_refs(object, offset));
        }
        dest.max_id = dest.max_id.max(source_max_id + offset);

        for old_page_id in source_pages {
            let new_page_id = (old_page_id.0 + offset, old_page_id.1);
            if let Some(Object::Dictionary(page)) = dest.objects.get_mut(&new_page_id) {
                page.set("Parent", pages_id);
            }
            kids.push(new_page_id);
        }
        debug!("Merged document {} ({} pages so far)", index + 1, kids.len());
    }

    let page_count = kids.len() as u32;
    dest.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids.into_iter().map(Object::Reference).collect::<Vec<_>>(),
            "Count" => page_count as i64,
        }),
    );
    let catalog_id = dest.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    dest.trailer.set("Root", catalog_id);

    dest.prune_objects();
    dest.compress();

    Ok(MergedPdf {
        bytes: save_pdf(&mut dest)?,
        page_count,
    })
}

/// Copy attributes a page inherits from its ancestors onto the page itself,
/// so it keeps its size and fonts once moved under a different parent
fn materialize_inherited(doc: &mut Document, page_id: ObjectId) {
    let missing: Vec<(&[u8], Object)> = INHERITABLE_KEYS
        .iter()
        .filter(|key| {
            doc.get_object(page_id)
                .and_then(Object::as_dict)
                .map(|page| !page.has(key))
                .unwrap_or(false)
        })
        .filter_map(|key| {
            inherited_attribute(doc, page_id, key)
                .cloned()
                .map(|value| (*key, value))
        })
        .collect();

    if let Ok(Object::Dictionary(page)) = doc.get_object_mut(page_id) {
        for (key, value) in missing {
            page.set(key.to_vec(), value);
        }
    }
}

/// Recursively remap object references in an object
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::page_dimensions;
    use crate::layout::PageDimensions;
    use crate::test_support::{page_text, sample_pdf, self_parented_pdf};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_merge_empty_fails() {
        let result = merge_documents(vec![]);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("No documents to merge"));
    }

    #[test]
    fn test_merge_single_document_returns_same() {
        let pdf = sample_pdf(2, "Single");
        let merged = merge_documents(vec![pdf.clone()]).unwrap();
        assert_eq!(merged.bytes, pdf);
        assert_eq!(merged.page_count, 2);
    }

    #[test]
    fn test_merge_two_documents_combines_pages() {
        let merged =
            merge_documents(vec![sample_pdf(2, "DocA"), sample_pdf(3, "DocB")]).unwrap();
        assert_eq!(merged.page_count, 5);

        let doc = Document::load_mem(&merged.bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 5, "Merged document should have 5 pages");
    }

    #[test]
    fn test_merge_preserves_page_order() {
        let merged = merge_documents(vec![
            sample_pdf(2, "First"),
            sample_pdf(1, "Second"),
            sample_pdf(2, "Third"),
        ])
        .unwrap();

        let doc = Document::load_mem(&merged.bytes).unwrap();
        let expected = [
            "First-Page-1",
            "First-Page-2",
            "Second-Page-1",
            "Third-Page-1",
            "Third-Page-2",
        ];
        for (index, label) in expected.iter().enumerate() {
            let text = page_text(&doc, index as u32 + 1);
            assert!(text.contains(label), "page {} should show {}", index + 1, label);
        }
    }

    #[test]
    fn test_merged_pages_keep_inherited_attributes() {
        let merged = merge_documents(vec![sample_pdf(1, "A"), sample_pdf(1, "B")]).unwrap();
        let doc = Document::load_mem(&merged.bytes).unwrap();

        for page_id in doc.get_pages().into_values() {
            let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
            assert!(page.has(b"Resources"));
            assert_eq!(
                page_dimensions(&doc, page_id).unwrap(),
                PageDimensions::new(612.0, 792.0)
            );
        }
    }

    #[test]
    fn test_merge_drops_source_page_trees() {
        let merged = merge_documents(vec![sample_pdf(1, "A"), sample_pdf(1, "B")]).unwrap();
        let doc = Document::load_mem(&merged.bytes).unwrap();

        let type_count = |name: &[u8]| {
            doc.objects
                .values()
                .filter_map(|o| o.as_dict().ok())
                .filter(|d| d.get(b"Type").and_then(Object::as_name).ok() == Some(name))
                .count()
        };
        assert_eq!(type_count(b"Pages"), 1);
        assert_eq!(type_count(b"Catalog"), 1);
    }

    #[test]
    fn test_merge_handles_different_sizes() {
        let merged = merge_documents(vec![
            sample_pdf(10, "Large"),
            sample_pdf(1, "Small"),
            sample_pdf(5, "Medium"),
        ])
        .unwrap();
        assert_eq!(merged.page_count, 16);
    }

    #[test]
    fn test_merge_rejects_non_pdf_input() {
        let result = merge_documents(vec![sample_pdf(1, "Ok"), b"garbage".to_vec()]);
        let err = result.unwrap_err();
        assert!(matches!(err, ConvertError::ParseError(_)));
        assert!(err.to_string().contains("document 2"));
    }

    #[test]
    fn test_merge_terminates_on_parent_cycle() {
        let merged =
            merge_documents(vec![self_parented_pdf(), self_parented_pdf()]).unwrap();
        assert_eq!(merged.page_count, 2);
    }
}
