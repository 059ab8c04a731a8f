//! PDF Split algorithm
//!
//! Extracts pages from a PDF by deleting every page that was not asked for
//! and pruning whatever the remaining pages no longer reference.

use std::collections::HashSet;

use lopdf::Document;

use crate::document::{load_pdf, save_pdf};
use crate::error::ConvertError;
use crate::page_range::parse_page_ranges;

#[derive(Debug, Clone)]
pub struct SplitPdf {
    pub bytes: Vec<u8>,
    /// Extracted page numbers, ascending, 1-indexed
    pub pages: Vec<u32>,
}

/// Split a PDF, extracting only the specified pages (1-indexed)
///
/// Pages keep their original relative order whatever order they are
/// listed in.
pub fn split_document(bytes: &[u8], pages: &[u32]) -> Result<Vec<u8>, ConvertError> {
    let doc = load_pdf(bytes)?;
    keep_pages(doc, pages)
}

/// Parse `ranges` (e.g. `"1,3,5-7"`) against the document and extract those pages
pub fn extract_pages(bytes: &[u8], ranges: &str) -> Result<SplitPdf, ConvertError> {
    let doc = load_pdf(bytes)?;
    let total_pages = doc.get_pages().len() as u32;
    let pages = parse_page_ranges(ranges, total_pages)?;

    Ok(SplitPdf {
        bytes: keep_pages(doc, &pages)?,
        pages,
    })
}

fn keep_pages(mut doc: Document, pages: &[u32]) -> Result<Vec<u8>, ConvertError> {
    if pages.is_empty() {
        return Err(ConvertError::InvalidPageRange("No pages specified".into()));
    }

    if pages.contains(&0) {
        return Err(ConvertError::InvalidPageRange(
            "Page numbers must be >= 1".into(),
        ));
    }

    let page_count = doc.get_pages().len() as u32;

    for &page in pages {
        if page > page_count {
            return Err(ConvertError::InvalidPageRange(format!(
                "Page {} does not exist (document has {} pages)",
                page, page_count
            )));
        }
    }

    let pages_to_keep: HashSet<u32> = pages.iter().copied().collect();
    let mut pages_to_delete: Vec<u32> = (1..=page_count)
        .filter(|p| !pages_to_keep.contains(p))
        .collect();

    // Delete from the back so earlier page numbers stay valid
    pages_to_delete.reverse();
    for page_num in pages_to_delete {
        doc.delete_pages(&[page_num]);
    }

    doc.prune_objects();
    doc.compress();

    save_pdf(&mut doc)
}
