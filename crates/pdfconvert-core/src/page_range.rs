//! Page range parsing for PDF extraction
//!
//! Accepts lists like `"1,3,5-7,10-15"`: 1-indexed, inclusive, checked
//! against the document's page count. The first bad token fails the whole
//! list.

use std::collections::BTreeSet;

use crate::error::ConvertError;

/// Parse a page range string into sorted unique page numbers.
///
/// ```
/// use pdfconvert_core::parse_page_ranges;
///
/// let pages = parse_page_ranges("1,3,5-7,10-15", 20).unwrap();
/// assert_eq!(pages, vec![1, 3, 5, 6, 7, 10, 11, 12, 13, 14, 15]);
/// ```
pub fn parse_page_ranges(input: &str, total_pages: u32) -> Result<Vec<u32>, ConvertError> {
    if input.trim().is_empty() {
        return Err(ConvertError::InvalidPageRange(
            "Page ranges must be specified".into(),
        ));
    }

    let mut pages = BTreeSet::new();

    for token in input.split(',') {
        let token = token.trim();

        if let Some((start, end)) = token.split_once('-') {
            let start = parse_page_number(start, token)?;
            let end = parse_page_number(end, token)?;

            if start > end || start < 1 || end > total_pages {
                return Err(ConvertError::InvalidPageRange(format!(
                    "'{}' (document has {} pages)",
                    token, total_pages
                )));
            }

            pages.extend(start..=end);
        } else {
            let page = parse_page_number(token, token)?;

            if page < 1 || page > total_pages {
                return Err(ConvertError::InvalidPageRange(format!(
                    "page '{}' does not exist (document has {} pages)",
                    token, total_pages
                )));
            }

            pages.insert(page);
        }
    }

    Ok(pages.into_iter().collect())
}

fn parse_page_number(value: &str, token: &str) -> Result<u32, ConvertError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConvertError::InvalidPageRange(format!("'{}' is not a page number", token)))
}
