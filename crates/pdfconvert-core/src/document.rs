//! Shared lopdf helpers: loading, saving and page geometry lookups.

use std::collections::HashSet;

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::ConvertError;
use crate::layout::PageDimensions;

/// Attributes a page may inherit from its ancestors in the page tree
pub(crate) const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Deepest page tree walked when looking up inherited attributes
const MAX_TREE_DEPTH: usize = 64;

/// True when `bytes` begin with the `%PDF-` magic
pub fn validate_pdf_header(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF-")
}

/// Parse PDF bytes, rejecting anything that is not a PDF
pub fn load_pdf(bytes: &[u8]) -> Result<Document, ConvertError> {
    if !validate_pdf_header(bytes) {
        return Err(ConvertError::ParseError(
            "Not a valid PDF file (missing %PDF- header)".into(),
        ));
    }
    Document::load_mem(bytes).map_err(|e| ConvertError::ParseError(e.to_string()))
}

pub fn save_pdf(doc: &mut Document) -> Result<Vec<u8>, ConvertError> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| ConvertError::OperationError(format!("Save failed: {}", e)))?;
    Ok(buffer)
}

/// Look up `key` on a page, walking up the `Parent` chain.
///
/// A chain that loops back on itself or runs deeper than
/// [`MAX_TREE_DEPTH`] ends the search with `None`.
pub(crate) fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut visited = HashSet::new();
    let mut current = Some(page_id);
    while let Some(id) = current {
        if visited.len() >= MAX_TREE_DEPTH || !visited.insert(id) {
            return None;
        }
        let dict = doc.get_object(id).and_then(Object::as_dict).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

/// Follow a reference to its target, or return the object itself
pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Resolve an object that should be a dictionary into an owned copy
pub(crate) fn resolve_dict(doc: &Document, object: &Object) -> Option<Dictionary> {
    resolve(doc, object)
        .and_then(|o| o.as_dict().ok())
        .cloned()
}

pub(crate) fn obj_to_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(*f as f64),
        _ => None,
    }
}

/// Size of a page from its (possibly inherited) MediaBox
pub fn page_dimensions(doc: &Document, page_id: ObjectId) -> Result<PageDimensions, ConvertError> {
    let media_box = inherited_attribute(doc, page_id, b"MediaBox")
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_array().ok())
        .ok_or_else(|| ConvertError::OperationError("Page has no MediaBox".into()))?;

    let coords: Vec<f64> = media_box.iter().filter_map(obj_to_f64).collect();
    if coords.len() != 4 {
        return Err(ConvertError::OperationError("Malformed MediaBox".into()));
    }

    Ok(PageDimensions::new(
        (coords[2] - coords[0]).abs(),
        (coords[3] - coords[1]).abs(),
    ))
}
