//! Minimal PDF document builder
//!
//! Creates a fresh lopdf document with a flat page tree. Used for every
//! document this crate generates from scratch (image conversions, text and
//! placeholder documents).

use lopdf::{content::Content, dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::document::save_pdf;
use crate::error::ConvertError;
use crate::layout::PageDimensions;

pub struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
}

impl Default for PdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            page_ids: Vec::new(),
        }
    }

    /// Store an object (image XObject, font, ...) and return its id
    pub fn add_object<T: Into<Object>>(&mut self, object: T) -> ObjectId {
        self.doc.add_object(object)
    }

    /// Append a page of the given size drawing `content` with `resources`
    pub fn add_page(
        &mut self,
        size: PageDimensions,
        content: Content,
        resources: Dictionary,
    ) -> Result<ObjectId, ConvertError> {
        let encoded = content
            .encode()
            .map_err(|e| ConvertError::OperationError(format!("Failed to encode content: {}", e)))?;
        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), encoded));

        let page = dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(size.width as f32),
                Object::Real(size.height as f32),
            ],
            "Contents" => content_id,
            "Resources" => resources,
        };
        let page_id = self.doc.add_object(page);
        self.page_ids.push(page_id);
        Ok(page_id)
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Close the page tree and serialize
    pub fn finish(mut self) -> Result<Vec<u8>, ConvertError> {
        if self.page_ids.is_empty() {
            return Err(ConvertError::OperationError(
                "Document has no pages".into(),
            ));
        }

        let kids: Vec<Object> = self
            .page_ids
            .iter()
            .map(|id| Object::Reference(*id))
            .collect();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => self.page_ids.len() as i64,
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        self.doc.compress();
        save_pdf(&mut self.doc)
    }
}

/// Resource entry for the standard Helvetica font
pub fn helvetica_font() -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::page_dimensions;
    use crate::layout::{resolve_page_size, Orientation, PageSize};
    use lopdf::content::Operation;

    #[test]
    fn test_empty_builder_fails() {
        assert!(PdfBuilder::new().finish().is_err());
    }

    #[test]
    fn test_builds_pages_with_requested_size() {
        let mut builder = PdfBuilder::new();
        let size = resolve_page_size(PageSize::Letter, Orientation::Landscape);
        for _ in 0..3 {
            let content = Content {
                operations: vec![Operation::new("n", vec![])],
            };
            builder.add_page(size, content, Dictionary::new()).unwrap();
        }
        assert_eq!(builder.page_count(), 3);

        let bytes = builder.finish().unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 3);

        let size = page_dimensions(&doc, pages[&1]).unwrap();
        assert_eq!(size, PageDimensions::new(792.0, 612.0));
    }
}
