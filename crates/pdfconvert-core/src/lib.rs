//! Document conversion core
//!
//! Page layout (page sizes, image fit policies, watermark tiling, page
//! ranges) and the PDF operations built on it using lopdf:
//! - `images_to_pdf`: compose bitmaps and rasterised SVG onto pages
//! - `merge_documents` / `extract_pages`: merge and split
//! - `add_watermark`, `protect_pdf`: stamp and encrypt existing PDFs
//! - `text_to_pdf`, `placeholder_pdf`: simple generated documents

pub mod builder;
pub mod document;
pub mod error;
pub mod images;
pub mod layout;
pub mod merge;
pub mod metrics;
pub mod options;
pub mod page_range;
pub mod protect;
pub mod split;
pub mod svg;
pub mod text;
pub mod watermark;

#[cfg(test)]
mod test_support;

pub use document::validate_pdf_header;
pub use error::ConvertError;
pub use images::{images_to_pdf, BatchSummary, ImageBatch, ImageDocument, SourceImage};
pub use layout::{
    place_image, resolve_page_size, FitPolicy, ImageDescriptor, Orientation, PageDimensions,
    PageSize, Placement,
};
pub use merge::{merge_documents, MergedPdf};
pub use options::{ConversionOptions, Quality};
pub use page_range::parse_page_ranges;
pub use protect::{protect_pdf, Permissions, ProtectOptions};
pub use split::{extract_pages, split_document, SplitPdf};
pub use text::{placeholder_pdf, text_to_pdf};
pub use watermark::{add_watermark, watermark_marks, WatermarkOptions, WatermarkedPdf};

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, ConvertError> {
    let doc = document::load_pdf(bytes)?;
    Ok(doc.get_pages().len() as u32)
}
