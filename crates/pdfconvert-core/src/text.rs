//! Plain text documents: text-to-PDF, the office placeholder and the
//! diagnostics test file.

use lopdf::{
    content::{Content, Operation},
    dictionary, Object, StringFormat,
};

use crate::builder::{helvetica_font, PdfBuilder};
use crate::error::ConvertError;
use crate::layout::{resolve_page_size, Orientation, PageSize};
use crate::metrics::encode_text;

pub const WRAP_COLUMNS: usize = 60;

const LEFT_MARGIN: f64 = 50.0;
const FIRST_LINE_Y: f64 = 750.0;
const LEADING: f64 = 20.0;
const BOTTOM_MARGIN: f64 = 50.0;
const BODY_SIZE: f64 = 12.0;

/// One line of text at an absolute position
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

impl TextLine {
    pub fn new(text: impl Into<String>, y: f64, size: f64) -> Self {
        Self {
            text: text.into(),
            x: LEFT_MARGIN,
            y,
            size,
        }
    }
}

/// Greedy word wrap: a line breaks before the word that would take it past
/// `columns` characters. Words longer than a line are kept whole.
pub fn wrap_text(text: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let needed = current.chars().count() + word.chars().count();
        if !current.is_empty() && needed > columns {
            lines.push(std::mem::take(&mut current).trim_end().to_string());
        }
        current.push_str(word);
        current.push(' ');
    }

    if !current.is_empty() {
        lines.push(current.trim_end().to_string());
    }
    lines
}

/// Render `text` on A4 pages in 12pt Helvetica, continuing on a new page
/// when a page fills up.
pub fn text_to_pdf(text: &str) -> Result<Vec<u8>, ConvertError> {
    let lines = wrap_text(text, WRAP_COLUMNS);
    if lines.is_empty() {
        return Err(ConvertError::InvalidRequest("No text provided".into()));
    }

    let lines_per_page = ((FIRST_LINE_Y - BOTTOM_MARGIN) / LEADING) as usize + 1;
    let pages: Vec<Vec<TextLine>> = lines
        .chunks(lines_per_page)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .map(|(index, line)| {
                    TextLine::new(line.as_str(), FIRST_LINE_Y - index as f64 * LEADING, BODY_SIZE)
                })
                .collect()
        })
        .collect();

    text_document(&pages)
}

/// Stand-in for a Word conversion when no office suite is available
pub fn placeholder_pdf(original_name: &str) -> Result<Vec<u8>, ConvertError> {
    text_document(&[vec![
        TextLine::new(format!("Converted from: {}", original_name), 800.0, 14.0),
        TextLine::new(
            "LibreOffice not installed for proper Word conversion.",
            750.0,
            12.0,
        ),
        TextLine::new(
            "Please install LibreOffice for full functionality.",
            720.0,
            12.0,
        ),
    ]])
}

pub fn test_pdf() -> Result<Vec<u8>, ConvertError> {
    text_document(&[vec![
        TextLine::new("This is a test PDF file", 800.0, 24.0),
        TextLine::new("Created for debugging purposes", 750.0, 12.0),
    ]])
}

/// One A4 page per entry of `pages`
pub fn text_document(pages: &[Vec<TextLine>]) -> Result<Vec<u8>, ConvertError> {
    let size = resolve_page_size(PageSize::A4, Orientation::Portrait);
    let mut builder = PdfBuilder::new();
    let font_id = builder.add_object(helvetica_font());

    for lines in pages {
        let mut operations = vec![Operation::new("BT", vec![])];
        for line in lines {
            operations.push(Operation::new(
                "Tf",
                vec![Object::Name(b"F1".to_vec()), Object::Real(line.size as f32)],
            ));
            operations.push(Operation::new(
                "Tm",
                vec![
                    Object::Integer(1),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(1),
                    Object::Real(line.x as f32),
                    Object::Real(line.y as f32),
                ],
            ));
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(encode_text(&line.text), StringFormat::Literal)],
            ));
        }
        operations.push(Operation::new("ET", vec![]));

        let resources = dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        };
        builder.add_page(size, Content { operations }, resources)?;
    }

    builder.finish()
}
