//! Text watermarks
//!
//! A watermark is either a single mark at the page center or a fixed grid of
//! 2 columns x 3 rows. The grid does not adapt to text length or page size.
//! Diagonal marks are rotated 45 degrees about their anchor point.

use lopdf::{
    content::{Content, Operation},
    dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat,
};
use serde::Serialize;
use tracing::debug;

use crate::builder::helvetica_font;
use crate::document::{inherited_attribute, load_pdf, page_dimensions, resolve_dict, save_pdf};
use crate::error::ConvertError;
use crate::layout::PageDimensions;
use crate::metrics::{encode_text, text_height, text_width};

pub const DEFAULT_TEXT: &str = "CONFIDENTIAL";
pub const DEFAULT_COLOR: &str = "#FF0000";
pub const DEFAULT_OPACITY: f64 = 0.3;
pub const DEFAULT_FONT_SIZE: f64 = 50.0;

pub const GRID_COLUMNS: u32 = 2;
pub const GRID_ROWS: u32 = 3;

const DIAGONAL_ANGLE: f64 = 45.0;
const FONT_RESOURCE: &str = "WmF1";
const STATE_RESOURCE: &str = "WmGS1";

#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkOptions {
    pub text: String,
    /// `#RRGGBB`
    pub color: String,
    pub opacity: f64,
    pub font_size: f64,
    pub diagonal: bool,
    pub repeat: bool,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT.to_string(),
            color: DEFAULT_COLOR.to_string(),
            opacity: DEFAULT_OPACITY,
            font_size: DEFAULT_FONT_SIZE,
            diagonal: false,
            repeat: false,
        }
    }
}

/// Measured size of the watermark text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextExtent {
    pub width: f64,
    pub height: f64,
}

impl TextExtent {
    pub fn measure(text: &str, font_size: f64) -> Self {
        Self {
            width: text_width(text, font_size),
            height: text_height(font_size),
        }
    }
}

/// Where one copy of the text is drawn: baseline origin and rotation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WatermarkMark {
    pub x: f64,
    pub y: f64,
    /// Counter-clockwise, in degrees
    pub angle: f64,
}

/// Compute the marks for one page
pub fn watermark_marks(
    page: PageDimensions,
    text: TextExtent,
    repeat: bool,
    diagonal: bool,
) -> Vec<WatermarkMark> {
    // Diagonal marks are anchored on the cell center, straight ones are
    // offset so the text box is centered.
    let mark = |center_x: f64, center_y: f64| {
        if diagonal {
            WatermarkMark {
                x: center_x,
                y: center_y,
                angle: DIAGONAL_ANGLE,
            }
        } else {
            WatermarkMark {
                x: center_x - text.width / 2.0,
                y: center_y - text.height / 2.0,
                angle: 0.0,
            }
        }
    };

    if !repeat {
        return vec![mark(page.width / 2.0, page.height / 2.0)];
    }

    let spacing_x = page.width / GRID_COLUMNS as f64;
    let spacing_y = page.height / GRID_ROWS as f64;

    let mut marks = Vec::with_capacity((GRID_ROWS * GRID_COLUMNS) as usize);
    for row in 0..GRID_ROWS {
        for col in 0..GRID_COLUMNS {
            marks.push(mark(
                col as f64 * spacing_x + spacing_x / 2.0,
                row as f64 * spacing_y + spacing_y / 2.0,
            ));
        }
    }
    marks
}

/// Parse hex color string (e.g., "#FF0000" or "FF0000") to RGB floats (0-1 range).
///
/// Malformed input yields the default red.
pub fn parse_hex_color(color: &str) -> (f32, f32, f32) {
    let hex = color.trim().trim_start_matches('#');
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .map(|v| v as f32 / 255.0)
    };

    match (hex.len(), channel(0..2), channel(2..4), channel(4..6)) {
        (6, Some(r), Some(g), Some(b)) => (r, g, b),
        _ => (1.0, 0.0, 0.0),
    }
}

#[derive(Debug, Clone)]
pub struct WatermarkedPdf {
    pub bytes: Vec<u8>,
    pub page_count: u32,
}

/// Stamp the watermark on every page of `pdf_bytes`
pub fn add_watermark(
    pdf_bytes: &[u8],
    options: &WatermarkOptions,
) -> Result<WatermarkedPdf, ConvertError> {
    if options.text.trim().is_empty() {
        return Err(ConvertError::InvalidRequest(
            "Watermark text must not be empty".into(),
        ));
    }
    if !options.font_size.is_finite() || options.font_size <= 0.0 {
        return Err(ConvertError::InvalidRequest(format!(
            "Font size must be a positive number, got {}",
            options.font_size
        )));
    }
    if !options.opacity.is_finite() {
        return Err(ConvertError::InvalidRequest(format!(
            "Opacity must be a number, got {}",
            options.opacity
        )));
    }

    let mut doc = load_pdf(pdf_bytes)?;
    let opacity = options.opacity.clamp(0.0, 1.0) as f32;
    let color = parse_hex_color(&options.color);
    let extent = TextExtent::measure(&options.text, options.font_size);

    let font_id = doc.add_object(helvetica_font());
    let state_id = doc.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => Object::Real(opacity),
        "CA" => Object::Real(opacity),
    });

    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
    for page_id in &pages {
        let page = page_dimensions(&doc, *page_id)?;
        let marks = watermark_marks(page, extent, options.repeat, options.diagonal);
        debug!("Watermarking page {:?} with {} marks", page_id, marks.len());

        let overlay = mark_content(&marks, &options.text, options.font_size, color)?;
        install_resources(&mut doc, *page_id, font_id, state_id)?;
        wrap_page_contents(&mut doc, *page_id, overlay)?;
    }

    doc.compress();
    let bytes = save_pdf(&mut doc)?;

    Ok(WatermarkedPdf {
        bytes,
        page_count: pages.len() as u32,
    })
}

fn mark_content(
    marks: &[WatermarkMark],
    text: &str,
    font_size: f64,
    (r, g, b): (f32, f32, f32),
) -> Result<Vec<u8>, ConvertError> {
    let encoded = encode_text(text);
    let mut operations = Vec::new();

    for mark in marks {
        let (sin, cos) = mark.angle.to_radians().sin_cos();
        operations.extend([
            Operation::new("q", vec![]),
            Operation::new("gs", vec![Object::Name(STATE_RESOURCE.as_bytes().to_vec())]),
            Operation::new("rg", vec![Object::Real(r), Object::Real(g), Object::Real(b)]),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![
                    Object::Name(FONT_RESOURCE.as_bytes().to_vec()),
                    Object::Real(font_size as f32),
                ],
            ),
            Operation::new(
                "Tm",
                vec![
                    Object::Real(cos as f32),
                    Object::Real(sin as f32),
                    Object::Real(-sin as f32),
                    Object::Real(cos as f32),
                    Object::Real(mark.x as f32),
                    Object::Real(mark.y as f32),
                ],
            ),
            Operation::new(
                "Tj",
                vec![Object::String(encoded.clone(), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    Content { operations }
        .encode()
        .map_err(|e| ConvertError::OperationError(format!("Failed to encode watermark: {}", e)))
}

/// Give the page its own resource dictionary with the watermark font and
/// graphics state added, keeping whatever it already had or inherited.
fn install_resources(
    doc: &mut Document,
    page_id: ObjectId,
    font_id: ObjectId,
    state_id: ObjectId,
) -> Result<(), ConvertError> {
    let mut resources = inherited_attribute(doc, page_id, b"Resources")
        .and_then(|o| resolve_dict(doc, o))
        .unwrap_or_default();

    let entries: [(&[u8], &str, ObjectId); 2] = [
        (b"Font", FONT_RESOURCE, font_id),
        (b"ExtGState", STATE_RESOURCE, state_id),
    ];
    for (category, name, id) in entries {
        let mut sub = resources
            .get(category)
            .ok()
            .and_then(|o| resolve_dict(doc, o))
            .unwrap_or_default();
        sub.set(name, id);
        resources.set(category, sub);
    }

    page_dict_mut(doc, page_id)?.set("Resources", resources);
    Ok(())
}

/// Wrap the existing content in `q ... Q` and append `overlay` after it
fn wrap_page_contents(
    doc: &mut Document,
    page_id: ObjectId,
    overlay: Vec<u8>,
) -> Result<(), ConvertError> {
    let existing: Vec<Object> = {
        let page = doc
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|_| ConvertError::OperationError("Invalid page dictionary".into()))?;

        match page.get(b"Contents") {
            Ok(Object::Reference(id)) => match doc.get_object(*id) {
                Ok(Object::Array(items)) => items.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(Object::Array(items)) => items.clone(),
            _ => Vec::new(),
        }
    };

    let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let mut closing = b"Q\n".to_vec();
    closing.extend(overlay);
    let close_id = doc.add_object(Stream::new(Dictionary::new(), closing));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(open_id));
    contents.extend(existing);
    contents.push(Object::Reference(close_id));

    page_dict_mut(doc, page_id)?.set("Contents", contents);
    Ok(())
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary, ConvertError> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|_| ConvertError::OperationError("Invalid page dictionary".into()))
}
