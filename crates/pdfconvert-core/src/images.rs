//! Image to PDF conversion
//!
//! Each decoded image becomes one page of the requested size, drawn at the
//! rectangle computed by [`place_image`]. The same page routine serves both
//! the combined (one document) and separate (one document per image) modes.

use std::io::Write;

use flate2::{write::ZlibEncoder, Compression};
use image::{codecs::jpeg::JpegEncoder, DynamicImage, ExtendedColorType, ImageEncoder};
use lopdf::{
    content::{Content, Operation},
    dictionary, Object, Stream,
};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use crate::builder::PdfBuilder;
use crate::error::ConvertError;
use crate::layout::{place_image, FitPolicy, ImageDescriptor, PageDimensions};
use crate::options::{ConversionOptions, Quality};
use crate::svg::{is_svg, rasterize_svg};

const IMAGE_RESOURCE: &str = "Im1";

/// An uploaded image, still encoded
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceImage {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// A decoded image ready to embed: its pixel size and XObject streams
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub descriptor: ImageDescriptor,
    image: Stream,
    mask: Option<Stream>,
}

impl PreparedImage {
    pub fn has_mask(&self) -> bool {
        self.mask.is_some()
    }

    /// Filter name of the image stream, e.g. `DCTDecode`
    pub fn filter(&self) -> Option<String> {
        self.image
            .dict
            .get(b"Filter")
            .and_then(Object::as_name)
            .ok()
            .map(|name| String::from_utf8_lossy(name).into_owned())
    }
}

/// Decode a bitmap, or rasterise an SVG drawing
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ConvertError> {
    if is_svg(bytes) {
        return rasterize_svg(bytes);
    }
    Ok(image::load_from_memory(bytes)?)
}

/// Decode `bytes` and build the image XObject.
///
/// Opaque images are re-encoded as JPEG at `quality`; images with
/// transparency are stored losslessly with a soft mask.
pub fn prepare_image(bytes: &[u8], quality: Quality) -> Result<PreparedImage, ConvertError> {
    let decoded = decode_image(bytes)?;
    let descriptor = ImageDescriptor::new(decoded.width(), decoded.height())?;
    let (width, height) = (decoded.width(), decoded.height());

    if decoded.color().has_alpha() {
        let rgba = decoded.to_rgba8();
        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        for pixel in rgba.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel.0[3]);
        }

        if alpha.iter().any(|&a| a != u8::MAX) {
            let image = flate_image(width, height, "DeviceRGB", &rgb)?;
            let mask = flate_image(width, height, "DeviceGray", &alpha)?;
            return Ok(PreparedImage {
                descriptor,
                image,
                mask: Some(mask),
            });
        }
    }

    let rgb = decoded.to_rgb8();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality.jpeg_quality()).write_image(
        rgb.as_raw(),
        width,
        height,
        ExtendedColorType::Rgb8,
    )?;

    let image = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        jpeg,
    )
    .with_compression(false);

    Ok(PreparedImage {
        descriptor,
        image,
        mask: None,
    })
}

fn flate_image(
    width: u32,
    height: u32,
    color_space: &str,
    samples: &[u8],
) -> Result<Stream, ConvertError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(samples)
        .and_then(|_| encoder.finish())
        .map(|compressed| {
            Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => width as i64,
                    "Height" => height as i64,
                    "ColorSpace" => color_space,
                    "BitsPerComponent" => 8,
                    "Filter" => "FlateDecode",
                },
                compressed,
            )
            .with_compression(false)
        })
        .map_err(|e| ConvertError::ImageError(format!("Failed to compress samples: {}", e)))
}

/// Append one page showing `image` placed according to `fit`
pub fn add_image_page(
    builder: &mut PdfBuilder,
    image: &PreparedImage,
    page: PageDimensions,
    fit: FitPolicy,
) -> Result<(), ConvertError> {
    let placement = place_image(&image.descriptor, page, fit)?;

    let mut xobject = image.image.clone();
    if let Some(mask) = &image.mask {
        let mask_id = builder.add_object(mask.clone());
        xobject.dict.set("SMask", mask_id);
    }
    let image_id = builder.add_object(xobject);

    // Clip to the page box: cover placements overflow it
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "re",
                vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(page.width as f32),
                    Object::Real(page.height as f32),
                ],
            ),
            Operation::new("W", vec![]),
            Operation::new("n", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(placement.width as f32),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(placement.height as f32),
                    Object::Real(placement.x as f32),
                    Object::Real(placement.y as f32),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_RESOURCE.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };

    let resources = dictionary! {
        "XObject" => dictionary! { IMAGE_RESOURCE => image_id },
    };
    builder.add_page(page, content, resources)?;
    Ok(())
}

/// A generated document and the images that went into it
#[derive(Debug, Clone)]
pub struct ImageDocument {
    pub source_names: Vec<String>,
    pub page_count: u32,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageFailure {
    pub name: String,
    pub reason: String,
}

/// Per-request conversion counts
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failures: Vec<ImageFailure>,
}

impl BatchSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    fn record_failure(&mut self, name: &str, err: &ConvertError) {
        warn!("Error processing image {}: {}", name, err);
        self.failures.push(ImageFailure {
            name: name.to_string(),
            reason: err.to_string(),
        });
    }
}

#[derive(Debug, Clone)]
pub struct ImageBatch {
    /// True when all images share one document
    pub combined: bool,
    pub documents: Vec<ImageDocument>,
    pub summary: BatchSummary,
}

/// Convert a batch of images to PDF.
///
/// Images are decoded in parallel; pages and documents follow input order.
/// Images that fail are skipped and listed in the summary. The batch fails
/// only when no image could be converted.
pub fn images_to_pdf(
    sources: &[SourceImage],
    options: &ConversionOptions,
) -> Result<ImageBatch, ConvertError> {
    if sources.is_empty() {
        return Err(ConvertError::InvalidRequest("No files uploaded".into()));
    }

    let page = options.page_dimensions();
    let combined = options.combine || sources.len() == 1;
    debug!(
        "Converting {} image(s) onto {}x{} pages, fit={}, combined={}",
        sources.len(),
        page.width,
        page.height,
        options.fit,
        combined
    );

    // collect() on an indexed parallel iterator keeps input order
    let prepared: Vec<Result<PreparedImage, ConvertError>> = sources
        .par_iter()
        .map(|source| prepare_image(&source.bytes, options.quality))
        .collect();

    let mut summary = BatchSummary::default();
    let mut documents = Vec::new();

    if combined {
        let mut builder = PdfBuilder::new();
        let mut source_names = Vec::new();

        for (source, prepared) in sources.iter().zip(prepared) {
            match prepared.and_then(|image| add_image_page(&mut builder, &image, page, options.fit)) {
                Ok(()) => {
                    summary.succeeded += 1;
                    source_names.push(source.name.clone());
                }
                Err(e) => summary.record_failure(&source.name, &e),
            }
        }

        if summary.succeeded > 0 {
            let page_count = builder.page_count() as u32;
            documents.push(ImageDocument {
                source_names,
                page_count,
                bytes: builder.finish()?,
            });
        }
    } else {
        for (source, prepared) in sources.iter().zip(prepared) {
            let document = prepared.and_then(|image| {
                let mut builder = PdfBuilder::new();
                add_image_page(&mut builder, &image, page, options.fit)?;
                builder.finish()
            });

            match document {
                Ok(bytes) => {
                    summary.succeeded += 1;
                    documents.push(ImageDocument {
                        source_names: vec![source.name.clone()],
                        page_count: 1,
                        bytes,
                    });
                }
                Err(e) => summary.record_failure(&source.name, &e),
            }
        }
    }

    if summary.succeeded == 0 {
        return Err(ConvertError::NoImagesConverted(summary.failed()));
    }

    Ok(ImageBatch {
        combined,
        documents,
        summary,
    })
}
