//! API handlers for the conversion endpoints
//!
//! Provides REST endpoints for:
//! - Word and image to PDF conversion
//! - PDF merge, page extraction, watermarking and password protection
//!
//! Every handler writes its output into the output directory and answers
//! with the generated file's name, download path and size. The PDF work
//! itself runs on the blocking pool.

use axum::{
    extract::{Multipart, State},
    Json,
};
use pdfconvert_core::images::ImageFailure;
use pdfconvert_core::watermark::{DEFAULT_COLOR, DEFAULT_FONT_SIZE, DEFAULT_OPACITY, DEFAULT_TEXT};
use pdfconvert_core::{
    add_watermark, extract_pages, get_page_count, images_to_pdf, merge_documents, protect_pdf,
    ConversionOptions, Permissions, ProtectOptions, SourceImage, WatermarkOptions,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ServerError;
use crate::office::convert_word;
use crate::state::AppState;
use crate::storage::{batch_name, derived_name, safe_stem, write_output, StoredPdf};
use crate::upload::{UploadForm, IMAGE_UPLOAD, MERGE_UPLOAD, PDF_UPLOAD, WORD_UPLOAD};

/// One converted input file
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResult {
    pub id: String,
    pub original_name: String,
    #[serde(flatten)]
    pub pdf: StoredPdf,
}

/// Output of a single-document operation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfResult {
    pub id: String,
    #[serde(flatten)]
    pub pdf: StoredPdf,
    pub page_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_pages: Option<Vec<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_protected: Option<bool>,
}

impl PdfResult {
    fn new(pdf: StoredPdf, page_count: u32) -> Self {
        Self {
            id: new_id(),
            pdf,
            page_count,
            extracted_pages: None,
            is_protected: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub success: bool,
    pub message: String,
    pub results: Vec<FileResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ImageFailure>,
}

#[derive(Debug, Serialize)]
pub struct OperationResponse {
    pub success: bool,
    pub message: String,
    pub result: PdfResult,
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Handler: POST /api/convert-word
pub async fn handle_convert_word(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ConvertResponse>, ServerError> {
    let mut form = UploadForm::collect(multipart, state.config.max_file_size).await?;
    let files = form.take_files(&WORD_UPLOAD)?;
    info!("Starting word-to-pdf conversion of {} file(s)", files.len());

    let mut results = Vec::with_capacity(files.len());
    for file in &files {
        let conversion = convert_word(&state.config, file).await?;
        if !conversion.converted {
            debug!("Stored placeholder PDF for {}", file.original_name);
        }
        let name = batch_name(&safe_stem(&file.original_name));
        let pdf = write_output(&state.config, &name, &conversion.bytes).await?;

        results.push(FileResult {
            id: new_id(),
            original_name: file.original_name.clone(),
            pdf,
        });
    }

    Ok(Json(ConvertResponse {
        success: true,
        message: format!("Successfully converted {} file(s)", files.len()),
        results,
        failures: Vec::new(),
    }))
}

/// Handler: POST /api/convert-image
pub async fn handle_convert_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ConvertResponse>, ServerError> {
    const CONTEXT: &str = "Error converting images to PDF";

    let mut form = UploadForm::collect(multipart, state.config.max_file_size).await?;
    let files = form.take_files(&IMAGE_UPLOAD)?;
    let options = ConversionOptions::from_json(form.text("options").unwrap_or_default())
        .map_err(ServerError::conversion(CONTEXT))?;

    let total = files.len();
    info!("Starting conversion of {} image(s) to PDF: {:?}", total, options);

    let sources: Vec<SourceImage> = files
        .into_iter()
        .map(|f| SourceImage::new(f.original_name, f.bytes))
        .collect();
    let batch = tokio::task::spawn_blocking(move || images_to_pdf(&sources, &options))
        .await?
        .map_err(ServerError::conversion(CONTEXT))?;

    let mut results = Vec::with_capacity(batch.documents.len());
    for document in &batch.documents {
        let (name, original_name) = if batch.combined && total > 1 {
            (
                batch_name("combined_images"),
                format!("{} images combined.pdf", total),
            )
        } else {
            let source = document.source_names.first().cloned().unwrap_or_default();
            (batch_name(&safe_stem(&source)), source)
        };

        let pdf = write_output(&state.config, &name, &document.bytes).await?;
        results.push(FileResult {
            id: new_id(),
            original_name,
            pdf,
        });
    }

    let summary = &batch.summary;
    let message = if summary.failed() > 0 {
        format!(
            "Successfully converted {} image(s) to PDF. {} image(s) failed.",
            summary.succeeded,
            summary.failed()
        )
    } else {
        format!("Successfully converted {} image(s) to PDF.", summary.succeeded)
    };

    Ok(Json(ConvertResponse {
        success: true,
        message,
        results,
        failures: batch.summary.failures,
    }))
}

/// Handler: POST /api/merge-pdfs
pub async fn handle_merge_pdfs(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<OperationResponse>, ServerError> {
    let mut form = UploadForm::collect(multipart, state.config.max_file_size).await?;
    let files = form.take_files(&MERGE_UPLOAD)?;
    let count = files.len();
    info!("Starting merge of {} PDF file(s)", count);

    let documents: Vec<Vec<u8>> = files.into_iter().map(|f| f.bytes).collect();
    let merged = tokio::task::spawn_blocking(move || merge_documents(documents))
        .await?
        .map_err(ServerError::conversion("Error merging PDF files"))?;

    let pdf = write_output(&state.config, &batch_name("merged"), &merged.bytes).await?;

    Ok(Json(OperationResponse {
        success: true,
        message: format!("Successfully merged {} PDF files", count),
        result: PdfResult::new(pdf, merged.page_count),
    }))
}

/// Handler: POST /api/split-pdf
pub async fn handle_split_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<OperationResponse>, ServerError> {
    let mut form = UploadForm::collect(multipart, state.config.max_file_size).await?;
    let file = form.take_file(&PDF_UPLOAD)?;
    let ranges = form
        .non_empty("pageRanges")
        .ok_or_else(|| ServerError::InvalidRequest("Page ranges must be specified".into()))?
        .to_string();
    info!("Processing PDF split request for {}: {}", file.original_name, ranges);

    let bytes = file.bytes;
    let split = tokio::task::spawn_blocking(move || extract_pages(&bytes, &ranges))
        .await?
        .map_err(ServerError::conversion("Error splitting PDF file"))?;

    let name = derived_name(&file.original_name, "extracted");
    let pdf = write_output(&state.config, &name, &split.bytes).await?;
    let page_count = split.pages.len() as u32;

    Ok(Json(OperationResponse {
        success: true,
        message: format!("Successfully extracted {} pages from PDF", page_count),
        result: PdfResult {
            extracted_pages: Some(split.pages),
            ..PdfResult::new(pdf, page_count)
        },
    }))
}

/// Watermark settings from the form; blank fields take the defaults
fn watermark_options(form: &UploadForm) -> Result<WatermarkOptions, ServerError> {
    let number = |name: &str, default: f64| -> Result<f64, ServerError> {
        match form.non_empty(name) {
            None => Ok(default),
            Some(value) => value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or_else(|| {
                    ServerError::InvalidRequest(format!("Invalid {}: {}", name, value))
                }),
        }
    };

    Ok(WatermarkOptions {
        text: form.non_empty("text").unwrap_or(DEFAULT_TEXT).to_string(),
        color: form.non_empty("color").unwrap_or(DEFAULT_COLOR).to_string(),
        opacity: number("opacity", DEFAULT_OPACITY)?,
        font_size: number("fontSize", DEFAULT_FONT_SIZE)?,
        diagonal: form.flag("diagonal").unwrap_or(false),
        repeat: form.flag("repeat").unwrap_or(false),
    })
}

/// Handler: POST /api/add-watermark
pub async fn handle_add_watermark(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<OperationResponse>, ServerError> {
    let mut form = UploadForm::collect(multipart, state.config.max_file_size).await?;
    let file = form.take_file(&PDF_UPLOAD)?;
    let options = watermark_options(&form)?;
    info!(
        "Processing watermark request for {}: {:?}",
        file.original_name, options
    );

    let bytes = file.bytes;
    let watermarked = tokio::task::spawn_blocking(move || add_watermark(&bytes, &options))
        .await?
        .map_err(ServerError::conversion("Error adding watermark to PDF"))?;

    let name = derived_name(&file.original_name, "watermarked");
    let pdf = write_output(&state.config, &name, &watermarked.bytes).await?;

    Ok(Json(OperationResponse {
        success: true,
        message: "Successfully added watermark to PDF".into(),
        result: PdfResult::new(pdf, watermarked.page_count),
    }))
}

/// Permission flags: opt-in except form filling and accessibility,
/// which stay on unless explicitly `"false"`
fn permissions(form: &UploadForm) -> Permissions {
    let opt_in = |name: &str| form.flag(name).unwrap_or(false);
    let opt_out = |name: &str| form.text(name).map(str::trim) != Some("false");

    Permissions {
        printing: opt_in("allowPrinting"),
        modifying: opt_in("allowModifying"),
        copying: opt_in("allowCopying"),
        annotating: opt_in("allowAnnotating"),
        filling_forms: opt_out("allowFillingForms"),
        accessibility: opt_out("allowAccessibility"),
        assembly: opt_in("allowAssembly"),
    }
}

/// Handler: POST /api/protect-pdf
pub async fn handle_protect_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<OperationResponse>, ServerError> {
    let mut form = UploadForm::collect(multipart, state.config.max_file_size).await?;
    let file = form.take_file(&PDF_UPLOAD)?;
    let user_password = form
        .non_empty("userPassword")
        .ok_or_else(|| ServerError::InvalidRequest("User password is required".into()))?
        .to_string();

    let options = ProtectOptions {
        user_password,
        owner_password: form.non_empty("ownerPassword").map(str::to_string),
        permissions: permissions(&form),
    };
    info!(
        "Processing password protection request for {}",
        file.original_name
    );

    let bytes = file.bytes;
    let (protected, page_count) = tokio::task::spawn_blocking(move || {
        let page_count = get_page_count(&bytes)?;
        protect_pdf(&bytes, &options).map(|protected| (protected, page_count))
    })
    .await?
    .map_err(ServerError::conversion(
        "Error adding password protection to PDF",
    ))?;

    let name = derived_name(&file.original_name, "protected");
    let pdf = write_output(&state.config, &name, &protected).await?;

    Ok(Json(OperationResponse {
        success: true,
        message: "Successfully password-protected the PDF".into(),
        result: PdfResult {
            is_protected: Some(true),
            ..PdfResult::new(pdf, page_count)
        },
    }))
}
