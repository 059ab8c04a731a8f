//! Multipart upload collection and validation

use std::collections::HashMap;

use axum::{extract::Multipart, http::StatusCode};
use tracing::debug;

use crate::error::ServerError;
use crate::storage::extension;

pub const WORD_EXTENSIONS: &[&str] = &[".doc", ".docx"];
pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".bmp", ".webp", ".svg"];
pub const PDF_EXTENSIONS: &[&str] = &[".pdf"];

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub bytes: Vec<u8>,
}

/// What a route accepts in its file field
#[derive(Debug, Clone, Copy)]
pub struct UploadRule {
    pub field: &'static str,
    pub min_files: usize,
    pub max_files: usize,
    pub extensions: &'static [&'static str],
    /// Message when fewer than `min_files` arrive
    pub missing: &'static str,
}

pub const WORD_UPLOAD: UploadRule = UploadRule {
    field: "files",
    min_files: 1,
    max_files: 10,
    extensions: WORD_EXTENSIONS,
    missing: "No files uploaded",
};

pub const IMAGE_UPLOAD: UploadRule = UploadRule {
    field: "files",
    min_files: 1,
    max_files: 20,
    extensions: IMAGE_EXTENSIONS,
    missing: "No files uploaded",
};

pub const MERGE_UPLOAD: UploadRule = UploadRule {
    field: "files",
    min_files: 2,
    max_files: 20,
    extensions: PDF_EXTENSIONS,
    missing: "At least two PDF files are required for merging",
};

pub const PDF_UPLOAD: UploadRule = UploadRule {
    field: "file",
    min_files: 1,
    max_files: 1,
    extensions: PDF_EXTENSIONS,
    missing: "No PDF file uploaded",
};

/// A parsed multipart form: files grouped by field plus the text fields
#[derive(Debug, Default)]
pub struct UploadForm {
    files: HashMap<String, Vec<UploadedFile>>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    /// Read the whole form, rejecting any file over `max_file_size` bytes
    pub async fn collect(mut multipart: Multipart, max_file_size: usize) -> Result<Self, ServerError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();

            match field.file_name().map(str::to_string) {
                Some(original_name) => {
                    let bytes = field.bytes().await.map_err(multipart_error)?;
                    if bytes.len() > max_file_size {
                        return Err(ServerError::PayloadTooLarge(format!(
                            "{} is {} bytes (limit {} bytes)",
                            original_name,
                            bytes.len(),
                            max_file_size
                        )));
                    }
                    debug!("Received {} ({} bytes) in field {}", original_name, bytes.len(), name);
                    form.files.entry(name).or_default().push(UploadedFile {
                        original_name,
                        bytes: bytes.to_vec(),
                    });
                }
                None => {
                    let value = field.text().await.map_err(multipart_error)?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Non-blank text field
    pub fn non_empty(&self, name: &str) -> Option<&str> {
        self.text(name).filter(|v| !v.trim().is_empty())
    }

    /// `"true"` is true, any other value false, absent `None`
    pub fn flag(&self, name: &str) -> Option<bool> {
        self.text(name).map(|v| v.trim() == "true")
    }

    /// Take the files for `rule.field`, checking count and extensions
    pub fn take_files(&mut self, rule: &UploadRule) -> Result<Vec<UploadedFile>, ServerError> {
        let files = self.files.remove(rule.field).unwrap_or_default();

        if files.len() < rule.min_files {
            return Err(ServerError::InvalidRequest(rule.missing.to_string()));
        }
        if files.len() > rule.max_files {
            return Err(ServerError::InvalidRequest(format!(
                "Too many files: at most {} allowed",
                rule.max_files
            )));
        }

        for file in &files {
            let ext = extension(&file.original_name);
            if !rule.extensions.contains(&ext.as_str()) {
                return Err(ServerError::UnsupportedFileType(format!(
                    "{}. Allowed types for this conversion: {}",
                    if ext.is_empty() { "(none)" } else { ext.as_str() },
                    rule.extensions.join(", ")
                )));
            }
        }

        Ok(files)
    }

    /// Take the single file for a one-file route
    pub fn take_file(&mut self, rule: &UploadRule) -> Result<UploadedFile, ServerError> {
        self.take_files(rule)?
            .into_iter()
            .next()
            .ok_or_else(|| ServerError::InvalidRequest(rule.missing.to_string()))
    }
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ServerError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::PayloadTooLarge(err.body_text())
    } else {
        ServerError::InvalidRequest(format!("Malformed upload: {}", err.body_text()))
    }
}
