//! Health and diagnostic endpoints
//!
//! These report on the running process (directories, converter
//! availability, uptime) and exercise the PDF pipeline without an upload.

use std::collections::BTreeMap;
use std::path::Path;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::error::ServerError;
use crate::office::{office_status, OfficeStatus};
use crate::state::AppState;
use crate::storage::{batch_name, is_writable, write_output};

pub const SERVICE_NAME: &str = "pdfconvert-server";

/// Library versions linked into this build, as resolved in Cargo.lock
const LIBRARY_VERSIONS: &[(&str, &str)] = &[
    ("pdfconvert-core", env!("CARGO_PKG_VERSION")),
    ("lopdf", env!("LOCKED_VERSION_LOPDF")),
    ("image", env!("LOCKED_VERSION_IMAGE")),
    ("resvg", env!("LOCKED_VERSION_RESVG")),
    ("axum", env!("LOCKED_VERSION_AXUM")),
    ("tokio", env!("LOCKED_VERSION_TOKIO")),
];

/// Handler: GET /health
pub async fn handle_health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Serialize)]
pub struct DirectoryStatus {
    pub path: String,
    pub exists: bool,
    pub writable: bool,
}

async fn directory_status(dir: &Path) -> DirectoryStatus {
    let exists = dir.is_dir();
    DirectoryStatus {
        path: dir.display().to_string(),
        exists,
        writable: exists && is_writable(dir).await,
    }
}

#[derive(Debug, Serialize)]
pub struct ServerCheck {
    pub success: bool,
    pub status: &'static str,
    pub time: String,
    pub directories: BTreeMap<&'static str, DirectoryStatus>,
}

/// Handler: GET /api/check-server
pub async fn handle_check_server(State(state): State<AppState>) -> Json<ServerCheck> {
    let config = &state.config;
    let mut directories = BTreeMap::new();
    directories.insert("uploads", directory_status(&config.uploads_dir).await);
    directories.insert("output", directory_status(&config.output_dir).await);
    directories.insert("public", directory_status(&config.public_dir).await);

    Json(ServerCheck {
        success: true,
        status: "Server is running",
        time: chrono::Utc::now().to_rfc3339(),
        directories,
    })
}

#[derive(Debug, Serialize)]
pub struct DependencyCheck {
    pub success: bool,
    pub dependencies: BTreeMap<&'static str, &'static str>,
    pub libreoffice: OfficeStatus,
}

/// Handler: GET /api/check-dependencies
pub async fn handle_check_dependencies(State(state): State<AppState>) -> Json<DependencyCheck> {
    let config = state.config.clone();
    let libreoffice = tokio::task::spawn_blocking(move || office_status(&config))
        .await
        .unwrap_or_else(|e| OfficeStatus {
            installed: false,
            path: None,
            error: Some(e.to_string()),
        });

    Json(DependencyCheck {
        success: true,
        dependencies: LIBRARY_VERSIONS.iter().copied().collect(),
        libreoffice,
    })
}

/// Handler: GET /api/debug/status
pub async fn handle_debug_status(State(state): State<AppState>) -> Json<Value> {
    let config = &state.config;
    Json(json!({
        "success": true,
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "uptimeSeconds": state.started_at.elapsed().as_secs(),
        "platform": std::env::consts::OS,
        "arch": std::env::consts::ARCH,
        "config": {
            "uploadsDir": config.uploads_dir.display().to_string(),
            "outputDir": config.output_dir.display().to_string(),
            "publicDir": config.public_dir.display().to_string(),
            "maxFileSize": config.max_file_size,
            "retentionSeconds": config.retention.as_secs(),
            "officeTimeoutSeconds": config.office_timeout.as_secs(),
        },
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct ConvertTextRequest {
    pub text: Option<String>,
}

/// Handler: POST /api/debug/convert-text
pub async fn handle_convert_text(
    State(state): State<AppState>,
    Json(request): Json<ConvertTextRequest>,
) -> Result<Json<Value>, ServerError> {
    let text = request
        .text
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "Test PDF document".to_string());

    let bytes = tokio::task::spawn_blocking(move || pdfconvert_core::text_to_pdf(&text))
        .await?
        .map_err(ServerError::conversion("Error converting text to PDF"))?;
    let pdf = write_output(&state.config, &batch_name("text"), &bytes).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Text converted to PDF successfully",
        "filename": pdf.pdf_name,
        "pdfUrl": pdf.pdf_path,
    })))
}

/// Handler: GET /api/debug/create-test-file
pub async fn handle_create_test_file(
    State(state): State<AppState>,
) -> Result<Json<Value>, ServerError> {
    let bytes = tokio::task::spawn_blocking(pdfconvert_core::text::test_pdf)
        .await?
        .map_err(ServerError::conversion("Error creating test file"))?;

    let path = state.config.output_dir.join("test_output.pdf");
    tokio::fs::write(&path, &bytes).await?;
    info!("Test PDF written to {}", path.display());

    Ok(Json(json!({
        "success": true,
        "message": "Test PDF created successfully",
        "filePath": path.display().to_string(),
        "fileSize": bytes.len(),
        "downloadUrl": "/api/download/test_output.pdf",
    })))
}
