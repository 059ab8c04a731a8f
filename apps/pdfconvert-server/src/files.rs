//! Downloads and listing of generated PDFs

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, Method},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ServerError;
use crate::state::AppState;
use crate::storage::{list_files, output_file};

/// Handler: GET|HEAD /api/download/:filename and GET /output/:filename
pub async fn handle_download(
    State(state): State<AppState>,
    method: Method,
    Path(filename): Path<String>,
) -> Result<Response, ServerError> {
    let Some((name, path)) = output_file(&state.config, &filename) else {
        debug!("Download of missing file {}", filename);
        return Err(ServerError::NotFound("File not found".into()));
    };

    let size = tokio::fs::metadata(&path).await?.len();
    let body = if method == Method::HEAD {
        Body::empty()
    } else {
        info!("Sending file {} ({} bytes)", name, size);
        Body::from(tokio::fs::read(&path).await?)
    };

    // Quotes would end the header value early
    let disposition = format!("attachment; filename=\"{}\"", name.replace('"', "_"));
    let disposition = HeaderValue::from_str(&disposition)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_LENGTH, HeaderValue::from(size)),
        ],
        body,
    )
        .into_response())
}

#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub success: bool,
    pub files: Vec<String>,
}

/// Handler: GET /api/list-files
pub async fn handle_list_files(
    State(state): State<AppState>,
) -> Result<Json<FileListResponse>, ServerError> {
    let files = list_files(&state.config.output_dir).await?;
    Ok(Json(FileListResponse {
        success: true,
        files,
    }))
}
