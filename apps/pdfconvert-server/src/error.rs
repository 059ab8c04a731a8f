//! Error types for the conversion server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pdfconvert_core::ConvertError;
use serde::Serialize;
use thiserror::Error;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Invalid file type: {0}")]
    UnsupportedFileType(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{context}: {source}")]
    Conversion {
        context: &'static str,
        #[source]
        source: ConvertError,
    },

    #[error("Office conversion timed out after {0}s")]
    Timeout(u64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Attach the user-facing summary of the operation that failed
    pub fn conversion(context: &'static str) -> impl FnOnce(ConvertError) -> Self {
        move |source| ServerError::Conversion { context, source }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
    error: String,
    code: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code, message, error) = match &self {
            ServerError::InvalidRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "INVALID_REQUEST",
                msg.clone(),
                msg.clone(),
            ),
            ServerError::UnsupportedFileType(msg) => (
                StatusCode::BAD_REQUEST,
                "UNSUPPORTED_FILE_TYPE",
                format!("Invalid file type: {}", msg),
                msg.clone(),
            ),
            ServerError::PayloadTooLarge(msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "FILE_TOO_LARGE",
                format!("File upload error: {}", msg),
                msg.clone(),
            ),
            ServerError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone(), msg.clone())
            }
            ServerError::Conversion { context, source } => {
                let (status, code) = match source {
                    ConvertError::InvalidPageRange(_) => {
                        (StatusCode::BAD_REQUEST, "INVALID_PAGE_RANGE")
                    }
                    ConvertError::InvalidFitPolicy(_) => {
                        (StatusCode::BAD_REQUEST, "INVALID_FIT_POLICY")
                    }
                    ConvertError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
                    ConvertError::ParseError(_) => (StatusCode::BAD_REQUEST, "INVALID_PDF"),
                    ConvertError::DegenerateImage(_) | ConvertError::ImageError(_) => {
                        (StatusCode::BAD_REQUEST, "INVALID_IMAGE")
                    }
                    ConvertError::NoImagesConverted(_) => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "NO_IMAGES_CONVERTED")
                    }
                    ConvertError::OperationError(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "CONVERSION_FAILED")
                    }
                };
                tracing::warn!("{}: {}", context, source);
                (status, code, context.to_string(), source.to_string())
            }
            ServerError::Timeout(secs) => (
                StatusCode::GATEWAY_TIMEOUT,
                "TIMEOUT",
                "Error converting files".to_string(),
                format!("Office conversion timed out after {}s", secs),
            ),
            ServerError::Io(err) => {
                tracing::error!("I/O error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "IO_ERROR",
                    "Internal server error".to_string(),
                    err.to_string(),
                )
            }
            ServerError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                    msg.clone(),
                )
            }
        };

        let body = ErrorResponse {
            success: false,
            message,
            error,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServerError::Internal(format!("Worker task failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (
                ServerError::InvalidRequest("x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (ServerError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                ServerError::PayloadTooLarge("x".into()),
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                ServerError::conversion("Error splitting PDF file")(
                    ConvertError::InvalidPageRange("9".into()),
                ),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServerError::conversion("Error merging PDF files")(ConvertError::OperationError(
                    "boom".into(),
                )),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
