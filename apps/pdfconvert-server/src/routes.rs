//! Router assembly

use axum::{
    extract::{DefaultBodyLimit, OriginalUri},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::api::{
    handle_add_watermark, handle_convert_image, handle_convert_word, handle_merge_pdfs,
    handle_protect_pdf, handle_split_pdf,
};
use crate::diagnostics::{
    handle_check_dependencies, handle_check_server, handle_convert_text, handle_create_test_file,
    handle_debug_status, handle_health,
};
use crate::files::{handle_download, handle_list_files};
use crate::state::AppState;

/// JSON 404 for anything under `/api` without a route
async fn api_not_found(method: Method, OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": format!("Route not found: {} {}", method, uri.path()),
        })),
    )
}

/// Build the full application router. Rate limiting is layered on by the
/// caller since it needs the peer address.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_request_body();

    let api = Router::new()
        // Conversions
        .route("/convert-word", post(handle_convert_word))
        .route("/convert-image", post(handle_convert_image))
        .route("/merge-pdfs", post(handle_merge_pdfs))
        .route("/split-pdf", post(handle_split_pdf))
        .route("/add-watermark", post(handle_add_watermark))
        .route("/protect-pdf", post(handle_protect_pdf))
        // Files
        .route("/download/:filename", get(handle_download))
        .route("/list-files", get(handle_list_files))
        // Diagnostics
        .route("/check-server", get(handle_check_server))
        .route("/check-dependencies", get(handle_check_dependencies))
        .route("/debug/status", get(handle_debug_status))
        .route("/debug/convert-text", post(handle_convert_text))
        .route("/debug/create-test-file", get(handle_create_test_file))
        .fallback(api_not_found);

    let public_dir = state.config.public_dir.clone();
    let static_files = ServeDir::new(&public_dir)
        .append_index_html_on_directories(true)
        .fallback(ServeFile::new(public_dir.join("index.html")));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/output/:filename", get(handle_download))
        .nest("/api", api)
        .fallback_service(static_files)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}
