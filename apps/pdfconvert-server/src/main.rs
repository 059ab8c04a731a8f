//! PDF conversion server
//!
//! Serves the upload front end and REST API endpoints for:
//!
//! - Word and image to PDF conversion
//! - Merging, splitting, watermarking and password-protecting PDFs
//! - Downloading generated files
//! - Health and diagnostics
//!
//! Generated files live in the output directory until the background
//! cleanup task removes them after the retention window.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod config;
mod diagnostics;
mod error;
mod files;
mod office;
mod routes;
mod state;
mod storage;
mod upload;

use config::{ServerConfig, DEFAULT_OFFICE_TIMEOUT, DEFAULT_RETENTION};
use state::AppState;

/// Command-line arguments for the conversion server
#[derive(Parser, Debug)]
#[command(name = "pdfconvert-server")]
#[command(about = "Document to PDF conversion server")]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Temporary upload storage
    #[arg(long, env = "UPLOADS_DIR", default_value = "uploads")]
    uploads_dir: PathBuf,

    /// Where generated PDFs are written
    #[arg(long, env = "OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Static front end
    #[arg(long, env = "PUBLIC_DIR", default_value = "public")]
    public_dir: PathBuf,

    /// Per-file upload limit in MiB
    #[arg(long, env = "MAX_FILE_SIZE_MB", default_value = "20")]
    max_file_size_mb: usize,

    /// Delete generated and uploaded files older than this many seconds
    #[arg(long, env = "RETENTION_SECS", default_value_t = DEFAULT_RETENTION.as_secs())]
    retention_secs: u64,

    /// Office converter executable (searched on PATH when omitted)
    #[arg(long, env = "SOFFICE_PATH")]
    soffice: Option<PathBuf>,

    /// Office conversion timeout in seconds
    #[arg(long, env = "OFFICE_TIMEOUT_SECS", default_value_t = DEFAULT_OFFICE_TIMEOUT.as_secs())]
    office_timeout_secs: u64,

    /// Rate limit: requests per second per IP
    #[arg(long, env = "RATE_LIMIT", default_value = "10")]
    rate_limit: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            uploads_dir: self.uploads_dir.clone(),
            output_dir: self.output_dir.clone(),
            public_dir: self.public_dir.clone(),
            max_file_size: self.max_file_size_mb.saturating_mul(1024 * 1024),
            retention: Duration::from_secs(self.retention_secs.max(1)),
            office_binary: self.soffice.clone(),
            office_timeout: Duration::from_secs(self.office_timeout_secs.max(1)),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting pdfconvert server on {}:{}", args.host, args.port);

    let config = args.server_config();
    storage::prepare_directories(&config)
        .await
        .context("Failed to create upload and output directories")?;

    let state = AppState::new(config);
    storage::spawn_cleanup(state.config.clone());

    // Create rate limiter configuration
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(args.rate_limit.max(1).into())
            .burst_size(args.rate_limit.max(1) * 2)
            .finish()
            .context("Failed to create rate limiter config")?,
    );

    let app = routes::build_router(state.clone()).layer(GovernorLayer {
        config: governor_conf,
    });

    // Start server
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Rate limit: {} requests/second per IP", args.rate_limit);
    info!(
        "Max file size: {} MiB, files kept for {}s",
        args.max_file_size_mb,
        state.config.retention.as_secs()
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
