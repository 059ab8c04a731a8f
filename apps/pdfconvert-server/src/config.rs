//! Resolved server configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_MAX_FILE_SIZE: usize = 20 * 1024 * 1024;
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_OFFICE_TIMEOUT: Duration = Duration::from_secs(120);

/// Largest multipart request accepted: the biggest batch of full-size files
const MAX_FILES_PER_REQUEST: usize = 20;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Temporary storage for files handed to the office converter
    pub uploads_dir: PathBuf,
    /// Generated PDFs, served under `/output` and `/api/download`
    pub output_dir: PathBuf,
    /// Static front end
    pub public_dir: PathBuf,
    /// Per-file upload limit in bytes
    pub max_file_size: usize,
    /// Files older than this are removed by the cleanup task
    pub retention: Duration,
    /// Office converter executable; searched on PATH when unset
    pub office_binary: Option<PathBuf>,
    pub office_timeout: Duration,
}

impl ServerConfig {
    /// Default layout with every directory under `root`
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            uploads_dir: root.join("uploads"),
            output_dir: root.join("output"),
            public_dir: root.join("public"),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            retention: DEFAULT_RETENTION,
            office_binary: None,
            office_timeout: DEFAULT_OFFICE_TIMEOUT,
        }
    }

    /// Body limit for the multipart routes
    pub fn max_request_body(&self) -> usize {
        self.max_file_size
            .saturating_mul(MAX_FILES_PER_REQUEST)
            .saturating_add(1024 * 1024)
    }
}
