//! Output directory management: naming, writing, listing and expiry

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;

/// A PDF written to the output directory
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPdf {
    pub pdf_name: String,
    pub pdf_path: String,
    pub size: u64,
}

pub fn timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Final path component of a user-supplied file name, or `None` when
/// nothing usable remains
pub fn basename(name: &str) -> Option<&str> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    match base {
        "" | "." | ".." => None,
        other => Some(other),
    }
}

/// File stem safe to embed in an output name: extension dropped,
/// anything outside `[A-Za-z0-9_-]` replaced by `_`
pub fn safe_stem(original_name: &str) -> String {
    let base = basename(original_name).unwrap_or_default();
    let stem = match base.rfind('.') {
        Some(dot) if dot > 0 => &base[..dot],
        _ => base,
    };

    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "document".to_string()
    } else {
        cleaned
    }
}

/// `<stem>_<suffix>_<millis>.pdf`
pub fn derived_name(original_name: &str, suffix: &str) -> String {
    format!(
        "{}_{}_{}.pdf",
        safe_stem(original_name),
        suffix,
        timestamp_millis()
    )
}

/// `<prefix>_<millis>.pdf`
pub fn batch_name(prefix: &str) -> String {
    format!("{}_{}.pdf", prefix, timestamp_millis())
}

/// Lowercased extension including the dot, e.g. `.pdf`
pub fn extension(name: &str) -> String {
    let base = basename(name).unwrap_or_default();
    match base.rfind('.') {
        Some(dot) => base[dot..].to_ascii_lowercase(),
        None => String::new(),
    }
}

/// Give up on a name after this many numbered variants
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// Create a new file in `dir` under `name`, or `name` with `-1`, `-2`, ...
/// appended to the stem when taken. Never opens an existing file.
async fn create_unique(dir: &Path, name: &str) -> io::Result<(PathBuf, tokio::fs::File)> {
    let (stem, ext) = match name.rfind('.') {
        Some(dot) => (&name[..dot], &name[dot..]),
        None => (name, ""),
    };

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let path = match attempt {
            0 => dir.join(name),
            n => dir.join(format!("{}-{}{}", stem, n, ext)),
        };
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("No free output name for {}", name),
    ))
}

/// Write `bytes` into the output directory under `name`
pub async fn write_output(
    config: &ServerConfig,
    name: &str,
    bytes: &[u8],
) -> io::Result<StoredPdf> {
    let (path, mut file) = create_unique(&config.output_dir, name).await?;
    file.write_all(bytes).await?;
    file.flush().await?;

    let pdf_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let size = bytes.len() as u64;
    info!("Saved {} ({} bytes)", path.display(), size);

    Ok(StoredPdf {
        pdf_path: format!("/output/{}", pdf_name),
        pdf_name,
        size,
    })
}

/// Resolve a requested download to a file inside the output directory
pub fn output_file(config: &ServerConfig, requested: &str) -> Option<(String, PathBuf)> {
    let name = basename(requested)?;
    let path = config.output_dir.join(name);
    path.is_file().then(|| (name.to_string(), path))
}

/// Names of the files currently in `dir`, sorted
pub async fn list_files(dir: &Path) -> io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

/// Probe a directory by writing and removing a scratch file
pub async fn is_writable(dir: &Path) -> bool {
    let scratch = dir.join(format!("_test_{}.txt", timestamp_millis()));
    match tokio::fs::write(&scratch, b"test").await {
        Ok(()) => tokio::fs::remove_file(&scratch).await.is_ok(),
        Err(_) => false,
    }
}

/// Create the uploads and output directories and check they are writable
pub async fn prepare_directories(config: &ServerConfig) -> io::Result<()> {
    for dir in [&config.uploads_dir, &config.output_dir] {
        tokio::fs::create_dir_all(dir).await?;
        if is_writable(dir).await {
            info!("Directory {} is ready", dir.display());
        } else {
            warn!("Directory {} is not writable", dir.display());
        }
    }
    Ok(())
}

/// Delete regular files in `dir` last modified more than `retention` ago
pub async fn remove_expired(dir: &Path, retention: Duration) -> io::Result<usize> {
    let cutoff = SystemTime::now()
        .checked_sub(retention)
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Error getting file stats for {:?}: {}", entry.path(), e);
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        let expired = metadata.modified().map(|m| m < cutoff).unwrap_or(false);
        if expired {
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => warn!("Error deleting {:?}: {}", entry.path(), e),
            }
        }
    }
    Ok(removed)
}

/// Run [`remove_expired`] on both directories once per retention period
pub fn spawn_cleanup(config: std::sync::Arc<ServerConfig>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(config.retention);
        // First tick fires immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            for dir in [&config.uploads_dir, &config.output_dir] {
                match remove_expired(dir, config.retention).await {
                    Ok(count) => debug!("Cleanup removed {} file(s) from {}", count, dir.display()),
                    Err(e) => warn!("Cleanup of {} failed: {}", dir.display(), e),
                }
            }
        }
    })
}
