//! Word to PDF through a headless office suite
//!
//! When no converter is installed a placeholder PDF naming the source file
//! is produced instead, so the upload flow still completes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::storage::extension;
use crate::upload::UploadedFile;

const BINARY_NAMES: &[&str] = &["soffice", "libreoffice"];

const WINDOWS_LOCATIONS: &[&str] = &[
    "C:\\Program Files\\LibreOffice\\program\\soffice.exe",
    "C:\\Program Files (x86)\\LibreOffice\\program\\soffice.exe",
    "C:\\LibreOffice\\program\\soffice.exe",
];

/// Result of looking for the office converter
#[derive(Debug, Clone, Serialize)]
pub struct OfficeStatus {
    pub installed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Configured binary if it exists, else the first match on PATH or in the
/// usual Windows install locations
pub fn locate_office(config: &ServerConfig) -> Option<PathBuf> {
    if let Some(binary) = &config.office_binary {
        return binary.is_file().then(|| binary.clone());
    }

    let on_path = std::env::var_os("PATH").and_then(|paths| {
        std::env::split_paths(&paths).find_map(|dir| {
            BINARY_NAMES.iter().find_map(|name| {
                let candidate = dir.join(name);
                candidate.is_file().then_some(candidate)
            })
        })
    });

    on_path.or_else(|| {
        WINDOWS_LOCATIONS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.is_file())
    })
}

pub fn office_status(config: &ServerConfig) -> OfficeStatus {
    match locate_office(config) {
        Some(path) => OfficeStatus {
            installed: true,
            path: Some(path.display().to_string()),
            error: None,
        },
        None => OfficeStatus {
            installed: false,
            path: None,
            error: Some("LibreOffice not found in PATH or common locations".into()),
        },
    }
}

/// A converted Word document
#[derive(Debug)]
pub struct WordConversion {
    pub bytes: Vec<u8>,
    /// False when the placeholder was produced
    pub converted: bool,
}

/// Convert one uploaded Word file to PDF
pub async fn convert_word(
    config: &ServerConfig,
    file: &UploadedFile,
) -> Result<WordConversion, ServerError> {
    let Some(binary) = locate_office(config) else {
        info!("LibreOffice not found, using fallback PDF generation for {}", file.original_name);
        let name = file.original_name.clone();
        let bytes = tokio::task::spawn_blocking(move || pdfconvert_core::placeholder_pdf(&name))
            .await?
            .map_err(ServerError::conversion("Error converting files"))?;
        return Ok(WordConversion {
            bytes,
            converted: false,
        });
    };

    let stem = uuid::Uuid::new_v4().to_string();
    let input = config
        .uploads_dir
        .join(format!("{}{}", stem, extension(&file.original_name)));
    tokio::fs::write(&input, &file.bytes).await?;

    let result = run_office(&binary, &input, &config.uploads_dir, config.office_timeout).await;
    let output = config.uploads_dir.join(format!("{}.pdf", stem));
    let bytes = match result {
        Ok(()) => tokio::fs::read(&output).await.map_err(|e| {
            ServerError::Internal(format!(
                "Converter reported success but produced no PDF: {}",
                e
            ))
        }),
        Err(e) => Err(e),
    };

    for path in [&input, &output] {
        if let Err(e) = tokio::fs::remove_file(path).await {
            debug!("Could not remove temporary {}: {}", path.display(), e);
        }
    }

    Ok(WordConversion {
        bytes: bytes?,
        converted: true,
    })
}

/// `soffice --headless --convert-to pdf --outdir <outdir> <input>`
async fn run_office(
    binary: &Path,
    input: &Path,
    outdir: &Path,
    timeout: Duration,
) -> Result<(), ServerError> {
    debug!("Running {} on {}", binary.display(), input.display());

    let child = Command::new(binary)
        .arg("--headless")
        .arg("--convert-to")
        .arg("pdf")
        .arg("--outdir")
        .arg(outdir)
        .arg(input)
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(timeout, child)
        .await
        .map_err(|_| ServerError::Timeout(timeout.as_secs()))??;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!("Error converting file: {}", stderr.trim());
        return Err(ServerError::Internal(format!(
            "Office conversion failed ({}): {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_configured_binary_is_not_installed() {
        let root = tempfile::tempdir().unwrap();
        let mut config = ServerConfig::rooted_at(root.path());
        config.office_binary = Some(root.path().join("no-such-soffice"));

        assert!(locate_office(&config).is_none());
        let status = office_status(&config);
        assert!(!status.installed);
        assert!(status.error.is_some());
    }

    #[tokio::test]
    async fn test_placeholder_when_converter_missing() {
        let root = tempfile::tempdir().unwrap();
        let mut config = ServerConfig::rooted_at(root.path());
        config.office_binary = Some(root.path().join("no-such-soffice"));

        let file = UploadedFile {
            original_name: "letter.docx".into(),
            bytes: b"PK\x03\x04".to_vec(),
        };
        let result = convert_word(&config, &file).await.unwrap();
        assert!(!result.converted);
        assert!(result.bytes.starts_with(b"%PDF-"));
    }
}
