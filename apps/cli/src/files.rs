//! Local file collection.

use std::path::{Path, PathBuf};

use anyhow::Context;
use bytes::Bytes;
use drivedrop_protocol::constants::DEFAULT_CONTENT_TYPE;
use drivedrop_upload::{EngineConfig, IncomingFile, UploadError};

/// Returns the MIME type for a file based on its extension.
pub fn detect_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("json") => "application/json",
        Some("txt") => "text/plain",
        Some("csv") => "text/csv",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// Reads each path into an [`IncomingFile`] named after its file name.
///
/// File count and sizes are checked against `limits` from metadata first,
/// so a batch over the limits is rejected before anything is loaded.
pub async fn read_files(
    paths: &[PathBuf],
    limits: &EngineConfig,
) -> anyhow::Result<Vec<IncomingFile>> {
    check_limits(paths, limits).await?;

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("{} has no file name", path.display()))?;

        tracing::debug!(path = %path.display(), bytes = data.len(), "file read");
        files.push(IncomingFile::new(
            name,
            detect_content_type(path),
            Bytes::from(data),
        ));
    }
    Ok(files)
}

async fn check_limits(paths: &[PathBuf], limits: &EngineConfig) -> anyhow::Result<()> {
    if paths.len() > limits.max_files {
        return Err(UploadError::Validation(format!(
            "too many files: {} (max {})",
            paths.len(),
            limits.max_files
        ))
        .into());
    }

    let mut total: u64 = 0;
    for path in paths {
        let size = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?
            .len();
        if size > limits.max_file_size {
            return Err(UploadError::Validation(format!(
                "{} is {size} bytes (max {})",
                path.display(),
                limits.max_file_size
            ))
            .into());
        }
        total = total.saturating_add(size);
    }
    if total > limits.max_total_size {
        return Err(UploadError::Validation(format!(
            "batch is {total} bytes (max {})",
            limits.max_total_size
        ))
        .into());
    }
    Ok(())
}
