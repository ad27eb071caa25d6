//! Batch preconditions, checked before any byte is sent.

use crate::config::EngineConfig;
use crate::error::UploadError;
use crate::types::IncomingFile;

/// Reduces a client-supplied name to a bare file name.
///
/// Clients may send paths (`C:\photos\a.jpg`, `../a.jpg`); only the last
/// component is kept. Rejects names that are empty or only `.`/`..`.
pub fn normalize_file_name(raw: &str) -> Result<String, UploadError> {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    match name {
        "" => Err(UploadError::validation(format!(
            "file name is empty: {raw:?}"
        ))),
        "." | ".." => Err(UploadError::validation(format!(
            "invalid file name: {raw:?}"
        ))),
        _ if name.chars().any(char::is_control) => Err(UploadError::validation(format!(
            "file name contains control characters: {raw:?}"
        ))),
        _ => Ok(name.to_string()),
    }
}

/// Checks a batch against the configured limits.
///
/// Uses declared sizes only, and fails the whole batch on the first
/// violation. Returns the normalized names, one per file, in order.
pub fn validate_batch(
    files: &[IncomingFile],
    folder_id: &str,
    config: &EngineConfig,
) -> Result<Vec<String>, UploadError> {
    if folder_id.trim().is_empty() {
        return Err(UploadError::validation("target folder id is required"));
    }
    if files.is_empty() {
        return Err(UploadError::validation("no files to upload"));
    }
    if files.len() > config.max_files {
        return Err(UploadError::validation(format!(
            "too many files: {} (max {})",
            files.len(),
            config.max_files
        )));
    }

    let mut total: u64 = 0;
    let mut names = Vec::with_capacity(files.len());
    for file in files {
        let name = normalize_file_name(&file.name)?;
        if file.size > config.max_file_size {
            return Err(UploadError::validation(format!(
                "{name} is {} bytes (max {})",
                file.size, config.max_file_size
            )));
        }
        if file.size != file.data.len() as u64 {
            return Err(UploadError::validation(format!(
                "{name} declares {} bytes but carries {}",
                file.size,
                file.data.len()
            )));
        }
        total = total.saturating_add(file.size);
        names.push(name);
    }

    if total > config.max_total_size {
        return Err(UploadError::validation(format!(
            "batch is {total} bytes (max {})",
            config.max_total_size
        )));
    }

    Ok(names)
}
