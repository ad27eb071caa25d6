//! Collision-free file names inside a folder.

use drivedrop_drive::{RemoteStore, StoreError};
use tracing::{debug, warn};

/// Highest numeric suffix tried before falling back to a timestamp.
pub const MAX_SUFFIX: u32 = 99;

/// Splits `name` at its last `.` into `(stem, extension)`.
///
/// The extension keeps its dot. A leading dot (`.env`) is part of the stem,
/// not an extension.
pub fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

/// Returns the name `name` was derived from by [`NameDisambiguator`]:
/// `report(3).pdf` becomes `report.pdf`. Other names are returned as is.
///
/// Every candidate for a desired name shares its family, so locking on the
/// family serializes flows that could end up picking the same name.
pub fn name_family(name: &str) -> String {
    let (stem, ext) = split_name(name);
    let base = stem
        .strip_suffix(')')
        .and_then(|s| s.rsplit_once('('))
        .filter(|(base, k)| {
            !base.is_empty() && !k.is_empty() && k.bytes().all(|b| b.is_ascii_digit())
        })
        .map_or(stem, |(base, _)| base);
    format!("{base}{ext}")
}

/// Picks names that do not collide with existing entries.
pub struct NameDisambiguator<'a> {
    store: &'a dyn RemoteStore,
}

impl<'a> NameDisambiguator<'a> {
    pub fn new(store: &'a dyn RemoteStore) -> Self {
        Self { store }
    }

    /// Returns `desired` if it is free in `folder_id`, else the first free
    /// `stem(k)ext` for k in 1..=99, else `stem_<millis>ext` unchecked.
    ///
    /// A failed lookup falls back to `desired` rather than failing the file.
    pub async fn unique_name(&self, desired: &str, folder_id: &str) -> String {
        match self.find_free(desired, folder_id).await {
            Ok(name) => name,
            Err(e) => {
                warn!(
                    name = %desired,
                    folder = %folder_id,
                    error = %e,
                    "name check failed, keeping original name"
                );
                desired.to_string()
            }
        }
    }

    async fn find_free(&self, desired: &str, folder_id: &str) -> Result<String, StoreError> {
        if !self.exists(desired, folder_id).await? {
            return Ok(desired.to_string());
        }

        let (stem, ext) = split_name(desired);
        for k in 1..=MAX_SUFFIX {
            let candidate = format!("{stem}({k}){ext}");
            if !self.exists(&candidate, folder_id).await? {
                debug!(desired = %desired, name = %candidate, "name taken, using suffix");
                return Ok(candidate);
            }
        }

        let fallback = format!("{stem}_{}{ext}", chrono::Utc::now().timestamp_millis());
        warn!(
            desired = %desired,
            name = %fallback,
            "all numeric suffixes taken, using timestamp"
        );
        Ok(fallback)
    }

    async fn exists(&self, name: &str, folder_id: &str) -> Result<bool, StoreError> {
        let entries = self.store.list_entries(folder_id, Some(name), false).await?;
        Ok(entries.iter().any(|e| e.name == name))
    }
}
