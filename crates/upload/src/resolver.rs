//! Find-or-create resolution of logical paths to remote folders.

use drivedrop_drive::{RemoteStore, StoreError};
use tracing::{debug, info};

use crate::error::UploadError;
use crate::locks::ResolveLocks;
use crate::path::LogicalPath;
use crate::types::FolderHandle;

/// Walks a [`LogicalPath`] from a root folder, creating missing levels.
pub struct PathResolver<'a> {
    store: &'a dyn RemoteStore,
    locks: &'a ResolveLocks,
}

impl<'a> PathResolver<'a> {
    pub fn new(store: &'a dyn RemoteStore, locks: &'a ResolveLocks) -> Self {
        Self { store, locks }
    }

    /// Resolves `path` below `root_id` and returns the deepest folder.
    ///
    /// Nothing is cached: every call looks each level up again. On failure
    /// the folders created so far stay in place, so a retry finds them.
    pub async fn resolve(
        &self,
        path: &LogicalPath,
        root_id: &str,
    ) -> Result<FolderHandle, UploadError> {
        let mut current = FolderHandle {
            id: root_id.to_string(),
            name: String::new(),
        };

        for segment in path.segments() {
            current = self
                .resolve_segment(&current.id, segment)
                .await
                .map_err(|source| UploadError::PathResolution {
                    segment: segment.clone(),
                    source,
                })?;
        }

        debug!(path = %path, id = %current.id, "path resolved");
        Ok(current)
    }

    /// Finds the folder named exactly `name` under `parent_id`, or creates it.
    ///
    /// When several folders share the name, the first one listed wins.
    pub async fn resolve_segment(
        &self,
        parent_id: &str,
        name: &str,
    ) -> Result<FolderHandle, StoreError> {
        let _guard = self.locks.acquire(parent_id, name).await;

        let existing = self.store.list_entries(parent_id, Some(name), true).await?;
        if let Some(found) = existing
            .into_iter()
            .find(|e| e.is_folder() && e.name == name)
        {
            debug!(parent = %parent_id, name = %name, id = %found.id, "folder found");
            return Ok(FolderHandle {
                id: found.id,
                name: found.name,
            });
        }

        let created = self.store.create_folder(name, parent_id).await?;
        info!(parent = %parent_id, name = %name, id = %created.id, "folder created");
        Ok(FolderHandle {
            id: created.id,
            name: created.name,
        })
    }
}
