//! Upload engine: the two operations exposed to the request layer.

use std::sync::Arc;

use drivedrop_drive::RemoteStore;
use drivedrop_protocol::BatchResult;
use tokio_util::sync::CancellationToken;

use crate::batch::BatchUploader;
use crate::config::EngineConfig;
use crate::error::UploadError;
use crate::locks::ResolveLocks;
use crate::path::LogicalPath;
use crate::resolver::PathResolver;
use crate::types::{FolderHandle, IncomingFile};

/// Resolves upload folders and uploads batches into them.
///
/// Cloning is cheap; clones share the store and the locks, so concurrent
/// requests never create the same folder twice nor upload two files under
/// one name. Other processes writing to the same folders can still race.
#[derive(Clone)]
pub struct UploadEngine {
    store: Arc<dyn RemoteStore>,
    config: EngineConfig,
    locks: Arc<ResolveLocks>,
}

impl UploadEngine {
    /// Creates an engine after validating `config`.
    pub fn new(store: Arc<dyn RemoteStore>, config: EngineConfig) -> Result<Self, UploadError> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            locks: Arc::new(ResolveLocks::new()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the id of the folder for `model / platform / category [/ title]`,
    /// creating missing levels under the configured root.
    pub async fn resolve_path(
        &self,
        model: &str,
        platform: &str,
        category: &str,
        title: Option<&str>,
    ) -> Result<String, UploadError> {
        let path = LogicalPath::for_upload(model, platform, category, title, &self.config)?;
        Ok(self.resolve(&path).await?.id)
    }

    /// Resolves an arbitrary logical path under the configured root.
    pub async fn resolve(&self, path: &LogicalPath) -> Result<FolderHandle, UploadError> {
        let root = self.config.root_folder()?;
        PathResolver::new(self.store.as_ref(), &self.locks)
            .resolve(path, root)
            .await
    }

    /// Uploads `files` into `folder_id`. See [`BatchUploader::upload_batch`].
    pub async fn upload_batch(
        &self,
        files: &[IncomingFile],
        folder_id: &str,
    ) -> Result<BatchResult, UploadError> {
        self.upload_batch_with_cancel(files, folder_id, CancellationToken::new())
            .await
    }

    /// Like [`upload_batch`](Self::upload_batch), stopping once `cancel` fires.
    pub async fn upload_batch_with_cancel(
        &self,
        files: &[IncomingFile],
        folder_id: &str,
        cancel: CancellationToken,
    ) -> Result<BatchResult, UploadError> {
        BatchUploader::new(self.store.as_ref(), &self.config, &self.locks)
            .with_cancel(cancel)
            .upload_batch(files, folder_id)
            .await
    }
}
