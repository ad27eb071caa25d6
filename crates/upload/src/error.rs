//! Upload error types.

use drivedrop_drive::StoreError;
use drivedrop_transfer::TransferError;

/// Errors produced by the upload engine.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("could not resolve folder {segment:?}: {source}")]
    PathResolution {
        segment: String,
        #[source]
        source: StoreError,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Transfer(#[from] TransferError),

    #[error("cancelled")]
    Cancelled,
}

impl UploadError {
    /// Shorthand for a [`UploadError::Validation`] with a formatted message.
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
