//! Wire types for the drivedrop upload engine.
//!
//! Covers the remote drive's file resource as it comes back from the API
//! and the per-file / per-batch results handed to the request layer.

pub mod constants;
pub mod types;

// Re-export primary types for convenience.
pub use constants::FOLDER_MIME_TYPE;
pub use types::{BatchResult, EntryList, EntryMetadata, RemoteEntry, UploadOutcome};
