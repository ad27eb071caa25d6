//! Upload orchestration: folder resolution, name disambiguation and batch
//! uploads against a remote drive.
//!
//! The crate is transport-agnostic: it talks to a [`RemoteStore`] and
//! leaves request routing and form decoding to the caller.
//!
//! # Flow
//!
//! 1. **Resolve** the target folder from a logical path (find or create
//!    each level)
//! 2. **Validate** the batch against size and count limits
//! 3. **Name** each file so it does not collide inside the folder
//! 4. **Transfer** the bytes, in one request or over a resumable session
//!
//! [`RemoteStore`]: drivedrop_drive::RemoteStore

pub mod batch;
pub mod config;
pub mod engine;
pub mod error;
pub mod locks;
pub mod naming;
pub mod path;
pub mod resolver;
pub mod types;
pub mod validation;

// Re-export primary types for convenience.
pub use batch::BatchUploader;
pub use config::{EngineConfig, ExtraSegmentRule};
pub use engine::UploadEngine;
pub use error::UploadError;
pub use locks::ResolveLocks;
pub use naming::{NameDisambiguator, name_family, split_name};
pub use path::LogicalPath;
pub use resolver::PathResolver;
pub use types::{FolderHandle, IncomingFile};
pub use validation::{normalize_file_name, validate_batch};
