//! Remote drive client.
//!
//! [`RemoteStore`] is the capability the upload engine is written against:
//! list, create folder, create file in one shot, open a resumable session,
//! send one byte-range chunk. [`DriveClient`] implements it over the Drive v3
//! REST API; [`MemoryStore`] implements it in process.

pub mod client;
pub mod error;
pub mod memory;
pub mod store;

pub use client::DriveClient;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use store::{ByteRange, ChunkOutcome, RemoteStore, SessionEndpoint, StoreFuture};
