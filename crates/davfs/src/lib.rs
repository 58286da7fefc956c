//! Byte-addressable file abstraction over WebDAV collection stores.
//!
//! The store only offers monolithic uploads and no random-access writes, so
//! writing buffers sequential bytes locally, spilling to a staging file past
//! a size threshold, and commits with a single PUT. Every remote call rides
//! the same bounded-backoff retry policy, and glob patterns are resolved by
//! walking the hierarchy one listing at a time.
//!
//! # Architecture
//!
//! - [`davfs_path`] - pure path logic: URL translation, globs, listing bodies
//! - [`davfs_transport`] - request execution with retry and header capture
//! - this crate - write buffering, commit, directory management, resolution
//!
//! # Known limitation
//!
//! The remote store has no locking. Concurrent writers to the same resource
//! from different clients race and the last committer wins.

mod commit;
mod config;
mod dir;
mod error;
mod fs;
mod resolve;
mod write_buffer;

pub use commit::CommitEngine;
pub use config::{
    DEFAULT_LARGE_UPLOAD_THRESHOLD, DEFAULT_LARGE_UPLOAD_TIMEOUT, DEFAULT_SPILL_THRESHOLD,
    DavConfig,
};
pub use dir::DirectoryManager;
pub use error::{Error, Result};
pub use fs::{DavFile, DavFs, Metadata};
pub use resolve::HierarchyResolver;
pub use write_buffer::{UploadSource, WriteBuffer};

pub use davfs_path::{
    CredentialSource, Credentials, DavScheme, DavUrl, DirectoryEntry, GlobPattern, NoCredentials,
    ScopedCredentials, StaticCredentials, is_dav_url,
};
pub use davfs_transport::{ReqwestTransport, RetryPolicy};
