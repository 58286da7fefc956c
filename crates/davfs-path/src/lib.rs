//! Pure path-level building blocks for the WebDAV filesystem.
//!
//! This crate holds everything that can be computed without touching the
//! network: URL scheme translation, credential lookup contracts, glob
//! patterns and multi-status listing bodies.

mod credentials;
mod glob;
mod multistatus;
mod url;

pub use credentials::{
    CredentialSource, Credentials, NoCredentials, ScopedCredentials, StaticCredentials,
};
pub use glob::{GlobPattern, has_wildcard, literal_prefix};
pub use multistatus::{DirectoryEntry, parse_multistatus};
pub use url::{DavScheme, DavUrl, ParseUrlError, is_dav_url};
