//! The file abstraction over a WebDAV collection store.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use davfs_path::{CredentialSource, Credentials, DavUrl, DirectoryEntry, has_wildcard};
use davfs_transport::{
    HttpTransport, RequestExecutor, ReqwestTransport, TransportRequest, TransportResponse, Verb,
    with_basic_auth,
};

use crate::commit::CommitEngine;
use crate::config::DavConfig;
use crate::dir::DirectoryManager;
use crate::error::{Error, Result};
use crate::resolve::{HierarchyResolver, is_listing_success, propfind_request, strip_origin};
use crate::write_buffer::WriteBuffer;

/// Size information from a metadata probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub len: u64,
}

/// A WebDAV-backed filesystem client.
///
/// Each instance owns its retry policy and configuration; handles opened
/// from it are independent of each other, so callers get parallelism by
/// opening one handle per file. The remote store itself has no locking:
/// concurrent writers to the same resource race, last committer wins.
pub struct DavFs<T> {
    executor: RequestExecutor<T>,
    config: DavConfig,
    credentials: Arc<dyn CredentialSource>,
}

impl DavFs<ReqwestTransport> {
    /// Build a filesystem over the process-shared blocking HTTP client.
    pub fn connect(config: DavConfig, credentials: Arc<dyn CredentialSource>) -> Result<Self> {
        let transport = ReqwestTransport::new(config.connect_timeout, config.read_timeout)?;
        Ok(Self::with_transport(transport, config, credentials))
    }
}

impl<T: HttpTransport> DavFs<T> {
    /// Build a filesystem over any transport; tests hand in a scripted one.
    pub fn with_transport(
        transport: T,
        config: DavConfig,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        let executor = RequestExecutor::new(transport, config.retry);
        Self {
            executor,
            config,
            credentials,
        }
    }

    /// Translate a logical path and look up its credentials. The lookup uses
    /// the original form so credential scoping survives translation.
    fn resolve(&self, path: &str) -> Result<(DavUrl, Option<Credentials>)> {
        let url = DavUrl::parse(path).map_err(|_| Error::InvalidUrl(path.to_string()))?;
        let credentials = self.credentials.lookup(path).filter(|c| !c.is_empty());
        Ok((url, credentials))
    }

    fn simple(
        &self,
        verb: Verb,
        url: &DavUrl,
        credentials: Option<&Credentials>,
    ) -> TransportResponse {
        let request = with_basic_auth(TransportRequest::new(verb, url.http_url()), credentials);
        self.executor.execute(&request)
    }

    /// Open for reading. A metadata probe establishes the length up front.
    pub fn open_read(&self, path: &str) -> Result<DavFile<'_, T>> {
        let (url, credentials) = self.resolve(path)?;
        let response = self.simple(Verb::Head, &url, credentials.as_ref());
        if response.is_transport_error() || !matches!(response.status, 200 | 204) {
            return Err(Error::from_response(path, &response));
        }
        Ok(DavFile {
            fs: self,
            path: path.to_string(),
            url,
            credentials,
            mode: Mode::Read,
            buffer: None,
            length: response.content_length().unwrap_or(0),
            position: 0,
        })
    }

    /// Open for writing. Content is buffered locally and committed with a
    /// single upload on sync or close. Handles are read XOR write; append
    /// is not supported by the protocol surface.
    pub fn open_write(&self, path: &str) -> Result<DavFile<'_, T>> {
        let (url, credentials) = self.resolve(path)?;
        Ok(DavFile {
            fs: self,
            path: path.to_string(),
            url,
            credentials,
            mode: Mode::Write,
            buffer: Some(WriteBuffer::new(self.config.spill_threshold)),
            length: 0,
            position: 0,
        })
    }

    /// Whole-file read.
    pub fn read(&self, path: &str) -> Result<Vec<u8>> {
        let (url, credentials) = self.resolve(path)?;
        let response = self.simple(Verb::Get, &url, credentials.as_ref());
        if response.is_transport_error() || !matches!(response.status, 200 | 206) {
            return Err(Error::from_response(path, &response));
        }
        Ok(response.body.to_vec())
    }

    /// Ranged read of `len` bytes starting at `offset`.
    pub fn read_range(&self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>> {
        let (url, credentials) = self.resolve(path)?;
        self.read_range_at(&url, credentials.as_ref(), path, offset, len)
    }

    fn read_range_at(
        &self,
        url: &DavUrl,
        credentials: Option<&Credentials>,
        path: &str,
        offset: u64,
        len: usize,
    ) -> Result<Vec<u8>> {
        if len == 0 {
            return Ok(Vec::new());
        }
        let end = offset + len as u64 - 1;
        let request = with_basic_auth(
            TransportRequest::new(Verb::Get, url.http_url())
                .header("Range", format!("bytes={offset}-{end}")),
            credentials,
        );
        let response = self.executor.execute(&request);
        if response.is_transport_error() {
            return Err(Error::from_response(path, &response));
        }
        match response.status {
            206 => Ok(response.body.to_vec()),
            // Server ignored the Range header and sent everything; slice the
            // requested window out locally.
            200 => {
                let start = (offset as usize).min(response.body.len());
                let stop = (start + len).min(response.body.len());
                Ok(response.body[start..stop].to_vec())
            }
            status => Err(Error::remote(path, status)),
        }
    }

    /// Length of a remote file.
    pub fn metadata(&self, path: &str) -> Result<Metadata> {
        let (url, credentials) = self.resolve(path)?;
        let response = self.simple(Verb::Head, &url, credentials.as_ref());
        if response.is_transport_error() || !matches!(response.status, 200 | 204) {
            return Err(Error::from_response(path, &response));
        }
        Ok(Metadata {
            len: response.content_length().unwrap_or(0),
        })
    }

    /// Whether `path` names an existing file. Collections answer the same
    /// probe, so a directory check keeps them out.
    pub fn exists(&self, path: &str) -> Result<bool> {
        let (url, credentials) = self.resolve(path)?;
        let response = self.simple(Verb::Head, &url, credentials.as_ref());
        if response.is_transport_error() {
            return Err(Error::from_response(path, &response));
        }
        if !matches!(response.status, 200 | 204) {
            return Ok(false);
        }
        Ok(!self.is_dir(path).unwrap_or(false))
    }

    /// Whether `path` names an existing collection; probes the
    /// slash-terminated URL.
    pub fn is_dir(&self, path: &str) -> Result<bool> {
        let (url, credentials) = self.resolve(path)?;
        let mut target = url.http_url();
        if !target.ends_with('/') {
            target.push('/');
        }
        let request =
            with_basic_auth(TransportRequest::new(Verb::Head, target), credentials.as_ref());
        let response = self.executor.execute(&request);
        if response.is_transport_error() {
            return Err(Error::from_response(path, &response));
        }
        Ok(matches!(response.status, 200 | 204))
    }

    /// One-level listing of a collection. The collection's own entry is
    /// omitted; paths are decoded and protocol-relative.
    pub fn list(&self, path: &str) -> Result<Vec<DirectoryEntry>> {
        let (url, credentials) = self.resolve(path)?;
        let mut dir = url.path.clone();
        if !dir.ends_with('/') {
            dir.push('/');
        }
        let target = url.with_path(dir.clone());
        let response = self
            .executor
            .execute(&propfind_request(&target, 1, credentials.as_ref()));
        if !is_listing_success(&response) {
            return Err(Error::from_response(path, &response));
        }
        let body = response.body_text();
        Ok(davfs_path::parse_multistatus(&body)
            .into_iter()
            .map(|entry| DirectoryEntry {
                path: strip_origin(&entry.path).to_string(),
                is_collection: entry.is_collection,
            })
            .filter(|entry| entry.path.trim_end_matches('/') != dir.trim_end_matches('/'))
            .collect())
    }

    /// Expand a glob pattern into matching paths, presented in the same
    /// scheme the pattern used. Patterns without wildcards are returned
    /// untouched.
    pub fn glob(&self, pattern: &str) -> Result<Vec<String>> {
        let (url, credentials) = self.resolve(pattern)?;
        if !has_wildcard(&url.path) {
            return Ok(vec![pattern.to_string()]);
        }
        let resolver = HierarchyResolver::new(&self.executor, credentials.as_ref());
        Ok(resolver
            .resolve(&url)
            .into_iter()
            .map(|entry| entry.path)
            .collect())
    }

    /// Every file under a directory tree, recursively.
    pub fn list_recursive(&self, path: &str) -> Result<Vec<String>> {
        let pattern = format!("{}/**", path.trim_end_matches('/'));
        let (url, credentials) = self.resolve(&pattern)?;
        let resolver = HierarchyResolver::new(&self.executor, credentials.as_ref());
        Ok(resolver
            .resolve(&url)
            .into_iter()
            .filter(|entry| !entry.is_collection)
            .map(|entry| entry.path)
            .collect())
    }

    /// Delete a file or collection.
    pub fn delete(&self, path: &str) -> Result<()> {
        let (url, credentials) = self.resolve(path)?;
        let response = self.simple(Verb::Delete, &url, credentials.as_ref());
        if response.is_transport_error() || !matches!(response.status, 200 | 202 | 204) {
            return Err(Error::from_response(path, &response));
        }
        Ok(())
    }

    /// Server-side rename via MOVE, overwriting any existing destination.
    /// Far cheaper than download-and-reupload for large files.
    pub fn rename(&self, from: &str, to: &str) -> Result<()> {
        let (from_url, credentials) = self.resolve(from)?;
        let to_url = DavUrl::parse(to).map_err(|_| Error::InvalidUrl(to.to_string()))?;
        let request = with_basic_auth(
            TransportRequest::new(Verb::Move, from_url.http_url())
                .header("Destination", to_url.http_url())
                .header("Overwrite", "T"),
            credentials.as_ref(),
        );
        let response = self.executor.execute(&request);
        if response.is_transport_error() || !matches!(response.status, 201 | 204) {
            return Err(Error::from_response(from, &response));
        }
        Ok(())
    }

    /// Create one collection; an already existing one counts as success.
    pub fn create_dir(&self, path: &str) -> Result<()> {
        let (url, credentials) = self.resolve(path)?;
        DirectoryManager::new(&self.executor, credentials.as_ref())
            .create_one(&url)
            .map(|_| ())
    }

    /// Create a collection and all missing ancestors, idempotently.
    pub fn create_dir_all(&self, path: &str) -> Result<()> {
        let (url, credentials) = self.resolve(path)?;
        DirectoryManager::new(&self.executor, credentials.as_ref()).create_recursive(&url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Read,
    Write,
}

/// An open remote file.
///
/// Read handles serve ranged GETs through [`Read`]/[`Seek`]. Write handles
/// accumulate sequential bytes locally and upload the whole content on
/// [`sync`](DavFile::sync) or [`close`](DavFile::close); every sync
/// re-uploads the entire accumulated content, not a delta. Dropping a write
/// handle without closing discards buffered bytes but always removes the
/// staging file.
pub struct DavFile<'fs, T> {
    fs: &'fs DavFs<T>,
    path: String,
    url: DavUrl,
    credentials: Option<Credentials>,
    mode: Mode,
    buffer: Option<WriteBuffer>,
    length: u64,
    position: u64,
}

impl<T> std::fmt::Debug for DavFile<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DavFile")
            .field("path", &self.path)
            .field("url", &self.url)
            .field("mode", &self.mode)
            .field("length", &self.length)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

impl<T: HttpTransport> DavFile<'_, T> {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Remote length for read handles; bytes accepted so far for write
    /// handles.
    pub fn len(&self) -> u64 {
        match self.mode {
            Mode::Read => self.length,
            Mode::Write => self.buffer.as_ref().map_or(0, |b| b.cursor()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Accept the next byte range. `offset` must equal the running total of
    /// bytes written; anything else is rejected before any I/O happens.
    pub fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let Some(buffer) = self.buffer.as_mut() else {
            return Err(Error::UnsupportedOpen {
                path: self.path.clone(),
                reason: "handle is open for reading",
            });
        };
        buffer.write(offset, data)
    }

    /// Upload the entire accumulated content now. May be called repeatedly;
    /// each call re-uploads everything written so far.
    pub fn sync(&mut self) -> Result<()> {
        let Some(buffer) = self.buffer.as_mut() else {
            return Err(Error::UnsupportedOpen {
                path: self.path.clone(),
                reason: "handle is open for reading",
            });
        };
        let engine = CommitEngine::new(&self.fs.executor, &self.fs.config, self.credentials.as_ref());
        let response = engine.commit(buffer, &self.url)?;
        if response.is_transport_error() || !matches!(response.status, 200 | 201 | 204) {
            return Err(Error::from_response(self.path.clone(), &response));
        }
        buffer.mark_clean();
        Ok(())
    }

    /// Commit any unflushed content, then release every local resource,
    /// staging file included. Resources are freed even when the final commit
    /// fails.
    pub fn close(mut self) -> Result<()> {
        self.finish()
    }

    /// Read `len` bytes at `offset` without moving the cursor.
    pub fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        if self.mode != Mode::Read {
            return Err(Error::UnsupportedOpen {
                path: self.path.clone(),
                reason: "handle is open for writing",
            });
        }
        self.fs
            .read_range_at(&self.url, self.credentials.as_ref(), &self.path, offset, len)
    }

    fn finish(&mut self) -> Result<()> {
        let needs_commit = self
            .buffer
            .as_ref()
            .is_some_and(|b| b.is_dirty() || b.is_spilled());
        let result = if needs_commit { self.sync() } else { Ok(()) };
        // Dropping the buffer removes the staging file on every exit path.
        self.buffer = None;
        result
    }
}

impl<T: HttpTransport> Read for DavFile<'_, T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.mode != Mode::Read {
            return Err(io::Error::other("handle is open for writing"));
        }
        if buf.is_empty() || self.position >= self.length {
            return Ok(0);
        }
        let want = buf.len().min((self.length - self.position) as usize);
        let data = self.read_at(self.position, want).map_err(io::Error::other)?;
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        self.position += n as u64;
        Ok(n)
    }
}

impl<T: HttpTransport> Seek for DavFile<'_, T> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
            SeekFrom::End(delta) => self.length.checked_add_signed(delta),
        };
        match target {
            Some(position) => {
                self.position = position;
                Ok(position)
            }
            None => Err(io::Error::other("seek before start of file")),
        }
    }
}

impl<T: HttpTransport> Write for DavFile<'_, T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let offset = self.buffer.as_ref().map_or(0, |b| b.cursor());
        self.write_at(offset, buf).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sync().map_err(io::Error::other)
    }
}
