//! In-memory/staged-file duality for one open-for-write resource.

use std::io::Write as _;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug)]
enum Store {
    Memory(Vec<u8>),
    Spilled { file: NamedTempFile, len: u64 },
}

/// Accumulated content of one open-for-write resource.
///
/// Bytes collect in memory until the spill threshold would be crossed, then
/// move to a securely named staging file; the transition is one-way and
/// further writes append to the file. Writes must be offset-contiguous: the
/// cursor always equals the total bytes accepted so far and a mismatched
/// offset is rejected before any disk or network I/O. The staging file is
/// removed when the buffer is dropped, on every exit path.
#[derive(Debug)]
pub struct WriteBuffer {
    store: Store,
    cursor: u64,
    spill_threshold: u64,
    dirty: bool,
}

/// View of the accumulated content, ready for upload: either the in-memory
/// bytes or the staging file with its length. Obtaining it is idempotent.
#[derive(Debug)]
pub enum UploadSource<'a> {
    Memory(&'a [u8]),
    Staged { path: &'a Path, len: u64 },
}

impl UploadSource<'_> {
    pub fn len(&self) -> u64 {
        match self {
            UploadSource::Memory(bytes) => bytes.len() as u64,
            UploadSource::Staged { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl WriteBuffer {
    pub fn new(spill_threshold: u64) -> Self {
        Self {
            store: Store::Memory(Vec::new()),
            cursor: 0,
            spill_threshold,
            dirty: false,
        }
    }

    /// Total bytes accepted so far; the only offset the next write may use.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn is_spilled(&self) -> bool {
        matches!(self.store, Store::Spilled { .. })
    }

    /// Whether content has been accepted since the last commit.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Accept the next sequential byte range.
    pub fn write(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        if offset != self.cursor {
            return Err(Error::OutOfOrderWrite {
                expected: self.cursor,
                got: offset,
            });
        }
        if let Store::Memory(buf) = &self.store {
            if (buf.len() + data.len()) as u64 > self.spill_threshold {
                self.spill()?;
            }
        }
        match &mut self.store {
            Store::Memory(buf) => buf.extend_from_slice(data),
            Store::Spilled { file, len } => {
                file.write_all(data).map_err(Error::Staging)?;
                *len += data.len() as u64;
            }
        }
        self.cursor += data.len() as u64;
        self.dirty = true;
        Ok(())
    }

    fn spill(&mut self) -> Result<()> {
        let Store::Memory(buf) = &mut self.store else {
            return Ok(());
        };
        let mut file = tempfile::Builder::new()
            .prefix("davfs-upload-")
            .tempfile()
            .map_err(Error::Staging)?;
        file.write_all(buf).map_err(Error::Staging)?;
        debug!(
            staging = %file.path().display(),
            buffered = buf.len(),
            "write buffer spilled to staging file"
        );
        let len = buf.len() as u64;
        self.store = Store::Spilled { file, len };
        Ok(())
    }

    /// The accumulated content, for upload. May be called repeatedly; the
    /// content stays owned by the buffer until it is dropped.
    pub fn materialize(&mut self) -> Result<UploadSource<'_>> {
        match &mut self.store {
            Store::Memory(buf) => Ok(UploadSource::Memory(buf)),
            Store::Spilled { file, len } => {
                file.flush().map_err(Error::Staging)?;
                Ok(UploadSource::Staged {
                    path: file.path(),
                    len: *len,
                })
            }
        }
    }

    /// Path of the staging file, if spilled.
    pub fn staging_path(&self) -> Option<&Path> {
        match &self.store {
            Store::Memory(_) => None,
            Store::Spilled { file, .. } => Some(file.path()),
        }
    }

    /// Discard everything, removing any staging file.
    pub fn abort(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(buffer: &mut WriteBuffer) -> Vec<u8> {
        match buffer.materialize().unwrap() {
            UploadSource::Memory(bytes) => bytes.to_vec(),
            UploadSource::Staged { path, len } => {
                let data = std::fs::read(path).unwrap();
                assert_eq!(data.len() as u64, len);
                data
            }
        }
    }

    #[test]
    fn sequential_writes_concatenate_in_memory() {
        let mut buffer = WriteBuffer::new(1024);
        buffer.write(0, b"hello ").unwrap();
        buffer.write(6, b"world").unwrap();

        assert_eq!(buffer.cursor(), 11);
        assert!(!buffer.is_spilled());
        assert_eq!(content(&mut buffer), b"hello world");
    }

    #[test]
    fn out_of_order_writes_are_rejected_before_any_io() {
        let mut buffer = WriteBuffer::new(1024);
        buffer.write(0, b"abc").unwrap();

        match buffer.write(5, b"xyz") {
            Err(Error::OutOfOrderWrite { expected, got }) => {
                assert_eq!(expected, 3);
                assert_eq!(got, 5);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        // Rejection leaves the buffer untouched.
        assert_eq!(buffer.cursor(), 3);
        assert_eq!(content(&mut buffer), b"abc");
    }

    #[test]
    fn crossing_the_threshold_spills_to_disk() {
        let mut buffer = WriteBuffer::new(10);
        buffer.write(0, b"123456").unwrap();
        assert!(!buffer.is_spilled());

        // 6 + 6 > 10: earlier writes land in the staging file, this one is
        // appended to it.
        buffer.write(6, b"789abc").unwrap();
        assert!(buffer.is_spilled());
        let staging = buffer.staging_path().unwrap().to_path_buf();
        assert!(staging.exists());

        buffer.write(12, b"tail").unwrap();
        assert_eq!(content(&mut buffer), b"123456789abctail");
    }

    #[test]
    fn spilled_and_in_memory_content_are_equivalent() {
        let writes: [&[u8]; 3] = [b"aaaa", b"bbbbbb", b"cc"];

        let mut small = WriteBuffer::new(5);
        let mut large = WriteBuffer::new(1024);
        let mut offset = 0;
        for data in writes {
            small.write(offset, data).unwrap();
            large.write(offset, data).unwrap();
            offset += data.len() as u64;
        }

        assert!(small.is_spilled());
        assert!(!large.is_spilled());
        assert_eq!(content(&mut small), content(&mut large));
    }

    #[test]
    fn exact_threshold_stays_in_memory() {
        let mut buffer = WriteBuffer::new(8);
        buffer.write(0, b"12345678").unwrap();
        assert!(!buffer.is_spilled());
    }

    #[test]
    fn drop_removes_the_staging_file() {
        let mut buffer = WriteBuffer::new(1);
        buffer.write(0, b"spill me").unwrap();
        let staging = buffer.staging_path().unwrap().to_path_buf();
        assert!(staging.exists());

        drop(buffer);
        assert!(!staging.exists());
    }

    #[test]
    fn materialize_is_idempotent() {
        let mut buffer = WriteBuffer::new(4);
        buffer.write(0, b"abcdef").unwrap();
        assert_eq!(content(&mut buffer), b"abcdef");
        assert_eq!(content(&mut buffer), b"abcdef");
        assert_eq!(buffer.cursor(), 6);
    }
}
