use std::time::Duration;

use davfs_transport::RetryPolicy;

/// Writes buffered beyond this many bytes spill to a staging file (50 MiB).
pub const DEFAULT_SPILL_THRESHOLD: u64 = 50 * 1024 * 1024;

/// Uploads larger than this get the large-upload treatment (10 MiB): the
/// `Expect: 100-continue` negotiation is suppressed and the read timeout is
/// extended, since some servers mishandle the negotiation for big bodies.
pub const DEFAULT_LARGE_UPLOAD_THRESHOLD: u64 = 10 * 1024 * 1024;

/// Read timeout applied to large uploads (10 minutes). The default timeout
/// is far too short for multi-hundred-MB bodies.
pub const DEFAULT_LARGE_UPLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Client-wide configuration, fixed at construction.
///
/// # Examples
///
/// ```
/// use davfs::DavConfig;
/// use std::time::Duration;
///
/// let config = DavConfig::default()
///     .spill_threshold(8 * 1024 * 1024)
///     .read_timeout(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct DavConfig {
    /// Retry/backoff policy shared by every request.
    pub retry: RetryPolicy,
    /// In-memory write-buffer limit before spilling to disk.
    pub spill_threshold: u64,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub large_upload_threshold: u64,
    pub large_upload_timeout: Duration,
}

impl Default for DavConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            spill_threshold: DEFAULT_SPILL_THRESHOLD,
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(30),
            large_upload_threshold: DEFAULT_LARGE_UPLOAD_THRESHOLD,
            large_upload_timeout: DEFAULT_LARGE_UPLOAD_TIMEOUT,
        }
    }
}

impl DavConfig {
    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn spill_threshold(mut self, spill_threshold: u64) -> Self {
        self.spill_threshold = spill_threshold;
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    #[must_use]
    pub fn read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    #[must_use]
    pub fn large_upload_threshold(mut self, large_upload_threshold: u64) -> Self {
        self.large_upload_threshold = large_upload_threshold;
        self
    }

    #[must_use]
    pub fn large_upload_timeout(mut self, large_upload_timeout: Duration) -> Self {
        self.large_upload_timeout = large_upload_timeout;
        self
    }
}
