//! Upload of a write buffer's content with a single PUT.

use bytes::Bytes;
use davfs_path::{Credentials, DavUrl};
use davfs_transport::{
    BodySource, HttpTransport, RequestExecutor, TransportRequest, TransportResponse, Verb,
    with_basic_auth,
};
use tracing::debug;

use crate::config::DavConfig;
use crate::dir::DirectoryManager;
use crate::error::Result;
use crate::write_buffer::{UploadSource, WriteBuffer};

/// Drives the PUT that commits a [`WriteBuffer`].
///
/// A failing status of 400, 404 or 409 usually means the parent collection
/// is missing; the engine then creates the full ancestor chain and retries
/// the PUT exactly once. Failures during that directory creation are
/// swallowed so the original upload error is what callers see.
pub struct CommitEngine<'a, T> {
    executor: &'a RequestExecutor<T>,
    config: &'a DavConfig,
    credentials: Option<&'a Credentials>,
}

impl<'a, T: HttpTransport> CommitEngine<'a, T> {
    pub fn new(
        executor: &'a RequestExecutor<T>,
        config: &'a DavConfig,
        credentials: Option<&'a Credentials>,
    ) -> Self {
        Self {
            executor,
            config,
            credentials,
        }
    }

    /// Upload the buffer's full content to `url` and return the final
    /// response. The caller decides how to report non-success statuses.
    pub fn commit(&self, buffer: &mut WriteBuffer, url: &DavUrl) -> Result<TransportResponse> {
        let response = self.put(buffer, url)?;
        if !matches!(response.status, 400 | 404 | 409) || response.is_transport_error() {
            return Ok(response);
        }
        let Some(parent) = url.parent() else {
            return Ok(response);
        };
        debug!(
            status = response.status,
            parent = %parent.path,
            "upload rejected; creating parent collections and retrying once"
        );
        let directories = DirectoryManager::new(self.executor, self.credentials);
        if let Err(err) = directories.create_recursive(&parent) {
            debug!(%err, "parent creation failed; keeping original upload error");
            return Ok(response);
        }
        self.put(buffer, url)
    }

    fn put(&self, buffer: &mut WriteBuffer, url: &DavUrl) -> Result<TransportResponse> {
        let source = buffer.materialize()?;
        let len = source.len();
        let body = match source {
            UploadSource::Memory(bytes) => BodySource::Memory(Bytes::copy_from_slice(bytes)),
            UploadSource::Staged { path, len } => BodySource::File {
                path: path.to_path_buf(),
                len,
            },
        };
        let mut request = TransportRequest::new(Verb::Put, url.http_url())
            .header("Content-Type", "application/octet-stream")
            .body(body);
        if len > self.config.large_upload_threshold {
            debug!(
                bytes = len,
                "large upload: suppressing Expect negotiation, extending timeout"
            );
            request = request
                .suppress_expect_continue()
                .timeout(self.config.large_upload_timeout);
        }
        let request = with_basic_auth(request, self.credentials);
        Ok(self.executor.execute(&request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use davfs_transport::{MockTransport, RetryPolicy};
    use std::sync::Arc;
    use std::time::Duration;

    fn setup() -> (Arc<MockTransport>, RequestExecutor<Arc<MockTransport>>) {
        let transport = Arc::new(MockTransport::new());
        let policy = RetryPolicy::default()
            .max_attempts(1)
            .base_delay(Duration::ZERO);
        let executor = RequestExecutor::new(Arc::clone(&transport), policy);
        (transport, executor)
    }

    #[test]
    fn in_memory_content_is_put_once() {
        let config = DavConfig::default();
        let (transport, executor) = setup();
        transport.push_status(201);

        let engine = CommitEngine::new(&executor, &config, None);
        let mut buffer = WriteBuffer::new(1024);
        buffer.write(0, b"0123456789").unwrap();
        buffer.write(10, b"abcde").unwrap();

        let url = DavUrl::parse("webdav://h/dir/file.bin").unwrap();
        let response = engine.commit(&mut buffer, &url).unwrap();
        assert_eq!(response.status, 201);

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].verb, Verb::Put);
        assert_eq!(requests[0].body.len(), 15);
        assert_eq!(
            requests[0].headers.get("content-type"),
            Some("application/octet-stream")
        );
    }

    #[test]
    fn missing_parent_triggers_mkcol_chain_and_one_retry() {
        let config = DavConfig::default();
        let (transport, executor) = setup();
        transport.push_status(404); // PUT
        transport.push_status(201); // MKCOL /dir
        transport.push_status(201); // retried PUT

        let engine = CommitEngine::new(&executor, &config, None);
        let mut buffer = WriteBuffer::new(1024);
        buffer.write(0, b"data").unwrap();

        let url = DavUrl::parse("webdav://h/dir/file.bin").unwrap();
        let response = engine.commit(&mut buffer, &url).unwrap();
        assert_eq!(response.status, 201);

        let verbs: Vec<Verb> = transport.requests().iter().map(|r| r.verb).collect();
        assert_eq!(verbs, [Verb::Put, Verb::Mkcol, Verb::Put]);
        assert_eq!(
            transport
                .requests()
                .iter()
                .filter(|r| r.verb == Verb::Put)
                .count(),
            2
        );
    }

    #[test]
    fn directory_failure_surfaces_the_original_upload_error() {
        let config = DavConfig::default();
        let (transport, executor) = setup();
        transport.push_status(409); // PUT
        transport.push_status(507); // MKCOL: quota

        let engine = CommitEngine::new(&executor, &config, None);
        let mut buffer = WriteBuffer::new(1024);
        buffer.write(0, b"data").unwrap();

        let url = DavUrl::parse("webdav://h/dir/file.bin").unwrap();
        let response = engine.commit(&mut buffer, &url).unwrap();
        assert_eq!(response.status, 409);
        assert_eq!(transport.request_count(), 2);
    }

    #[test]
    fn large_uploads_extend_timeout_and_suppress_expect() {
        let config = DavConfig::default().large_upload_threshold(4);
        let (transport, executor) = setup();
        transport.push_status(200);

        let engine = CommitEngine::new(&executor, &config, None);
        let mut buffer = WriteBuffer::new(1024);
        buffer.write(0, b"larger than four").unwrap();

        let url = DavUrl::parse("webdav://h/f").unwrap();
        engine.commit(&mut buffer, &url).unwrap();

        let requests = transport.requests();
        assert!(requests[0].suppress_expect);
        assert_eq!(requests[0].timeout, Some(config.large_upload_timeout));
    }

    #[test]
    fn small_uploads_keep_default_timeout() {
        let config = DavConfig::default();
        let (transport, executor) = setup();
        transport.push_status(200);

        let engine = CommitEngine::new(&executor, &config, None);
        let mut buffer = WriteBuffer::new(1024);
        buffer.write(0, b"tiny").unwrap();

        let url = DavUrl::parse("webdav://h/f").unwrap();
        engine.commit(&mut buffer, &url).unwrap();

        let requests = transport.requests();
        assert!(!requests[0].suppress_expect);
        assert_eq!(requests[0].timeout, None);
    }

    #[test]
    fn spilled_content_is_streamed_from_the_staging_file() {
        let config = DavConfig::default();
        let (transport, executor) = setup();
        transport.push_status(201);

        let engine = CommitEngine::new(&executor, &config, None);
        let mut buffer = WriteBuffer::new(4);
        buffer.write(0, b"0123").unwrap();
        buffer.write(4, b"4567").unwrap();
        assert!(buffer.is_spilled());

        let url = DavUrl::parse("webdav://h/f").unwrap();
        engine.commit(&mut buffer, &url).unwrap();

        let requests = transport.requests();
        match &requests[0].body {
            BodySource::File { len, .. } => assert_eq!(*len, 8),
            other => panic!("expected staged body, got {other:?}"),
        }
    }
}
