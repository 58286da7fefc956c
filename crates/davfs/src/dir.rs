//! Remote collection creation.

use davfs_path::{Credentials, DavUrl};
use davfs_transport::{HttpTransport, RequestExecutor, TransportRequest, Verb, with_basic_auth};
use tracing::debug;

use crate::error::{Error, Result};

/// Creates remote collections, one level or a whole ancestor chain.
pub struct DirectoryManager<'a, T> {
    executor: &'a RequestExecutor<T>,
    credentials: Option<&'a Credentials>,
}

impl<'a, T: HttpTransport> DirectoryManager<'a, T> {
    pub fn new(executor: &'a RequestExecutor<T>, credentials: Option<&'a Credentials>) -> Self {
        Self {
            executor,
            credentials,
        }
    }

    /// Create one collection. `201`/`200`/`204` are success and `405` means
    /// it already exists, which is just as good; the returned status lets
    /// callers tell the two apart. `507` is surfaced as quota exhaustion.
    pub fn create_one(&self, url: &DavUrl) -> Result<u16> {
        // Collection URLs are slash-terminated.
        let mut target = url.http_url();
        if !target.ends_with('/') {
            target.push('/');
        }
        let request = with_basic_auth(
            TransportRequest::new(Verb::Mkcol, target),
            self.credentials,
        );
        let response = self.executor.execute(&request);
        let original = url.reconstruct(&url.path);
        if response.is_transport_error() {
            return Err(Error::from_response(original, &response));
        }
        match response.status {
            200 | 201 | 204 | 405 => Ok(response.status),
            status => Err(Error::remote(original, status)),
        }
    }

    /// Create a collection and all of its ancestors, shortest prefix first.
    ///
    /// Pre-existing intermediate collections must not abort the chain, so
    /// every per-level failure is tolerated except quota exhaustion, which
    /// no retry at a deeper level can fix. Repeated calls against a deep
    /// target are idempotent.
    pub fn create_recursive(&self, url: &DavUrl) -> Result<()> {
        let mut accumulated = String::new();
        for segment in url.path.split('/').filter(|s| !s.is_empty()) {
            accumulated.push('/');
            accumulated.push_str(segment);
            let level = url.with_path(accumulated.clone());
            match self.create_one(&level) {
                Ok(_) => {}
                Err(err @ Error::QuotaExhausted { .. }) => return Err(err),
                Err(err) => {
                    debug!(level = %accumulated, %err, "tolerating failure mid-chain");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use davfs_transport::{MockTransport, RetryPolicy};
    use std::sync::Arc;
    use std::time::Duration;

    fn executor(transport: &Arc<MockTransport>) -> RequestExecutor<Arc<MockTransport>> {
        let policy = RetryPolicy::default()
            .max_attempts(1)
            .base_delay(Duration::ZERO);
        RequestExecutor::new(Arc::clone(transport), policy)
    }

    #[test]
    fn creates_each_prefix_shortest_first() {
        let transport = Arc::new(MockTransport::new());
        transport.push_status(405); // /a exists already
        transport.push_status(201);
        transport.push_status(201);

        let executor = executor(&transport);
        let manager = DirectoryManager::new(&executor, None);
        let url = DavUrl::parse("webdav://h/a/b/c").unwrap();
        manager.create_recursive(&url).unwrap();

        let urls: Vec<String> = transport.requests().iter().map(|r| r.url.clone()).collect();
        assert_eq!(urls, ["http://h/a/", "http://h/a/b/", "http://h/a/b/c/"]);
        assert!(transport.requests().iter().all(|r| r.verb == Verb::Mkcol));
    }

    #[test]
    fn already_exists_is_success() {
        let transport = Arc::new(MockTransport::new());
        transport.push_status(405);

        let executor = executor(&transport);
        let manager = DirectoryManager::new(&executor, None);
        let url = DavUrl::parse("webdav://h/a").unwrap();
        assert_eq!(manager.create_one(&url).unwrap(), 405);
    }

    #[test]
    fn quota_exhaustion_aborts_the_chain() {
        let transport = Arc::new(MockTransport::new());
        transport.push_status(405);
        transport.push_status(507);

        let executor = executor(&transport);
        let manager = DirectoryManager::new(&executor, None);
        let url = DavUrl::parse("webdav://h/a/b/c").unwrap();
        match manager.create_recursive(&url) {
            Err(Error::QuotaExhausted { .. }) => {}
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(transport.request_count(), 2);
    }

    #[test]
    fn other_failures_do_not_abort_the_chain() {
        let transport = Arc::new(MockTransport::new());
        transport.push_status(403);
        transport.push_status(201);

        let executor = executor(&transport);
        let manager = DirectoryManager::new(&executor, None);
        let url = DavUrl::parse("webdav://h/a/b").unwrap();
        manager.create_recursive(&url).unwrap();
        assert_eq!(transport.request_count(), 2);
    }
}
