//! Glob resolution over the remote hierarchy.

use std::collections::HashSet;

use davfs_path::{
    Credentials, DavUrl, DirectoryEntry, GlobPattern, literal_prefix, parse_multistatus,
};
use davfs_transport::{
    HttpTransport, RequestExecutor, TransportRequest, TransportResponse, Verb, with_basic_auth,
};
use tracing::debug;

/// Property request sent with every listing; servers answer with the
/// resource references we extract.
const PROPFIND_BODY: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
     <D:propfind xmlns:D=\"DAV:\">\
     <D:prop><D:resourcetype/><D:getcontentlength/><D:getlastmodified/></D:prop>\
     </D:propfind>";

/// Build a single-level (or self-only) listing request. The protocol has no
/// recursive listing, so deeper traversal is the resolver's job.
pub(crate) fn propfind_request(
    url: &DavUrl,
    depth: u8,
    credentials: Option<&Credentials>,
) -> TransportRequest {
    let request = TransportRequest::new(Verb::Propfind, url.http_url())
        .header("Depth", depth.to_string())
        .header("Content-Type", "application/xml; charset=utf-8")
        .body(davfs_transport::BodySource::Memory(bytes::Bytes::from_static(
            PROPFIND_BODY.as_bytes(),
        )));
    with_basic_auth(request, credentials)
}

/// Statuses under which a listing body is usable. Multi-status is the
/// correct answer; some servers say plain 200.
pub(crate) fn is_listing_success(response: &TransportResponse) -> bool {
    !response.is_transport_error() && matches!(response.status, 207 | 200)
}

/// Translates a glob pattern into the set of matching remote entries.
///
/// The longest literal prefix is listed one level deep; discovered
/// sub-collections are listed the same way, depth-first and sequentially. A
/// level that fails to list contributes nothing rather than failing the
/// resolution. Collected paths are matched segment-wise against the pattern
/// and returned with their URL rebuilt in the caller's original scheme.
pub struct HierarchyResolver<'a, T> {
    executor: &'a RequestExecutor<T>,
    credentials: Option<&'a Credentials>,
}

impl<'a, T: HttpTransport> HierarchyResolver<'a, T> {
    pub fn new(executor: &'a RequestExecutor<T>, credentials: Option<&'a Credentials>) -> Self {
        Self {
            executor,
            credentials,
        }
    }

    pub fn resolve(&self, pattern_url: &DavUrl) -> Vec<DirectoryEntry> {
        let prefix = literal_prefix(&pattern_url.path).to_string();
        let pattern = GlobPattern::new(&pattern_url.path);
        let mut entries = Vec::new();
        let mut visited = HashSet::new();
        self.collect(pattern_url, &prefix, &mut visited, &mut entries);
        entries
            .into_iter()
            .filter(|entry| pattern.matches(entry.path.trim_end_matches('/')))
            .map(|entry| DirectoryEntry {
                path: pattern_url.reconstruct(&entry.path),
                is_collection: entry.is_collection,
            })
            .collect()
    }

    fn collect(
        &self,
        base: &DavUrl,
        dir: &str,
        visited: &mut HashSet<String>,
        out: &mut Vec<DirectoryEntry>,
    ) {
        // The remote hierarchy is expected to be acyclic, but a server-side
        // symbolic collection could loop; the visited set bounds traversal
        // and also skips the self-entry every listing contains.
        if !visited.insert(dir.trim_end_matches('/').to_string()) {
            return;
        }
        let url = base.with_path(dir);
        let response = self
            .executor
            .execute(&propfind_request(&url, 1, self.credentials));
        if !is_listing_success(&response) {
            debug!(
                dir,
                status = response.status,
                "listing failed; treating level as empty"
            );
            return;
        }
        let body = response.body_text();
        for entry in parse_multistatus(&body) {
            let path = strip_origin(&entry.path).to_string();
            if entry.is_collection {
                // Covers the listing's own entry and anything already
                // reached through another route.
                if visited.contains(path.trim_end_matches('/')) {
                    continue;
                }
                out.push(DirectoryEntry {
                    path: path.clone(),
                    is_collection: true,
                });
                self.collect(base, &path, visited, out);
            } else {
                out.push(DirectoryEntry {
                    path,
                    is_collection: false,
                });
            }
        }
    }
}

/// Listing references may be absolute URIs; matching works on the
/// protocol-relative path.
pub(crate) fn strip_origin(reference: &str) -> &str {
    let stripped = reference
        .strip_prefix("http://")
        .or_else(|| reference.strip_prefix("https://"));
    match stripped {
        Some(rest) => match rest.find('/') {
            Some(slash) => &rest[slash..],
            None => "/",
        },
        None => reference,
    }
}
