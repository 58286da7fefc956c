use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;

/// HTTP verbs of the WebDAV protocol surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Put,
    Head,
    Delete,
    Propfind,
    Mkcol,
    Move,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Put => "PUT",
            Verb::Head => "HEAD",
            Verb::Delete => "DELETE",
            Verb::Propfind => "PROPFIND",
            Verb::Mkcol => "MKCOL",
            Verb::Move => "MOVE",
        }
    }
}

/// Header multimap: insertion order preserved, duplicate keys allowed,
/// lookups case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// First value recorded under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Body attached to an outgoing request: owned bytes or a staged file
/// streamed with a declared length. The two are mutually exclusive.
#[derive(Debug, Clone, Default)]
pub enum BodySource {
    #[default]
    Empty,
    Memory(Bytes),
    File {
        path: PathBuf,
        len: u64,
    },
}

impl BodySource {
    pub fn len(&self) -> u64 {
        match self {
            BodySource::Empty => 0,
            BodySource::Memory(bytes) => bytes.len() as u64,
            BodySource::File { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One outgoing request. Immutable once built; the transport rebuilds the
/// wire-level body from [`BodySource`] for every attempt, so retries and
/// redirect hops replay the full content.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub verb: Verb,
    pub url: String,
    pub headers: Headers,
    pub body: BodySource,
    pub query: Vec<(String, String)>,
    /// Per-request read-timeout override (large uploads).
    pub timeout: Option<Duration>,
    /// Strip any `Expect: 100-continue` negotiation from the request.
    pub suppress_expect: bool,
}

impl TransportRequest {
    pub fn new(verb: Verb, url: impl Into<String>) -> Self {
        Self {
            verb,
            url: url.into(),
            headers: Headers::new(),
            body: BodySource::Empty,
            query: Vec::new(),
            timeout: None,
            suppress_expect: false,
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn body(mut self, body: BodySource) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn suppress_expect_continue(mut self) -> Self {
        self.suppress_expect = true;
        self
    }

    /// Target URL with query parameters appended, values percent-encoded.
    pub fn url_with_query(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let params: Vec<String> = self
            .query
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect();
        format!("{}?{}", self.url, params.join("&"))
    }
}

/// Normalized outcome of one executed request.
///
/// When the connection itself failed, `error` holds the transport reason and
/// `status` is 0. When the server answered, `status`/`headers`/`body` come
/// from the final hop of the transfer; intermediate redirect hops are
/// discarded. Both fields always exist so callers branch without unwrapping.
#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Bytes,
    pub error: Option<String>,
}

impl TransportResponse {
    pub fn from_error(reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn is_transport_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.status)
    }

    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get("content-length")
            .and_then(|v| v.parse().ok())
    }

    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_are_case_insensitive_multimaps() {
        let mut headers = Headers::new();
        headers.insert("Content-Type", "text/plain");
        headers.insert("Set-Cookie", "a=1");
        headers.insert("Set-Cookie", "b=2");

        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.get("SET-COOKIE"), Some("a=1"));
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn query_values_are_percent_encoded() {
        let request = TransportRequest::new(Verb::Get, "http://h/p")
            .query("name", "a b&c")
            .query("plain", "x");
        assert_eq!(request.url_with_query(), "http://h/p?name=a%20b%26c&plain=x");
    }

    #[test]
    fn url_without_query_is_untouched() {
        let request = TransportRequest::new(Verb::Get, "http://h/p");
        assert_eq!(request.url_with_query(), "http://h/p");
    }

    #[test]
    fn body_source_lengths() {
        assert_eq!(BodySource::Empty.len(), 0);
        assert_eq!(BodySource::Memory(Bytes::from_static(b"abcd")).len(), 4);
        let staged = BodySource::File {
            path: "/tmp/x".into(),
            len: 17,
        };
        assert_eq!(staged.len(), 17);
    }

    #[test]
    fn transport_error_response_has_zero_status() {
        let response = TransportResponse::from_error("connection refused");
        assert!(response.is_transport_error());
        assert!(!response.is_success());
        assert_eq!(response.status, 0);
    }
}
