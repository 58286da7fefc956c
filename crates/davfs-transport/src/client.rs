//! Blocking transport backed by a process-shared reqwest client.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use reqwest::Method;
use reqwest::blocking::{Body, Client};
use reqwest::header::LOCATION;
use tracing::debug;

use crate::error::TransportError;
use crate::executor::HttpTransport;
use crate::headers::HeaderCollector;
use crate::request::{BodySource, TransportRequest, TransportResponse};

/// Redirect chains longer than this are reported as a transport failure.
const MAX_REDIRECT_HOPS: usize = 10;

static SHARED_CLIENT: OnceLock<Client> = OnceLock::new();
static CLIENT_HANDLES: AtomicUsize = AtomicUsize::new(0);

/// Acquire the process-wide client, building it on first use.
///
/// The client owns TLS state and a connection pool shared by every handle in
/// the process. Acquisitions are counted but never released: tearing the
/// pool down while another handle still uses it breaks in-flight transfers,
/// so the client lives for the remainder of the process. Redundant
/// acquisition is cheap; the timeouts of the first successful build win.
fn acquire_shared_client(
    connect_timeout: Duration,
    read_timeout: Duration,
) -> Result<Client, TransportError> {
    if let Some(client) = SHARED_CLIENT.get() {
        CLIENT_HANDLES.fetch_add(1, Ordering::Relaxed);
        return Ok(client.clone());
    }
    // Redirects are followed manually so every hop feeds the header
    // collector and upload bodies can be replayed from their source.
    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .connect_timeout(connect_timeout)
        .timeout(read_timeout)
        .build()
        .map_err(|e| TransportError::ClientInit(e.to_string()))?;
    CLIENT_HANDLES.fetch_add(1, Ordering::Relaxed);
    // A racing thread may have initialized first; its client wins and the
    // extra one is dropped.
    Ok(SHARED_CLIENT.get_or_init(|| client).clone())
}

/// Production [`HttpTransport`] over blocking reqwest.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, TransportError> {
        Ok(Self {
            client: acquire_shared_client(connect_timeout, read_timeout)?,
        })
    }

    /// Handles acquired over the process lifetime. Teardown is deliberately
    /// never performed, so this only ever grows.
    pub fn handle_count() -> usize {
        CLIENT_HANDLES.load(Ordering::Relaxed)
    }

    fn build_body(body: &BodySource) -> std::io::Result<Option<Body>> {
        match body {
            BodySource::Empty => Ok(None),
            BodySource::Memory(bytes) => Ok(Some(Body::from(bytes.to_vec()))),
            BodySource::File { path, len } => {
                let file = std::fs::File::open(path)?;
                Ok(Some(Body::sized(file, *len)))
            }
        }
    }
}

impl HttpTransport for ReqwestTransport {
    fn perform(&self, request: &TransportRequest) -> TransportResponse {
        let method = match Method::from_bytes(request.verb.as_str().as_bytes()) {
            Ok(method) => method,
            Err(e) => return TransportResponse::from_error(format!("invalid method: {e}")),
        };

        let mut collector = HeaderCollector::new();
        let mut url = request.url_with_query();
        for hop in 0..MAX_REDIRECT_HOPS {
            let mut builder = self.client.request(method.clone(), &url);
            for (name, value) in request.headers.iter() {
                if request.suppress_expect && name.eq_ignore_ascii_case("expect") {
                    continue;
                }
                builder = builder.header(name, value);
            }
            if let Some(timeout) = request.timeout {
                builder = builder.timeout(timeout);
            }
            match Self::build_body(&request.body) {
                Ok(Some(body)) => builder = builder.body(body),
                Ok(None) => {}
                Err(e) => {
                    return TransportResponse::from_error(format!(
                        "upload source unavailable: {e}"
                    ));
                }
            }

            let response = match builder.send() {
                Ok(response) => response,
                Err(e) => return TransportResponse::from_error(transport_reason(&e)),
            };

            let status = response.status().as_u16();
            collector.start_hop(status);
            for (name, value) in response.headers() {
                collector.header(name.as_str(), value.to_str().unwrap_or(""));
            }

            if response.status().is_redirection() {
                if let Some(location) = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                {
                    debug!(from = %url, to = location, hop, "following redirect");
                    url = absolutize(&url, location);
                    continue;
                }
                // Redirect status without a target: expose it as the final
                // answer rather than guessing.
            }

            let body = match response.bytes() {
                Ok(body) => body,
                Err(e) => return TransportResponse::from_error(transport_reason(&e)),
            };
            let (status, headers) = match collector.into_final() {
                Some(final_hop) => final_hop,
                None => return TransportResponse::from_error("no status line observed"),
            };
            return TransportResponse {
                status,
                headers,
                body,
                error: None,
            };
        }
        TransportResponse::from_error(format!(
            "redirect loop detected (more than {MAX_REDIRECT_HOPS} redirects)"
        ))
    }
}

fn transport_reason(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("operation timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}

/// Resolve a Location header against the URL of the hop that produced it.
fn absolutize(current: &str, location: &str) -> String {
    if location.starts_with("http://") || location.starts_with("https://") {
        return location.to_string();
    }
    let origin_end = current
        .find("://")
        .map(|i| i + 3)
        .and_then(|start| current[start..].find('/').map(|i| start + i))
        .unwrap_or(current.len());
    if location.starts_with('/') {
        return format!("{}{}", &current[..origin_end], location);
    }
    // Relative reference: replace the last path component.
    match current.rfind('/') {
        Some(cut) if cut >= origin_end => format!("{}/{}", &current[..cut], location),
        _ => format!("{}/{}", &current[..origin_end], location),
    }
}
