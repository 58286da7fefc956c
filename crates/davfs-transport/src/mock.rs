//! Scripted transport for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use bytes::Bytes;

use crate::executor::HttpTransport;
use crate::request::{Headers, TransportRequest, TransportResponse};

/// Pops canned outcomes in order and records every request it sees.
///
/// When the script runs dry it answers 404, so a missing expectation shows
/// up as an assertion failure rather than a hang.
#[derive(Debug, Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<TransportResponse>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: TransportResponse) {
        self.script.lock().unwrap().push_back(response);
    }

    pub fn push_status(&self, status: u16) {
        self.push(TransportResponse {
            status,
            ..TransportResponse::default()
        });
    }

    pub fn push_body(&self, status: u16, body: &str) {
        self.push(TransportResponse {
            status,
            body: Bytes::from(body.to_string()),
            ..TransportResponse::default()
        });
    }

    pub fn push_headers(&self, status: u16, headers: Headers) {
        self.push(TransportResponse {
            status,
            headers,
            ..TransportResponse::default()
        });
    }

    pub fn push_error(&self, reason: &str) {
        self.push(TransportResponse::from_error(reason));
    }

    /// Everything performed so far, in order.
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl HttpTransport for MockTransport {
    fn perform(&self, request: &TransportRequest) -> TransportResponse {
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| TransportResponse {
                status: 404,
                ..TransportResponse::default()
            })
    }
}
