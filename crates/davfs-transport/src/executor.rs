use std::sync::Arc;
use std::thread;

use tracing::{debug, warn};

use crate::request::{TransportRequest, TransportResponse};
use crate::retry::{RetryPolicy, is_retryable_status};

/// One attempt at performing a request.
///
/// Implementations follow redirects themselves and expose only the final
/// hop's status and headers. Connection-level failures become an error
/// string on the response rather than an `Err`, so the retry loop can treat
/// every outcome uniformly.
pub trait HttpTransport {
    fn perform(&self, request: &TransportRequest) -> TransportResponse;
}

impl<T: HttpTransport + ?Sized> HttpTransport for &T {
    fn perform(&self, request: &TransportRequest) -> TransportResponse {
        (**self).perform(request)
    }
}

impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    fn perform(&self, request: &TransportRequest) -> TransportResponse {
        (**self).perform(request)
    }
}

enum Attempt {
    /// Transport ok, status outside the retryable set. Covers successes and
    /// terminal error statuses alike; both return immediately.
    Settled,
    /// Connection could not be established or broke mid-transfer.
    RetryableTransport,
    /// Server answered with a transient status (429/5xx subset).
    RetryableStatus,
}

fn classify(response: &TransportResponse) -> Attempt {
    if response.is_transport_error() {
        Attempt::RetryableTransport
    } else if is_retryable_status(response.status) {
        Attempt::RetryableStatus
    } else {
        Attempt::Settled
    }
}

/// Issues requests through a transport, absorbing transient failures with
/// bounded exponential backoff.
///
/// Callers only ever see a settled response or, after retries are exhausted,
/// the last failing outcome; execution never panics on remote failure. Each
/// attempt performs the request from scratch, so any partial per-attempt
/// accumulation is discarded while the request itself (headers included) is
/// reused verbatim.
pub struct RequestExecutor<T> {
    transport: T,
    policy: RetryPolicy,
}

impl<T: HttpTransport> RequestExecutor<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn execute(&self, request: &TransportRequest) -> TransportResponse {
        let attempts = self.policy.max_attempts.max(1);
        let mut response = TransportResponse::default();
        for attempt in 0..attempts {
            response = self.transport.perform(request);
            match classify(&response) {
                Attempt::Settled => {
                    if attempt > 0 {
                        debug!(
                            url = %request.url,
                            attempts = attempt + 1,
                            status = response.status,
                            "request settled after retries"
                        );
                    }
                    return response;
                }
                outcome => {
                    let reason = retry_reason(&outcome, &response);
                    if attempt + 1 >= attempts {
                        warn!(url = %request.url, attempts, reason = %reason, "retries exhausted");
                        return response;
                    }
                    let delay = self.policy.delay_for_attempt(attempt);
                    debug!(
                        url = %request.url,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        reason = %reason,
                        "retrying request"
                    );
                    thread::sleep(delay);
                }
            }
        }
        response
    }
}

fn retry_reason(outcome: &Attempt, response: &TransportResponse) -> String {
    match outcome {
        Attempt::RetryableTransport => response
            .error
            .clone()
            .unwrap_or_else(|| "transport error".to_string()),
        _ => format!("HTTP {}", response.status),
    }
}
