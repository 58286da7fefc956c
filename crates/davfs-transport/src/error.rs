use thiserror::Error;

/// Failures below the verb layer.
///
/// Connection failures during a transfer are deliberately *not* represented
/// here; they surface as [`crate::TransportResponse::error`] so the retry
/// loop can classify them. What remains are programming-contract and
/// environment problems that no amount of retrying fixes.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to initialize HTTP client: {0}")]
    ClientInit(String),

    #[error("malformed request: {0}")]
    MalformedRequest(String),
}
