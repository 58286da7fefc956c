use davfs_transport::{TransportError, TransportResponse};
use thiserror::Error;

/// Failures surfaced at the operation boundary, each carrying the logical
/// path it concerns.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid WebDAV URL: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    ClientInit(#[from] TransportError),

    /// Connection-level failure that survived the retry policy.
    #[error("request to {path} failed: {reason}")]
    Transport { path: String, reason: String },

    /// The server answered with a non-success status.
    #[error("remote operation on {path} failed: HTTP {status}{advice}")]
    RemoteStatus {
        path: String,
        status: u16,
        advice: &'static str,
    },

    /// The server reported insufficient storage (HTTP 507). Kept distinct
    /// from other statuses: it is never transient and must not be swallowed
    /// by recursive directory creation.
    #[error("storage quota exhausted at {path}: free up space or resize the storage (HTTP 507)")]
    QuotaExhausted { path: String },

    #[error("non-sequential write: expected offset {expected}, got {got}")]
    OutOfOrderWrite { expected: u64, got: u64 },

    /// Staging-file creation or I/O failed. A local environment problem,
    /// never retried.
    #[error("staging file I/O failed: {0}")]
    Staging(#[source] std::io::Error),

    #[error("cannot open {path}: {reason}")]
    UnsupportedOpen { path: String, reason: &'static str },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn remote(path: impl Into<String>, status: u16) -> Self {
        let path = path.into();
        if status == 507 {
            return Error::QuotaExhausted { path };
        }
        Error::RemoteStatus {
            path,
            status,
            advice: status_advice(status),
        }
    }

    /// Map a settled transport outcome to a boundary error.
    pub(crate) fn from_response(path: impl Into<String>, response: &TransportResponse) -> Self {
        match &response.error {
            Some(reason) => Error::Transport {
                path: path.into(),
                reason: reason.clone(),
            },
            None => Self::remote(path, response.status),
        }
    }
}

/// Actionable guidance for the statuses users actually run into.
fn status_advice(status: u16) -> &'static str {
    match status {
        401 => "; authentication failed, check the username and password of your WebDAV credentials",
        403 => "; access forbidden, check that WebDAV is enabled and the path is within your allowed scope",
        404 => "; not found, for writes the parent directory must exist",
        405 => "; method not allowed, the server may not support this WebDAV operation",
        409 => "; conflict, create the parent directory first",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_507_becomes_the_quota_variant() {
        match Error::remote("/a", 507) {
            Error::QuotaExhausted { path } => assert_eq!(path, "/a"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn advice_is_attached_to_known_statuses() {
        let err = Error::remote("webdav://h/a", 401);
        assert!(err.to_string().contains("HTTP 401"));
        assert!(err.to_string().contains("credentials"));

        let err = Error::remote("webdav://h/a", 418);
        assert!(err.to_string().ends_with("HTTP 418"));
    }

    #[test]
    fn transport_outcomes_keep_their_reason() {
        let response = TransportResponse::from_error("connection refused");
        let err = Error::from_response("/a", &response);
        assert!(err.to_string().contains("connection refused"));
    }
}
