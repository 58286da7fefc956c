//! Resilient HTTP request execution for the WebDAV filesystem.
//!
//! Every remote operation goes through [`RequestExecutor`], which absorbs
//! transient connection and server failures with bounded exponential
//! backoff. The executor is generic over an [`HttpTransport`] capability so
//! the whole stack above it can be exercised against a scripted transport;
//! [`ReqwestTransport`] is the production implementation.

mod auth;
mod client;
mod error;
mod executor;
mod headers;
mod mock;
mod request;
mod retry;

pub use auth::{basic_auth_value, with_basic_auth};
pub use client::ReqwestTransport;
pub use error::TransportError;
pub use executor::{HttpTransport, RequestExecutor};
pub use headers::HeaderCollector;
pub use mock::MockTransport;
pub use request::{BodySource, Headers, TransportRequest, TransportResponse, Verb};
pub use retry::{RetryPolicy, is_retryable_status};
