use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use davfs_path::Credentials;

use crate::request::TransportRequest;

/// Basic-Authentication header value for a credential pair.
pub fn basic_auth_value(credentials: &Credentials) -> String {
    let raw = format!("{}:{}", credentials.username, credentials.password);
    format!("Basic {}", STANDARD.encode(raw))
}

/// Attach Basic auth when credentials are present and non-empty.
#[must_use]
pub fn with_basic_auth(
    request: TransportRequest,
    credentials: Option<&Credentials>,
) -> TransportRequest {
    match credentials {
        Some(credentials) if !credentials.is_empty() => {
            request.header("Authorization", basic_auth_value(credentials))
        }
        _ => request,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Verb;

    #[test]
    fn encodes_the_pair_as_base64() {
        let value = basic_auth_value(&Credentials::new("user", "pass"));
        assert_eq!(value, "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn empty_credentials_add_no_header() {
        let request = TransportRequest::new(Verb::Get, "http://h/p");
        let request = with_basic_auth(request, Some(&Credentials::default()));
        assert!(!request.headers.contains("authorization"));

        let request = TransportRequest::new(Verb::Get, "http://h/p");
        let request = with_basic_auth(request, None);
        assert!(!request.headers.contains("authorization"));
    }

    #[test]
    fn present_credentials_add_the_header() {
        let request = TransportRequest::new(Verb::Get, "http://h/p");
        let request = with_basic_auth(request, Some(&Credentials::new("u", "p")));
        assert_eq!(request.headers.get("Authorization"), Some("Basic dTpw"));
    }
}
