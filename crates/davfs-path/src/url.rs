use thiserror::Error;

/// Domain the `storagebox://` shorthand expands to.
pub const STORAGE_BOX_DOMAIN: &str = "your-storagebox.de";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid WebDAV URL: {0}")]
pub struct ParseUrlError(pub String);

/// The scheme a logical path was given in.
///
/// The original spelling is remembered so results (glob matches, listings)
/// can be presented back in the same form the caller used, and so credential
/// scoping keyed on the user-facing URL keeps working after translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DavScheme {
    /// `webdav://host/path`, sent over plaintext HTTP.
    Webdav,
    /// `webdavs://host/path`, sent over TLS.
    Webdavs,
    /// `storagebox://<account>/path`, provider shorthand for
    /// `https://<account>.your-storagebox.de/path`.
    StorageBox { account: String },
    /// Plain `http://` URL pointing at a WebDAV server.
    Http,
    /// Plain `https://` URL pointing at a WebDAV server.
    Https,
}

impl DavScheme {
    /// Scheme used on the wire.
    pub fn http_scheme(&self) -> &'static str {
        match self {
            DavScheme::Webdav | DavScheme::Http => "http",
            DavScheme::Webdavs | DavScheme::StorageBox { .. } | DavScheme::Https => "https",
        }
    }
}

/// A logical path resolved to `{scheme, host, path}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DavUrl {
    pub scheme: DavScheme,
    pub host: String,
    pub path: String,
}

impl DavUrl {
    /// Translate a logical URL into its transport form.
    pub fn parse(url: &str) -> Result<Self, ParseUrlError> {
        if let Some(rest) = url.strip_prefix("storagebox://") {
            let (account, path) = split_host_path(rest);
            if account.is_empty() {
                return Err(ParseUrlError(url.to_string()));
            }
            return Ok(Self {
                host: format!("{account}.{STORAGE_BOX_DOMAIN}"),
                scheme: DavScheme::StorageBox {
                    account: account.to_string(),
                },
                path,
            });
        }

        let (scheme, rest) = if let Some(rest) = url.strip_prefix("webdav://") {
            (DavScheme::Webdav, rest)
        } else if let Some(rest) = url.strip_prefix("webdavs://") {
            (DavScheme::Webdavs, rest)
        } else if let Some(rest) = url.strip_prefix("http://") {
            (DavScheme::Http, rest)
        } else if let Some(rest) = url.strip_prefix("https://") {
            (DavScheme::Https, rest)
        } else {
            return Err(ParseUrlError(url.to_string()));
        };

        let (host, path) = split_host_path(rest);
        if host.is_empty() {
            return Err(ParseUrlError(url.to_string()));
        }
        Ok(Self {
            scheme,
            host: host.to_string(),
            path,
        })
    }

    /// The URL requests are actually sent to.
    pub fn http_url(&self) -> String {
        format!("{}://{}{}", self.scheme.http_scheme(), self.host, self.path)
    }

    /// Rebuild a sibling URL (same scheme and host, different path) in the
    /// scheme-specific form the caller used.
    pub fn reconstruct(&self, path: &str) -> String {
        match &self.scheme {
            DavScheme::Webdav => format!("webdav://{}{}", self.host, path),
            DavScheme::Webdavs => format!("webdavs://{}{}", self.host, path),
            DavScheme::StorageBox { account } => format!("storagebox://{account}{path}"),
            DavScheme::Http => format!("http://{}{}", self.host, path),
            DavScheme::Https => format!("https://{}{}", self.host, path),
        }
    }

    /// Same scheme and host, different path.
    pub fn with_path(&self, path: impl Into<String>) -> Self {
        Self {
            scheme: self.scheme.clone(),
            host: self.host.clone(),
            path: path.into(),
        }
    }

    /// The collection containing this resource, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        let trimmed = self.path.trim_end_matches('/');
        let cut = trimmed.rfind('/')?;
        if cut == 0 {
            return None;
        }
        Some(self.with_path(&trimmed[..cut]))
    }
}

/// Whether a logical path belongs to this filesystem.
///
/// Plain `http(s)://` URLs are only claimed when they point at the provider
/// domain the shorthand expands to; other HTTP URLs stay with the generic
/// HTTP handler.
pub fn is_dav_url(url: &str) -> bool {
    if url.starts_with("storagebox://")
        || url.starts_with("webdav://")
        || url.starts_with("webdavs://")
    {
        return true;
    }
    (url.starts_with("http://") || url.starts_with("https://"))
        && url.contains(&format!(".{STORAGE_BOX_DOMAIN}/"))
}

fn split_host_path(rest: &str) -> (&str, String) {
    match rest.find('/') {
        Some(cut) => (&rest[..cut], rest[cut..].to_string()),
        None => (rest, "/".to_string()),
    }
}
