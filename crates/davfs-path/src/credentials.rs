/// A username/password pair for Basic authentication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// True when both fields are empty; such pairs never produce an
    /// Authorization header.
    pub fn is_empty(&self) -> bool {
        self.username.is_empty() && self.password.is_empty()
    }
}

/// Where credentials come from.
///
/// Lookups receive the *original* (pre-translation) URL so that scoping
/// rules keyed on the user-facing scheme keep working even though requests
/// are sent to the translated URL.
pub trait CredentialSource: Send + Sync {
    fn lookup(&self, original_url: &str) -> Option<Credentials>;
}

/// One pair for every path.
#[derive(Debug, Clone)]
pub struct StaticCredentials(Credentials);

impl StaticCredentials {
    pub fn new(credentials: Credentials) -> Self {
        Self(credentials)
    }
}

impl CredentialSource for StaticCredentials {
    fn lookup(&self, _original_url: &str) -> Option<Credentials> {
        Some(self.0.clone())
    }
}

/// Pairs scoped by URL prefix; the longest matching prefix wins.
#[derive(Debug, Clone, Default)]
pub struct ScopedCredentials {
    scopes: Vec<(String, Credentials)>,
}

impl ScopedCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pair for every URL starting with `prefix`.
    #[must_use]
    pub fn scope(mut self, prefix: impl Into<String>, credentials: Credentials) -> Self {
        self.scopes.push((prefix.into(), credentials));
        self
    }
}

impl CredentialSource for ScopedCredentials {
    fn lookup(&self, original_url: &str) -> Option<Credentials> {
        self.scopes
            .iter()
            .filter(|(prefix, _)| original_url.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, credentials)| credentials.clone())
    }
}

/// Anonymous access.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredentials;

impl CredentialSource for NoCredentials {
    fn lookup(&self, _original_url: &str) -> Option<Credentials> {
        None
    }
}
