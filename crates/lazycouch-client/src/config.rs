//! Client configuration.

use std::time::Duration;

use reqwest::Url;

use crate::error::{Error, Result};

/// Default CouchDB address.
pub const DEFAULT_URL: &str = "http://127.0.0.1:5984/";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = concat!("lazycouch/", env!("CARGO_PKG_VERSION"));

/// Username and password for HTTP basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

impl Credentials {
    /// Create credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Server connection configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Base URL of the CouchDB host (e.g., "http://127.0.0.1:5984/").
    pub url: String,

    /// Optional basic-auth credentials.
    pub credentials: Option<Credentials>,

    /// Request timeout. Does not apply to continuous changes feeds.
    pub timeout: Duration,

    /// TCP connect timeout.
    pub connect_timeout: Duration,

    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl ServerConfig {
    /// Create a new configuration for the given base URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            credentials: None,
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Create a configuration for a local server on the default port.
    pub fn localhost() -> Self {
        Self::new(DEFAULT_URL)
    }

    /// Authenticate every request with these credentials.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the `User-Agent` header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Parse and normalize the base URL so that it ends in `/`.
    pub fn base_url(&self) -> Result<Url> {
        normalize_base_url(&self.url)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::localhost()
    }
}

/// Parse a base URL, appending a trailing `/` if the path lacks one.
///
/// Relative joins against the result always land beneath the given path.
pub(crate) fn normalize_base_url(url: &str) -> Result<Url> {
    let mut parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))?;
    if parsed.cannot_be_a_base() {
        return Err(Error::InvalidUrl(format!("{}: not a base url", url)));
    }
    if !parsed.path().ends_with('/') {
        let path = format!("{}/", parsed.path());
        parsed.set_path(&path);
    }
    parsed.set_query(None);
    parsed.set_fragment(None);
    Ok(parsed)
}
