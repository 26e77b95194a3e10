//! HTTP session shared by a server and its databases.
//!
//! A [`Session`] is a cheap handle: the wrapped `reqwest::Client` keeps its
//! connection pool behind an `Arc`, so cloning a session and handing it to
//! several servers makes them share connections.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::{Credentials, ServerConfig};
use crate::error::{Error, Result};

/// Transport handle used to issue requests.
#[derive(Clone)]
pub struct Session {
    client: reqwest::Client,
    credentials: Option<Credentials>,
    timeout: Option<Duration>,
}

impl Session {
    /// Build a session from a server configuration.
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            credentials: config.credentials.clone(),
            timeout: Some(config.timeout),
        })
    }

    /// Wrap an existing `reqwest::Client`.
    ///
    /// Timeouts and headers configured on the client apply as-is.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            credentials: None,
            timeout: None,
        }
    }

    /// Authenticate every request with these credentials.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set the per-request timeout for non-streaming requests.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The underlying HTTP client.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// The credentials attached to each request, if any.
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Start a request with authentication and timeout applied.
    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.streaming_request(method, url);
        match self.timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        }
    }

    /// Start a request whose body may stay open indefinitely.
    pub(crate) fn streaming_request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.credentials {
            Some(creds) => builder.basic_auth(&creds.username, Some(&creds.password)),
            None => builder,
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("credentials", &self.credentials)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Send a request and log the outcome.
pub(crate) async fn send(builder: RequestBuilder) -> Result<Response> {
    let (client, request) = builder.build_split();
    let request = request?;
    let method = request.method().clone();
    let url = request.url().clone();

    let response = client.execute(request).await?;
    debug!(%method, %url, status = response.status().as_u16(), "couchdb request");
    Ok(response)
}

/// Pass the response through if its status is in `accepted`, otherwise
/// consume the body into an [`Error::CouchDb`].
pub(crate) async fn expect_status(response: Response, accepted: &[StatusCode]) -> Result<Response> {
    if accepted.contains(&response.status()) {
        Ok(response)
    } else {
        Err(status_error(response).await)
    }
}

/// Turn an unexpected response into an error carrying its status and body.
pub(crate) async fn status_error(response: Response) -> Error {
    let status = response.status().as_u16();
    match response.text().await {
        Ok(body) => Error::couchdb(status, body),
        Err(e) => Error::Transport(e),
    }
}

/// Read a response body as JSON.
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}
