//! CouchDB server handle.
//!
//! This module provides the main `Server` struct: a validated connection to a
//! CouchDB host and the entry point for database lookup and management.

use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::{Method, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, info};

use lazycouch_proto::encode_id;

use crate::config::{normalize_base_url, ServerConfig};
use crate::database::Database;
use crate::error::{Error, Result};
use crate::session::{self, Session};

/// A connection to a CouchDB host.
///
/// Cloning is cheap; clones share the session and the cached server info.
///
/// # Example
///
/// ```ignore
/// use lazycouch_client::{Server, ServerConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = Server::connect(ServerConfig::localhost()).await?;
///
///     for name in server.database_names().await? {
///         println!("{}", name);
///     }
///
///     let db = server.create("inventory").await?;
///     println!("{}", db.info().await?);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Server {
    inner: Arc<ServerInner>,
}

struct ServerInner {
    url: Url,
    session: RwLock<Session>,
    info: Value,
}

impl Server {
    /// Connect to a server, building a fresh session from the configuration.
    ///
    /// Issues `GET /` immediately and fails unless the server answers 200.
    pub async fn connect(config: ServerConfig) -> Result<Self> {
        let session = Session::new(&config)?;
        Self::connect_with_session(&config.url, session).await
    }

    /// Connect to a server at the given URL with default settings.
    pub async fn connect_to(url: impl Into<String>) -> Result<Self> {
        Self::connect(ServerConfig::new(url)).await
    }

    /// Connect to a server reusing an existing session.
    pub async fn connect_with_session(url: &str, session: Session) -> Result<Self> {
        let url = normalize_base_url(url)?;

        let response = session::send(session.request(Method::GET, url.clone())).await?;
        let response = session::expect_status(response, &[StatusCode::OK]).await?;
        let info: Value = session::read_json(response).await?;

        info!(url = %url, version = ?info.get("version"), "connected to couchdb");

        Ok(Self {
            inner: Arc::new(ServerInner {
                url,
                session: RwLock::new(session),
                info,
            }),
        })
    }

    /// The normalized base URL, always ending in `/`.
    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    /// The welcome blob the server returned at connection time.
    pub fn info(&self) -> &Value {
        &self.inner.info
    }

    /// The current session.
    pub fn session(&self) -> Session {
        self.inner.session.read().clone()
    }

    /// Replace the session used for all subsequent requests, including those
    /// issued through existing [`Database`] handles.
    pub fn set_session(&self, session: Session) {
        *self.inner.session.write() = session;
    }

    /// List the names of all databases.
    pub async fn database_names(&self) -> Result<DatabaseNames> {
        let url = self.join("_all_dbs")?;
        let response = session::send(self.session().request(Method::GET, url)).await?;
        let response = session::expect_status(response, &[StatusCode::OK]).await?;
        let names: Vec<String> = session::read_json(response).await?;

        Ok(DatabaseNames {
            names: names.into_iter(),
        })
    }

    /// Look up an existing database.
    ///
    /// Any status other than 200 is reported as 404 "no such database".
    pub async fn database(&self, name: &str) -> Result<Database> {
        let url = self.database_url(name)?;
        let response = session::send(self.session().request(Method::HEAD, url.clone())).await?;

        if response.status() != StatusCode::OK {
            debug!(
                database = name,
                status = response.status().as_u16(),
                "database lookup failed"
            );
            return Err(Error::couchdb(404, "no such database"));
        }

        Ok(Database::new(self.clone(), name, url))
    }

    /// Create a database, or open it if it already exists.
    pub async fn create(&self, name: &str) -> Result<Database> {
        let url = self.database_url(name)?;
        let response = session::send(self.session().request(Method::PUT, url.clone())).await?;
        let response = session::expect_status(
            response,
            &[StatusCode::CREATED, StatusCode::PRECONDITION_FAILED],
        )
        .await?;

        if response.status() == StatusCode::CREATED {
            info!(database = name, "database created");
        }

        Ok(Database::new(self.clone(), name, url))
    }

    /// Delete a database.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let url = self.database_url(name)?;
        let response = session::send(self.session().request(Method::DELETE, url)).await?;
        session::expect_status(response, &[StatusCode::OK]).await?;

        info!(database = name, "database deleted");
        Ok(())
    }

    /// Fetch the server configuration.
    pub async fn config(&self) -> Result<Value> {
        let url = self.join("_config")?;
        let response = session::send(self.session().request(Method::GET, url)).await?;
        let response = session::expect_status(response, &[StatusCode::OK]).await?;
        session::read_json(response).await
    }

    /// URL of a database, with a trailing `/` so document paths join beneath it.
    fn database_url(&self, name: &str) -> Result<Url> {
        self.join(&format!("{}/", encode_id(name)?))
    }

    fn join(&self, path: &str) -> Result<Url> {
        join_url(&self.inner.url, path)
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("url", &self.inner.url.as_str())
            .field("session", &*self.inner.session.read())
            .finish()
    }
}

/// Join a relative path onto a base URL.
pub(crate) fn join_url(base: &Url, path: &str) -> Result<Url> {
    base.join(path)
        .map_err(|e| Error::InvalidUrl(format!("{}{}: {}", base, path, e)))
}

/// Forward-only iterator over database names.
///
/// Produced by [`Server::database_names`]; call it again to restart.
#[derive(Debug)]
pub struct DatabaseNames {
    names: std::vec::IntoIter<String>,
}

impl Iterator for DatabaseNames {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        self.names.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.names.size_hint()
    }
}

impl ExactSizeIterator for DatabaseNames {}
