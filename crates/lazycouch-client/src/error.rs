//! Client error types.

use thiserror::Error;

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Client errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The server answered with a status outside the operation's success set.
    #[error("CouchDBError {status} {body:?}")]
    CouchDb { status: u16, body: String },

    /// A response body or feed line was not valid JSON, or not the expected shape.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The request never produced a response (connect, timeout, I/O).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The configured server URL could not be parsed.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// A successful response lacked a field the operation needs.
    #[error("response missing {0}")]
    MissingField(&'static str),

    /// Protocol-level validation failed.
    #[error("protocol error: {0}")]
    Proto(#[from] lazycouch_proto::Error),
}

impl Error {
    /// Build a status error.
    pub fn couchdb(status: u16, body: impl Into<String>) -> Self {
        Self::CouchDb {
            status,
            body: body.into(),
        }
    }

    /// The HTTP status carried by a status error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::CouchDb { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The raw response body carried by a status error.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::CouchDb { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Whether this is a 404.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Whether this is a revision conflict (409).
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }
}
