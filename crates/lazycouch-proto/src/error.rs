//! Protocol error types.

use thiserror::Error;

/// Protocol-level errors.
#[derive(Debug, Error)]
pub enum Error {
    /// View name is neither `_all_docs` nor `design/view`.
    #[error("invalid view name {0:?}: expected `_all_docs` or `design/view`")]
    InvalidViewName(String),

    /// Document id or database name that cannot be addressed as a path segment.
    #[error("invalid identifier {0:?}: empty, `.` and `..` cannot be addressed")]
    InvalidId(String),

    /// Changes feed mode this client cannot consume.
    #[error("unsupported feed {0:?}: expected `normal`, `longpoll` or `continuous`")]
    UnsupportedFeed(String),

    /// A JSON value that should have been an object was something else.
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// JSON encoding or decoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
