//! lazycouch protocol types.
//!
//! This crate holds everything about talking to CouchDB that does not need a
//! socket: document shaping, URL path encoding, query option builders, typed
//! view results, and the newline-delimited JSON framing used by the
//! continuous changes feed.
//!
//! # Modules
//!
//! - [`document`] - JSON document wrapper with `_id`/`_rev` accessors
//! - [`path`] - Path segment encoding and view name resolution
//! - [`options`] - Query parameter builders for views and changes
//! - [`view`] - Typed view results and write acknowledgements
//! - [`framing`] - Line framing for the continuous changes feed
//! - [`error`] - Protocol error types

pub mod document;
pub mod error;
pub mod framing;
pub mod options;
pub mod path;
pub mod view;

pub use error::Error;

// Re-export commonly used types at crate root
pub use document::{Document, ID_FIELD, REV_FIELD};
pub use framing::LineDecoder;
pub use options::{ChangesOptions, Feed, QueryParams, ViewOptions};
pub use path::{encode_id, encode_segment, ViewPath, ALL_DOCS};
pub use view::{ViewResult, ViewRow, WriteResponse};
