//! URL path construction.
//!
//! Document ids, database names and view names are user data and may contain
//! anything. Each one is encoded as a single path segment so that the server
//! sees exactly the identifier the caller passed.

use std::fmt::Write;

use crate::Error;

/// Name of the built-in view over every document in a database.
pub const ALL_DOCS: &str = "_all_docs";

/// Percent-encode a single path segment.
///
/// Unreserved characters (`A-Z a-z 0-9 - . _ ~`) pass through; every other
/// byte of the UTF-8 encoding becomes `%XX`. This includes `/`, so a segment
/// can never introduce extra path levels, and space, which becomes `%20`.
pub fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            out.push(byte as char);
        } else {
            // Writing to a String cannot fail.
            let _ = write!(out, "%{:02X}", byte);
        }
    }
    out
}

/// Encode a document id or database name as a path segment.
///
/// Empty, `.` and `..` are rejected: they would resolve to the parent
/// resource instead of naming one.
pub fn encode_id(id: &str) -> Result<String, Error> {
    if matches!(id, "" | "." | "..") {
        return Err(Error::InvalidId(id.to_string()));
    }
    Ok(encode_segment(id))
}

/// A resolved view target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewPath {
    /// The built-in `_all_docs` view.
    AllDocs,
    /// A view defined by a design document.
    Design {
        /// Design document name, without the `_design/` prefix.
        design: String,
        /// View name inside the design document.
        view: String,
    },
}

impl ViewPath {
    /// Parse a view name of the form `design/view`, or `_all_docs`.
    ///
    /// Only the first `/` separates the design name from the view name; any
    /// later `/` stays part of the view name.
    pub fn parse(name: &str) -> Result<Self, Error> {
        if name == ALL_DOCS {
            return Ok(Self::AllDocs);
        }

        match name.split_once('/') {
            Some((design, view)) if !design.is_empty() && !view.is_empty() => Ok(Self::Design {
                design: design.to_string(),
                view: view.to_string(),
            }),
            _ => Err(Error::InvalidViewName(name.to_string())),
        }
    }

    /// Path of the view relative to the database URL.
    pub fn to_path(&self) -> String {
        match self {
            Self::AllDocs => ALL_DOCS.to_string(),
            Self::Design { design, view } => format!(
                "_design/{}/_view/{}",
                encode_segment(design),
                encode_segment(view)
            ),
        }
    }
}
