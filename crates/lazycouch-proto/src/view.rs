//! Typed response bodies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The result of a view query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewResult {
    /// Total rows in the view, before `limit`/`skip`. Absent for reduced views.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<u64>,
    /// Offset of the first returned row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    /// Rows in server order.
    #[serde(default)]
    pub rows: Vec<ViewRow>,
}

impl ViewResult {
    /// Document ids of all rows that carry one, in row order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().filter_map(|row| row.id.as_deref())
    }
}

/// A single view row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewRow {
    /// Id of the document that emitted the row. Absent for reduced rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Emitted key.
    #[serde(default)]
    pub key: Value,
    /// Emitted value.
    #[serde(default)]
    pub value: Value,
    /// The document, when `include_docs=true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<Value>,
}

/// Acknowledgement returned by document writes and deletes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResponse {
    /// Whether the server reported success.
    #[serde(default)]
    pub ok: bool,
    /// Id of the written document.
    #[serde(default)]
    pub id: Option<String>,
    /// New revision token.
    #[serde(default)]
    pub rev: Option<String>,
}
