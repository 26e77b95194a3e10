//! Schemaless CouchDB documents.
//!
//! A document is a JSON object. The server reserves `_id` and `_rev`; every
//! other field belongs to the caller and is carried through untouched.

use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Error;

/// Reserved field holding the document id.
pub const ID_FIELD: &str = "_id";

/// Reserved field holding the revision token.
pub const REV_FIELD: &str = "_rev";

/// A JSON document.
///
/// Dereferences to the underlying [`Map`] so arbitrary fields can be read and
/// written directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Create a document with the given id.
    pub fn with_id(id: impl Into<String>) -> Self {
        let mut doc = Self::new();
        doc.set_id(id);
        doc
    }

    /// Add a field, builder style.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// The document id, if it has one.
    pub fn id(&self) -> Option<&str> {
        self.0.get(ID_FIELD).and_then(Value::as_str)
    }

    /// The revision token, if the document has been persisted.
    pub fn rev(&self) -> Option<&str> {
        self.0.get(REV_FIELD).and_then(Value::as_str)
    }

    /// Set the document id.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.0.insert(ID_FIELD.to_string(), Value::String(id.into()));
    }

    /// Set the revision token.
    pub fn set_rev(&mut self, rev: impl Into<String>) {
        self.0.insert(REV_FIELD.to_string(), Value::String(rev.into()));
    }

    /// Borrow the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume the document, returning the underlying JSON object.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl Deref for Document {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Document {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Object(doc.0)
    }
}

impl TryFrom<Value> for Document {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Err(Error::NotAnObject("null")),
            Value::Bool(_) => Err(Error::NotAnObject("a boolean")),
            Value::Number(_) => Err(Error::NotAnObject("a number")),
            Value::String(_) => Err(Error::NotAnObject("a string")),
            Value::Array(_) => Err(Error::NotAnObject("an array")),
        }
    }
}
