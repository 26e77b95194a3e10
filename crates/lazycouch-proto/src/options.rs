//! Query parameter builders for views and the changes feed.
//!
//! CouchDB expects JSON-encoded values for key-like view parameters
//! (`key=%22abc%22`, not `key=abc`). The typed setters here take care of that;
//! [`ViewOptions::param`] and [`ChangesOptions::param`] pass values through
//! verbatim for anything not covered.

use serde::Serialize;
use serde_json::Value;

use crate::Error;

/// An ordered list of query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    /// Create an empty parameter list.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Set a parameter, replacing any previous value with the same name.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    /// Look up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The parameters as name/value pairs, in insertion order.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }
}

impl Serialize for QueryParams {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

/// Options for a view query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewOptions {
    params: QueryParams,
}

impl ViewOptions {
    /// Create empty view options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only return rows matching this key.
    pub fn key(self, key: &Value) -> Result<Self, Error> {
        self.json_param("key", key)
    }

    /// Return rows starting at this key.
    pub fn start_key(self, key: &Value) -> Result<Self, Error> {
        self.json_param("startkey", key)
    }

    /// Return rows up to this key.
    pub fn end_key(self, key: &Value) -> Result<Self, Error> {
        self.json_param("endkey", key)
    }

    /// Limit the number of rows returned.
    pub fn limit(mut self, limit: u64) -> Self {
        self.params.set("limit", limit.to_string());
        self
    }

    /// Skip this many rows.
    pub fn skip(mut self, skip: u64) -> Self {
        self.params.set("skip", skip.to_string());
        self
    }

    /// Reverse the row order.
    pub fn descending(mut self, descending: bool) -> Self {
        self.params.set("descending", descending.to_string());
        self
    }

    /// Include the full document in each row.
    pub fn include_docs(mut self, include: bool) -> Self {
        self.params.set("include_docs", include.to_string());
        self
    }

    /// Run (or skip) the view's reduce function.
    pub fn reduce(mut self, reduce: bool) -> Self {
        self.params.set("reduce", reduce.to_string());
        self
    }

    /// Group reduce results by key.
    pub fn group(mut self, group: bool) -> Self {
        self.params.set("group", group.to_string());
        self
    }

    /// Set a raw parameter, passed through unchanged.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.set(name, value);
        self
    }

    /// The accumulated query parameters.
    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    fn json_param(mut self, name: &str, value: &Value) -> Result<Self, Error> {
        self.params.set(name, serde_json::to_string(value)?);
        Ok(self)
    }
}

/// Changes feed mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Feed {
    /// Return all pending changes in one response.
    #[default]
    Normal,
    /// Wait for at least one change, then return a batch.
    LongPoll,
    /// Keep the connection open and stream one JSON object per line.
    Continuous,
}

impl Feed {
    /// The wire name of this feed mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::LongPoll => "longpoll",
            Self::Continuous => "continuous",
        }
    }

    /// Parse a wire name.
    ///
    /// Feeds other than `normal`, `longpoll` and `continuous` (such as
    /// `eventsource`) are neither one JSON document nor newline-delimited
    /// JSON, so they are rejected.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        match name {
            "normal" => Ok(Self::Normal),
            "longpoll" => Ok(Self::LongPoll),
            "continuous" => Ok(Self::Continuous),
            other => Err(Error::UnsupportedFeed(other.to_string())),
        }
    }
}

/// Options for a changes feed request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangesOptions {
    params: QueryParams,
}

impl ChangesOptions {
    /// Create empty changes options (polling feed).
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for a continuous feed.
    pub fn continuous() -> Self {
        Self::new().feed(Feed::Continuous)
    }

    /// Select the feed mode.
    pub fn feed(mut self, feed: Feed) -> Self {
        self.params.set("feed", feed.as_str());
        self
    }

    /// Start after this sequence identifier (or `now`).
    pub fn since(mut self, since: impl Into<String>) -> Self {
        self.params.set("since", since);
        self
    }

    /// Limit the number of changes returned.
    pub fn limit(mut self, limit: u64) -> Self {
        self.params.set("limit", limit.to_string());
        self
    }

    /// Include the changed documents.
    pub fn include_docs(mut self, include: bool) -> Self {
        self.params.set("include_docs", include.to_string());
        self
    }

    /// Ask the server to send a blank line every `millis` while idle.
    pub fn heartbeat(mut self, millis: u64) -> Self {
        self.params.set("heartbeat", millis.to_string());
        self
    }

    /// Ask the server to close the feed after `millis` without changes.
    pub fn timeout(mut self, millis: u64) -> Self {
        self.params.set("timeout", millis.to_string());
        self
    }

    /// Apply a server-side filter function (`design/filter`).
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.params.set("filter", filter);
        self
    }

    /// Set a raw parameter, passed through unchanged.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.set(name, value);
        self
    }

    /// The selected feed mode, `normal` when unset.
    pub fn feed_mode(&self) -> Result<Feed, Error> {
        match self.params.get("feed") {
            Some(name) => Feed::from_name(name),
            None => Ok(Feed::Normal),
        }
    }

    /// The accumulated query parameters.
    pub fn params(&self) -> &QueryParams {
        &self.params
    }
}
