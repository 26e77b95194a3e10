//! Database handle: documents, views and changes.

use reqwest::header::{CONTENT_TYPE, ETAG};
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use lazycouch_proto::{
    encode_id, ChangesOptions, Document, Feed, ViewOptions, ViewPath, ViewResult,
    WriteResponse, ALL_DOCS,
};

use crate::error::{Error, Result};
use crate::feed::{Changes, ChangesFeed};
use crate::server::{join_url, Server};
use crate::session;

const WRITE_OK: &[StatusCode] = &[StatusCode::OK, StatusCode::CREATED];

/// A named database on a [`Server`].
///
/// Obtained from [`Server::database`] or [`Server::create`]. The handle is
/// only a name and a URL; whether the database still exists is up to the
/// server.
#[derive(Debug, Clone)]
pub struct Database {
    server: Server,
    name: String,
    url: Url,
}

impl Database {
    pub(crate) fn new(server: Server, name: &str, url: Url) -> Self {
        Self {
            server,
            name: name.to_string(),
            url,
        }
    }

    /// The database name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The database URL, ending in `/`.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The owning server.
    pub fn server(&self) -> &Server {
        &self.server
    }

    /// Fetch database metadata (document count, update sequence, sizes).
    pub async fn info(&self) -> Result<Value> {
        let response = self.send(Method::GET, self.url.clone(), |b| b).await?;
        let response = session::expect_status(response, &[StatusCode::OK]).await?;
        session::read_json(response).await
    }

    /// Ids of every document, in `_all_docs` order.
    pub async fn document_ids(&self) -> Result<DocumentIds> {
        let result = self.view_result(ALL_DOCS, None, &ViewOptions::new()).await?;
        let ids: Vec<String> = result.rows.into_iter().filter_map(|row| row.id).collect();

        Ok(DocumentIds {
            ids: ids.into_iter(),
        })
    }

    /// Fetch a document.
    pub async fn get(&self, id: &str) -> Result<Document> {
        let url = self.document_url(id)?;
        let response = self.send(Method::GET, url, |b| b).await?;
        let response = session::expect_status(response, &[StatusCode::OK]).await?;
        session::read_json(response).await
    }

    /// Fetch only the current revision of a document, from its `ETag`.
    pub async fn get_rev(&self, id: &str) -> Result<String> {
        let url = self.document_url(id)?;
        let response = self.send(Method::HEAD, url, |b| b).await?;
        let response = session::expect_status(response, &[StatusCode::OK]).await?;

        let etag = response
            .headers()
            .get(ETAG)
            .ok_or(Error::MissingField("ETag"))?;
        let etag = etag.to_str().map_err(|_| Error::MissingField("ETag"))?;

        // The header is a quoted string, e.g. "1-967a00dff5e02add41819138abb3284d".
        Ok(serde_json::from_str(etag)?)
    }

    /// Store `doc` under `id`.
    ///
    /// On success `doc` is updated in place with `_id` and the new `_rev`,
    /// and the new revision is returned.
    pub async fn put(&self, id: &str, doc: &mut Document) -> Result<String> {
        let url = self.document_url(id)?;
        let ack = self.write(Method::PUT, url, &*doc).await?;
        let rev = ack.rev.ok_or(Error::MissingField("rev"))?;

        doc.set_id(id);
        doc.set_rev(rev.clone());
        Ok(rev)
    }

    /// Store a document, letting the server assign an id if it has none.
    ///
    /// Returns the `(id, rev)` pair the server acknowledged. `doc` itself is
    /// left untouched.
    pub async fn save(&self, doc: &Document) -> Result<(String, String)> {
        let ack = match doc.id() {
            Some(id) => {
                let url = self.document_url(id)?;
                self.write(Method::PUT, url, doc).await?
            }
            None => self.write(Method::POST, self.url.clone(), doc).await?,
        };

        let id = ack.id.ok_or(Error::MissingField("id"))?;
        let rev = ack.rev.ok_or(Error::MissingField("rev"))?;
        Ok((id, rev))
    }

    /// Delete the current revision of a document.
    ///
    /// Looks the revision up first, then deletes it. A write landing between
    /// the two requests surfaces as a 409 error.
    pub async fn remove(&self, id: &str) -> Result<String> {
        let rev = self.get_rev(id).await?;
        self.delete(id, &rev).await
    }

    /// Delete a specific revision of a document, returning the tombstone revision.
    pub async fn delete(&self, id: &str, rev: &str) -> Result<String> {
        let url = self.document_url(id)?;
        let response = self
            .send(Method::DELETE, url, |b| b.query(&[("rev", rev)]))
            .await?;
        let response = session::expect_status(response, &[StatusCode::OK]).await?;
        let ack: WriteResponse = session::read_json(response).await?;

        debug!(database = %self.name, id, "document deleted");
        ack.rev.ok_or(Error::MissingField("rev"))
    }

    /// Query a view.
    ///
    /// `view` is `_all_docs` or `design/view`. Without `keys` this is a GET
    /// with `options` as query parameters; with `keys` it becomes a POST with
    /// body `{"keys": [...]}`.
    pub async fn view(
        &self,
        view: &str,
        keys: Option<&[Value]>,
        options: &ViewOptions,
    ) -> Result<Value> {
        let path = ViewPath::parse(view)?;
        let url = join_url(&self.url, &path.to_path())?;
        let params = options.params();

        let response = match keys {
            None => self.send(Method::GET, url, |b| b.query(params)).await?,
            Some(keys) => {
                let body = serde_json::to_vec(&json!({ "keys": keys }))?;
                self.send(Method::POST, url, |b| {
                    b.query(params)
                        .header(CONTENT_TYPE, "application/json")
                        .body(body)
                })
                .await?
            }
        };

        let response = session::expect_status(response, &[StatusCode::OK]).await?;
        session::read_json(response).await
    }

    /// Query a view, decoding the rows.
    pub async fn view_result(
        &self,
        view: &str,
        keys: Option<&[Value]>,
        options: &ViewOptions,
    ) -> Result<ViewResult> {
        let value = self.view(view, keys, options).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Read the changes feed in the mode selected by `options`.
    ///
    /// An unsupported `feed` value fails with
    /// [`lazycouch_proto::Error::UnsupportedFeed`] before any request is made.
    pub async fn changes(&self, options: &ChangesOptions) -> Result<Changes> {
        match options.feed_mode()? {
            Feed::Continuous => Ok(Changes::Continuous(self.continuous_changes(options).await?)),
            Feed::Normal | Feed::LongPoll => Ok(Changes::Batch(self.poll_changes(options).await?)),
        }
    }

    /// Fetch one batch of changes.
    pub async fn poll_changes(&self, options: &ChangesOptions) -> Result<Value> {
        let url = self.changes_url()?;
        let response = self
            .send(Method::GET, url, |b| b.query(options.params()))
            .await?;
        let response = session::expect_status(response, &[StatusCode::OK]).await?;
        session::read_json(response).await
    }

    /// Open a continuous changes feed.
    ///
    /// The `feed=continuous` parameter is forced regardless of `options`.
    /// Fails before yielding anything if the server does not answer 200.
    pub async fn continuous_changes(&self, options: &ChangesOptions) -> Result<ChangesFeed> {
        let url = self.changes_url()?;
        let options = options.clone().feed(Feed::Continuous);

        let builder = self
            .server
            .session()
            .streaming_request(Method::GET, url)
            .query(options.params());
        let response = session::send(builder).await?;
        let response = session::expect_status(response, &[StatusCode::OK]).await?;

        info!(database = %self.name, "changes feed opened");
        Ok(ChangesFeed::new(response))
    }

    fn document_url(&self, id: &str) -> Result<Url> {
        join_url(&self.url, &encode_id(id)?)
    }

    fn changes_url(&self) -> Result<Url> {
        join_url(&self.url, "_changes")
    }

    async fn write<T: Serialize>(&self, method: Method, url: Url, doc: &T) -> Result<WriteResponse> {
        let body = serde_json::to_vec(doc)?;
        let response = self
            .send(method, url, |b| {
                b.header(CONTENT_TYPE, "application/json").body(body)
            })
            .await?;
        let response = session::expect_status(response, WRITE_OK).await?;
        session::read_json(response).await
    }

    async fn send<F>(&self, method: Method, url: Url, build: F) -> Result<reqwest::Response>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let builder = self.server.session().request(method, url);
        session::send(build(builder)).await
    }
}

/// Forward-only iterator over document ids.
///
/// Produced by [`Database::document_ids`]; call it again to restart.
#[derive(Debug)]
pub struct DocumentIds {
    ids: std::vec::IntoIter<String>,
}

impl Iterator for DocumentIds {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        self.ids.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

impl ExactSizeIterator for DocumentIds {}
