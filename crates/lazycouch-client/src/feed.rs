//! Changes feed consumption.
//!
//! A polling request yields a single JSON batch. A continuous request keeps
//! the HTTP response open and yields one change per line for as long as the
//! server keeps writing. The caller pulls events with [`ChangesFeed::next`]
//! and stops the feed with [`ChangesFeed::close`] or by cancelling the token
//! from [`ChangesFeed::cancel_token`], possibly from another task.

use std::collections::VecDeque;

use bytes::Bytes;
use futures::Stream;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use lazycouch_proto::LineDecoder;

use crate::error::{Error, Result};

/// Result of [`Database::changes`](crate::Database::changes).
#[derive(Debug)]
pub enum Changes {
    /// A polling or long-polling batch.
    Batch(Value),
    /// An open continuous feed.
    Continuous(ChangesFeed),
}

impl Changes {
    /// The batch, if this was a polling request.
    pub fn into_batch(self) -> Option<Value> {
        match self {
            Self::Batch(value) => Some(value),
            Self::Continuous(_) => None,
        }
    }

    /// The feed, if this was a continuous request.
    pub fn into_feed(self) -> Option<ChangesFeed> {
        match self {
            Self::Batch(_) => None,
            Self::Continuous(feed) => Some(feed),
        }
    }
}

/// An open continuous changes feed.
///
/// Each call to [`next`](Self::next) returns the next decoded change, `None`
/// once the server closes the stream or the feed is cancelled. A line that
/// is not valid JSON yields `Some(Err(Error::Decode))`; the feed stays usable
/// and the following call moves on to the next line.
pub struct ChangesFeed {
    response: Option<reqwest::Response>,
    decoder: LineDecoder,
    pending: VecDeque<Bytes>,
    cancel: CancellationToken,
}

impl ChangesFeed {
    pub(crate) fn new(response: reqwest::Response) -> Self {
        Self {
            response: Some(response),
            decoder: LineDecoder::new(),
            pending: VecDeque::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Wait for the next change.
    pub async fn next(&mut self) -> Option<Result<Value>> {
        loop {
            if self.cancel.is_cancelled() {
                self.close();
                return None;
            }

            if let Some(line) = self.pending.pop_front() {
                return Some(serde_json::from_slice(&line).map_err(Error::from));
            }

            let response = self.response.as_mut()?;
            let chunk = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                chunk = response.chunk() => Some(chunk),
            };

            match chunk {
                None => {
                    debug!("changes feed cancelled");
                    continue;
                }
                Some(Ok(Some(bytes))) => {
                    let lines = self.decoder.push(&bytes);
                    self.pending.extend(lines);
                }
                Some(Ok(None)) => {
                    debug!("changes feed ended by server");
                    self.response = None;
                    if let Some(line) = self.decoder.finish() {
                        self.pending.push_back(line);
                    }
                }
                Some(Err(e)) => {
                    self.close();
                    return Some(Err(Error::Transport(e)));
                }
            }
        }
    }

    /// Close the connection. Changes already received but not yet returned
    /// are discarded.
    pub fn close(&mut self) {
        self.response = None;
        self.pending.clear();
        self.decoder = LineDecoder::new();
        self.cancel.cancel();
    }

    /// Whether the feed can still produce events.
    pub fn is_open(&self) -> bool {
        !self.cancel.is_cancelled() && (self.response.is_some() || !self.pending.is_empty())
    }

    /// A token that stops the feed when cancelled.
    ///
    /// A pending [`next`](Self::next) returns `None` promptly; so does every
    /// later call.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Adapt the feed into a [`Stream`].
    pub fn into_stream(self) -> impl Stream<Item = Result<Value>> {
        futures::stream::unfold(self, |mut feed| async move {
            feed.next().await.map(|item| (item, feed))
        })
    }
}

impl std::fmt::Debug for ChangesFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangesFeed")
            .field("open", &self.is_open())
            .field("pending", &self.pending.len())
            .field("buffered", &self.decoder.buffered())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
