//! lazycouch client - async client library for CouchDB.
//!
//! CouchDB is driven entirely over HTTP with JSON bodies. This crate maps
//! server and database operations onto those requests and nothing more:
//! no caching, no retries, no background work. Every unexpected status
//! comes back as [`Error::CouchDb`] carrying the status and raw body.
//!
//! # Quick Start
//!
//! ```ignore
//! use lazycouch_client::{ChangesOptions, Document, Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect; this validates the server is reachable
//!     let server = Server::connect(
//!         ServerConfig::new("http://127.0.0.1:5984").with_credentials("admin", "secret"),
//!     )
//!     .await?;
//!
//!     // Create (or open) a database
//!     let db = server.create("inventory").await?;
//!
//!     // Store a document; `_id` and `_rev` are written back into it
//!     let mut doc = Document::new().with_field("sku", "A-100").with_field("qty", 4);
//!     db.put("A-100", &mut doc).await?;
//!
//!     // Follow changes until the server closes the feed
//!     let mut feed = db.continuous_changes(&ChangesOptions::new().since("now")).await?;
//!     while let Some(change) = feed.next().await {
//!         println!("{}", change?);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod feed;
pub mod server;
pub mod session;

pub use config::{Credentials, ServerConfig};
pub use database::{Database, DocumentIds};
pub use error::{Error, Result};
pub use feed::{Changes, ChangesFeed};
pub use server::{DatabaseNames, Server};
pub use session::Session;

/// Re-export protocol types.
pub use lazycouch_proto as proto;
pub use lazycouch_proto::{ChangesOptions, Document, Feed, ViewOptions, ViewResult, ViewRow};
