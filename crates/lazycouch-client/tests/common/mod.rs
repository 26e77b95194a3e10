//! In-process mock CouchDB for integration tests.
//!
//! Implements just enough of the HTTP API to exercise the client: database
//! management, document CRUD with revision checks, `_all_docs`, a toy view
//! engine, and both changes feed modes. Every request is recorded so tests
//! can assert on exact paths and bodies.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};

/// A request as the mock saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    /// Raw, still percent-encoded path.
    pub path: String,
    pub query: Option<String>,
    pub content_type: Option<String>,
    pub authorization: Option<String>,
    pub body: Bytes,
}

impl Recorded {
    pub fn json_body(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

#[derive(Default)]
struct MockDb {
    docs: BTreeMap<String, Value>,
    changes: Vec<Value>,
}

#[derive(Default)]
struct MockState {
    dbs: BTreeMap<String, MockDb>,
    requests: Vec<Recorded>,
    required_auth: Option<String>,
    fail_next: Option<(StatusCode, String)>,
    raw_feed: Option<Vec<Bytes>>,
    counter: u64,
}

impl MockState {
    fn next_counter(&mut self) -> u64 {
        self.counter += 1;
        self.counter
    }

    fn next_rev(&mut self, previous: Option<&str>) -> String {
        let generation = previous
            .and_then(|rev| rev.split('-').next())
            .and_then(|n| n.parse::<u64>().ok())
            .unwrap_or(0)
            + 1;
        format!("{}-{:032x}", generation, self.next_counter())
    }
}

type Shared = Arc<Mutex<MockState>>;

/// Handle to a running mock server.
pub struct MockCouch {
    pub url: String,
    state: Shared,
}

impl MockCouch {
    /// Start a mock server on an ephemeral port.
    pub async fn start() -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let state: Shared = Arc::new(Mutex::new(MockState::default()));
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}/", addr),
            state,
        }
    }

    /// Reject requests unless they carry this `Authorization` header.
    pub fn require_auth(&self, header_value: &str) {
        self.state.lock().required_auth = Some(header_value.to_string());
    }

    /// Answer the next request with this status and body, whatever it is.
    pub fn fail_next(&self, status: u16, body: &str) {
        self.state.lock().fail_next = Some((StatusCode::from_u16(status).unwrap(), body.to_string()));
    }

    /// Serve these chunks verbatim for the next continuous feed request.
    pub fn set_raw_feed(&self, chunks: &[&[u8]]) {
        self.state.lock().raw_feed = Some(chunks.iter().map(|c| Bytes::copy_from_slice(c)).collect());
    }

    /// Create a database directly, bypassing HTTP.
    pub fn seed_database(&self, name: &str) {
        self.state.lock().dbs.entry(name.to_string()).or_default();
    }

    /// Store a document directly, bypassing HTTP. Returns its revision.
    pub fn seed_document(&self, db: &str, id: &str, mut doc: Value) -> String {
        let mut state = self.state.lock();
        let previous = state
            .dbs
            .get(db)
            .and_then(|d| d.docs.get(id))
            .and_then(|d| d["_rev"].as_str())
            .map(str::to_string);
        let rev = state.next_rev(previous.as_deref());
        doc["_id"] = json!(id);
        doc["_rev"] = json!(rev);
        let seq = state.next_counter();
        let mock_db = state.dbs.entry(db.to_string()).or_default();
        mock_db.docs.insert(id.to_string(), doc);
        mock_db
            .changes
            .push(json!({"seq": seq, "id": id, "changes": [{"rev": rev}]}));
        rev
    }

    /// A stored document, if present.
    pub fn document(&self, db: &str, id: &str) -> Option<Value> {
        self.state.lock().dbs.get(db).and_then(|d| d.docs.get(id)).cloned()
    }

    pub fn has_database(&self, name: &str) -> bool {
        self.state.lock().dbs.contains_key(name)
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<Recorded> {
        self.state.lock().requests.clone()
    }

    /// The most recent request.
    pub fn last_request(&self) -> Recorded {
        self.state.lock().requests.last().cloned().unwrap()
    }

    pub fn clear_requests(&self) {
        self.state.lock().requests.clear();
    }
}

fn percent_decode(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap();
            out.push(u8::from_str_radix(hex, 16).unwrap());
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).unwrap()
}

fn query_pairs(uri: &Uri) -> Vec<(String, String)> {
    uri.query()
        .map(|q| {
            q.split('&')
                .filter(|p| !p.is_empty())
                .map(|pair| {
                    let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
                    (percent_decode(k), percent_decode(&v.replace('+', " ")))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn query_param(uri: &Uri, name: &str) -> Option<String> {
    query_pairs(uri).into_iter().find(|(k, _)| k == name).map(|(_, v)| v)
}

fn error(status: StatusCode, error: &str, reason: &str) -> Response {
    (status, Json(json!({"error": error, "reason": reason}))).into_response()
}

fn not_found() -> Response {
    error(StatusCode::NOT_FOUND, "not_found", "missing")
}

async fn handle(
    State(state): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header_str = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let mut guard = state.lock();
    guard.requests.push(Recorded {
        method: method.clone(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        content_type: header_str(header::CONTENT_TYPE),
        authorization: header_str(header::AUTHORIZATION),
        body: body.clone(),
    });

    if let Some((status, body)) = guard.fail_next.take() {
        return (status, body).into_response();
    }

    if let Some(expected) = &guard.required_auth {
        if header_str(header::AUTHORIZATION).as_deref() != Some(expected.as_str()) {
            return error(StatusCode::UNAUTHORIZED, "unauthorized", "Name or password is incorrect.");
        }
    }

    let segments: Vec<String> = uri
        .path()
        .split('/')
        .filter(|s| !s.is_empty())
        .map(percent_decode)
        .collect();
    let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

    match segments.as_slice() {
        [] => Json(json!({"couchdb": "Welcome", "version": "3.3.3"})).into_response(),
        ["_all_dbs"] => Json(json!(guard.dbs.keys().collect::<Vec<_>>())).into_response(),
        ["_config"] => {
            Json(json!({"couchdb": {"max_document_size": "8000000"}})).into_response()
        }
        [db] => database(&mut guard, &method, db, &body),
        [db, "_all_docs"] => all_docs(&guard, &method, db, &body),
        [db, "_changes"] => {
            let continuous = query_param(&uri, "feed").as_deref() == Some("continuous");
            if continuous {
                let hold_open = query_param(&uri, "heartbeat").is_some();
                continuous_feed(&mut guard, db, hold_open)
            } else {
                match guard.dbs.get(*db) {
                    Some(mock_db) => Json(json!({
                        "results": mock_db.changes,
                        "last_seq": mock_db.changes.last().map(|c| c["seq"].clone()).unwrap_or(json!(0)),
                    }))
                    .into_response(),
                    None => not_found(),
                }
            }
        }
        [db, "_design", _ddoc, "_view", view] => run_view(&guard, &method, db, view, &body),
        [db, id] => document(&mut guard, &method, &uri, db, id, &body),
        _ => not_found(),
    }
}

fn database(state: &mut MockState, method: &Method, db: &str, body: &Bytes) -> Response {
    match *method {
        Method::HEAD | Method::GET => match state.dbs.get(db) {
            Some(mock_db) => Json(json!({
                "db_name": db,
                "doc_count": mock_db.docs.len(),
                "update_seq": mock_db.changes.len(),
            }))
            .into_response(),
            None => not_found(),
        },
        Method::PUT => {
            if state.dbs.contains_key(db) {
                error(StatusCode::PRECONDITION_FAILED, "file_exists", "The database could not be created, the file already exists.")
            } else {
                state.dbs.insert(db.to_string(), MockDb::default());
                (StatusCode::CREATED, Json(json!({"ok": true}))).into_response()
            }
        }
        Method::DELETE => match state.dbs.remove(db) {
            Some(_) => Json(json!({"ok": true})).into_response(),
            None => not_found(),
        },
        Method::POST => {
            if !state.dbs.contains_key(db) {
                return not_found();
            }
            let id = format!("{:032x}", state.next_counter());
            write_document(state, db, &id, body)
        }
        _ => error(StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed", "Only GET,HEAD,PUT,POST,DELETE allowed"),
    }
}

fn write_document(state: &mut MockState, db: &str, id: &str, body: &Bytes) -> Response {
    let mut doc: Map<String, Value> = match serde_json::from_slice(body) {
        Ok(doc) => doc,
        Err(_) => return error(StatusCode::BAD_REQUEST, "bad_request", "Document must be a JSON object"),
    };

    let current = state.dbs.get(db).and_then(|d| d.docs.get(id)).and_then(|d| d["_rev"].as_str()).map(str::to_string);
    let supplied = doc.get("_rev").and_then(Value::as_str).map(str::to_string);
    if current != supplied {
        return error(StatusCode::CONFLICT, "conflict", "Document update conflict.");
    }

    let rev = state.next_rev(current.as_deref());
    doc.insert("_id".to_string(), json!(id));
    doc.insert("_rev".to_string(), json!(rev));
    let seq = state.next_counter();

    let Some(mock_db) = state.dbs.get_mut(db) else {
        return not_found();
    };
    mock_db.docs.insert(id.to_string(), Value::Object(doc));
    mock_db
        .changes
        .push(json!({"seq": seq, "id": id, "changes": [{"rev": rev}]}));

    (StatusCode::CREATED, Json(json!({"ok": true, "id": id, "rev": rev}))).into_response()
}

fn document(state: &mut MockState, method: &Method, uri: &Uri, db: &str, id: &str, body: &Bytes) -> Response {
    if !state.dbs.contains_key(db) {
        return not_found();
    }

    match *method {
        Method::GET => match state.dbs[db].docs.get(id) {
            Some(doc) => Json(doc.clone()).into_response(),
            None => not_found(),
        },
        Method::HEAD => match state.dbs[db].docs.get(id) {
            Some(doc) => {
                let etag = format!("\"{}\"", doc["_rev"].as_str().unwrap_or_default());
                (StatusCode::OK, [(header::ETAG, etag)]).into_response()
            }
            None => not_found(),
        },
        Method::PUT => write_document(state, db, id, body),
        Method::DELETE => {
            let Some(current) = state.dbs[db].docs.get(id).map(|d| d["_rev"].as_str().unwrap_or_default().to_string()) else {
                return not_found();
            };
            if query_param(uri, "rev").as_deref() != Some(current.as_str()) {
                return error(StatusCode::CONFLICT, "conflict", "Document update conflict.");
            }
            let rev = state.next_rev(Some(&current));
            let seq = state.next_counter();
            let mock_db = state.dbs.get_mut(db).unwrap();
            mock_db.docs.remove(id);
            mock_db.changes.push(json!({"seq": seq, "id": id, "changes": [{"rev": rev}], "deleted": true}));
            Json(json!({"ok": true, "id": id, "rev": rev})).into_response()
        }
        _ => error(StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed", "Only DELETE,GET,HEAD,PUT allowed"),
    }
}

fn requested_keys(method: &Method, body: &Bytes) -> Option<Vec<Value>> {
    if *method != Method::POST {
        return None;
    }
    let body: Value = serde_json::from_slice(body).ok()?;
    body["keys"].as_array().cloned()
}

fn all_docs(state: &MockState, method: &Method, db: &str, body: &Bytes) -> Response {
    let Some(mock_db) = state.dbs.get(db) else {
        return not_found();
    };

    let row = |id: &str, doc: &Value| json!({"id": id, "key": id, "value": {"rev": doc["_rev"]}});
    let rows: Vec<Value> = match requested_keys(method, body) {
        Some(keys) => keys
            .iter()
            .filter_map(|k| k.as_str())
            .filter_map(|id| mock_db.docs.get(id).map(|doc| row(id, doc)))
            .collect(),
        None => mock_db.docs.iter().map(|(id, doc)| row(id, doc)).collect(),
    };

    Json(json!({"total_rows": mock_db.docs.len(), "offset": 0, "rows": rows})).into_response()
}

/// Views named `by_<field>` emit `(doc[field], null)` for every document
/// that has the field, sorted by key then id.
fn run_view(state: &MockState, method: &Method, db: &str, view: &str, body: &Bytes) -> Response {
    let Some(mock_db) = state.dbs.get(db) else {
        return not_found();
    };
    let Some(field) = view.strip_prefix("by_") else {
        return error(StatusCode::NOT_FOUND, "not_found", "missing_named_view");
    };

    let mut rows: Vec<(String, Value, String)> = mock_db
        .docs
        .iter()
        .filter_map(|(id, doc)| doc.get(field).map(|k| (k.to_string(), k.clone(), id.clone())))
        .collect();
    rows.sort_by(|a, b| (&a.0, &a.2).cmp(&(&b.0, &b.2)));

    if let Some(keys) = requested_keys(method, body) {
        rows.retain(|(_, key, _)| keys.contains(key));
    }

    let rows: Vec<Value> = rows
        .into_iter()
        .map(|(_, key, id)| json!({"id": id, "key": key, "value": null}))
        .collect();
    Json(json!({"total_rows": rows.len(), "offset": 0, "rows": rows})).into_response()
}

fn continuous_feed(state: &mut MockState, db: &str, hold_open: bool) -> Response {
    let chunks: Vec<Bytes> = match state.raw_feed.take() {
        Some(chunks) => chunks,
        None => match state.dbs.get(db) {
            Some(mock_db) => mock_db
                .changes
                .iter()
                .map(|c| Bytes::from(format!("{}\n", c)))
                .collect(),
            None => return not_found(),
        },
    };

    let body = futures::stream::iter(chunks.into_iter().map(Ok::<_, std::io::Error>));
    let body = if hold_open {
        Body::from_stream(
            body.chain(futures::stream::iter([Ok(Bytes::from_static(b"\n"))]))
                .chain(futures::stream::pending()),
        )
    } else {
        Body::from_stream(body)
    };

    (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}
