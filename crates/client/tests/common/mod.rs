//! Shared fixtures: a fake Helio service on a local port and a scripted
//! in-memory transport.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{post, put};
use axum::Router;
use serde_json::{Map, Value};

use helio_client::operations::RemoteOperation;
use helio_client::{OperationOutcome, Transport};

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// A URL on a local port nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/graphql")
}

// ---------------------------------------------------------------------------
// Fake GraphQL endpoint
// ---------------------------------------------------------------------------

/// One canned HTTP reply.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub trace_id: Option<&'static str>,
    pub body: String,
}

impl Reply {
    pub fn json(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            trace_id: None,
            body: body.to_string(),
        }
    }

    pub fn status(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            trace_id: None,
            body: body.into(),
        }
    }

    pub fn with_trace(mut self, trace_id: &'static str) -> Self {
        self.trace_id = Some(trace_id);
        self
    }
}

/// A request the fake endpoint received.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub headers: HeaderMap,
    pub body: Value,
}

#[derive(Clone, Default)]
pub struct FakeGraphql {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl FakeGraphql {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into_iter().collect())),
            seen: Arc::default(),
        }
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    /// Start serving; returns the GraphQL endpoint URL.
    pub async fn start(&self) -> String {
        let router = Router::new()
            .route("/graphql", post(graphql))
            .with_state(self.clone());
        format!("{}/graphql", serve(router).await)
    }
}

async fn graphql(State(fake): State<FakeGraphql>, headers: HeaderMap, body: String) -> Response {
    fake.seen.lock().unwrap().push(SeenRequest {
        headers,
        body: serde_json::from_str(&body).unwrap_or(Value::Null),
    });

    let Some(reply) = fake.replies.lock().unwrap().pop_front() else {
        return (StatusCode::INTERNAL_SERVER_ERROR, "no reply scripted").into_response();
    };

    let mut response = (reply.status, reply.body).into_response();
    if let Some(trace_id) = reply.trace_id {
        response
            .headers_mut()
            .insert("trace-id", trace_id.parse().unwrap());
    }
    response
}

// ---------------------------------------------------------------------------
// Fake object storage
// ---------------------------------------------------------------------------

/// In-memory object store addressed as `/objects/{key}`.
#[derive(Clone, Default)]
pub struct ObjectStore {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    content_types: Arc<Mutex<HashMap<String, String>>>,
}

impl ObjectStore {
    pub fn insert(&self, key: &str, bytes: impl Into<Vec<u8>>) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.into());
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.content_types.lock().unwrap().get(key).cloned()
    }

    /// Start serving; returns the base URL (append `/objects/<key>`).
    pub async fn start(&self) -> String {
        let router = Router::new()
            .route("/objects/{key}", put(put_object).get(get_object))
            .route("/status/{code}", put(status_reply).get(status_reply))
            .with_state(self.clone());
        serve(router).await
    }
}

async fn put_object(
    State(store): State<ObjectStore>,
    Path(key): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(ct) = headers.get("content-type").and_then(|v| v.to_str().ok()) {
        store
            .content_types
            .lock()
            .unwrap()
            .insert(key.clone(), ct.to_string());
    }
    store.insert(&key, body.to_vec());
    StatusCode::OK
}

async fn get_object(State(store): State<ObjectStore>, Path(key): Path<String>) -> Response {
    match store.get(&key) {
        Some(bytes) => (StatusCode::OK, bytes).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Answer with the requested status and a long body.
async fn status_reply(Path(code): Path<u16>) -> Response {
    let status = StatusCode::from_u16(code).unwrap();
    (status, "e".repeat(1_000)).into_response()
}

// ---------------------------------------------------------------------------
// Scripted transport
// ---------------------------------------------------------------------------

/// Transport answering from a fixed script, recording every operation.
#[derive(Default)]
pub struct ScriptedTransport {
    outcomes: Mutex<VecDeque<OperationOutcome>>,
    calls: Mutex<Vec<RemoteOperation>>,
}

impl ScriptedTransport {
    pub fn new(outcomes: impl IntoIterator<Item = OperationOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            calls: Mutex::default(),
        }
    }

    pub fn calls(&self) -> Vec<RemoteOperation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn operation_names(&self) -> Vec<&'static str> {
        self.calls().iter().map(|op| op.name).collect()
    }

    pub fn remaining(&self) -> usize {
        self.outcomes.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, operation: &RemoteOperation) -> OperationOutcome {
        self.calls.lock().unwrap().push(operation.clone());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| OperationOutcome::transport_error("script exhausted", ""))
    }
}

/// Successful outcome `{ <root>: <job> }`.
pub fn data(root: &str, job: Value) -> OperationOutcome {
    let mut map = Map::new();
    map.insert(root.to_string(), job);
    OperationOutcome::success(Value::Object(map))
}

/// A job payload with the given status and progress.
pub fn job(id: &str, status: &str, progress: f64) -> Value {
    serde_json::json!({ "id": id, "status": status, "progress": progress })
}

pub fn network_error() -> OperationOutcome {
    OperationOutcome::transport_error("Network error: connection reset", "")
}

/// Progress recorder usable as a `ProgressSink`.
#[derive(Default)]
pub struct Recorder(Mutex<Vec<f64>>);

impl Recorder {
    pub fn values(&self) -> Vec<f64> {
        self.0.lock().unwrap().clone()
    }
}

impl helio_core::progress::ProgressSink for Recorder {
    fn report(&self, percent: f64) {
        self.0.lock().unwrap().push(percent);
    }
}
