//! LeadLens Test Utilities
//!
//! An in-process axum server for integration tests. Responses are queued per
//! `(method, path)`; every request is recorded for assertions.
//!
//! # Usage
//!
//! ```rust,ignore
//! use leadlens_test_utils::{StubResponse, StubServer};
//!
//! let server = StubServer::start().await?;
//! server.enqueue("POST", "/api/enrich", StubResponse::json(200, json!({"company_name": "Acme"})));
//! // point the client at server.url()
//! let requests = server.requests();
//! ```

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Canned response for one request.
#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub content_type: String,
    pub body: String,
    /// Wait before answering.
    pub delay: Duration,
}

impl StubResponse {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json".to_string(),
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain".to_string(),
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl IntoResponse for StubResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, [(header::CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}

/// A request captured by the stub server.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name.to_ascii_lowercase())
            .and_then(|value| value.to_str().ok())
    }

    pub fn body_json(&self) -> Result<serde_json::Value> {
        serde_json::from_slice(&self.body).context("request body is not JSON")
    }

    /// Decode an `application/x-www-form-urlencoded` body.
    pub fn form(&self) -> Vec<(String, String)> {
        url::form_urlencoded::parse(&self.body)
            .into_owned()
            .collect()
    }

    pub fn form_value(&self, key: &str) -> Option<String> {
        self.form()
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

type Routes = HashMap<(String, String), VecDeque<StubResponse>>;

#[derive(Clone, Default)]
struct StubState {
    routes: Arc<Mutex<Routes>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// In-process HTTP stub bound to an ephemeral localhost port.
pub struct StubServer {
    addr: SocketAddr,
    state: StubState,
    task: JoinHandle<()>,
}

impl StubServer {
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("Failed to bind stub server")?;
        let addr = listener.local_addr()?;
        let state = StubState::default();

        let app = Router::new()
            .fallback(record_and_respond)
            .with_state(state.clone());
        let task = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                tracing::debug!("stub server stopped: {err}");
            }
        });

        Ok(Self { addr, state, task })
    }

    /// Base URL, e.g. `http://127.0.0.1:41234`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Queue a response. The last queued response for a route is repeated
    /// once the queue is down to one entry.
    pub fn enqueue(&self, method: &str, path: &str, response: StubResponse) {
        lock(&self.state.routes)
            .entry((method.to_ascii_uppercase(), path.to_string()))
            .or_default()
            .push_back(response);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state.requests).clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn record_and_respond(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> StubResponse {
    let key = (method.as_str().to_string(), uri.path().to_string());
    lock(&state.requests).push(RecordedRequest {
        method: key.0.clone(),
        path: key.1.clone(),
        headers,
        body,
    });

    let response = {
        let mut routes = lock(&state.routes);
        match routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        }
    }
    .unwrap_or_else(|| {
        StubResponse::json(
            404,
            serde_json::json!({"detail": format!("no stub for {} {}", key.0, key.1)}),
        )
    });

    if !response.delay.is_zero() {
        tokio::time::sleep(response.delay).await;
    }
    response
}
