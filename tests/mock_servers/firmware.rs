//! Mock metering firmware for testing
//!
//! Serves `/config`, `/status`, `/device/action` and the two upload endpoints,
//! recording every write so tests can assert on what the console sent.

use axum::{
    extract::{Multipart, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// One multipart upload as received by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpload {
    pub path: String,
    pub field: String,
    pub file_name: String,
    pub len: usize,
}

/// Cache headers seen on a request.
#[derive(Debug, Clone, Default)]
pub struct CacheHeaders {
    pub cache_control: Option<String>,
    pub pragma: Option<String>,
}

#[derive(Default)]
struct MockFirmwareState {
    config: Value,
    status: Value,
    config_posts: Vec<Value>,
    actions: Vec<Value>,
    uploads: Vec<RecordedUpload>,
    status_requests: usize,
    cache_headers: Vec<CacheHeaders>,
    fail_config_get: bool,
    fail_config_post: bool,
    fail_status: bool,
    fail_actions: bool,
    fail_uploads: bool,
    action_delay: Option<Duration>,
}

type SharedState = Arc<RwLock<MockFirmwareState>>;

/// Mock firmware HTTP server
pub struct MockFirmware {
    addr: SocketAddr,
    state: SharedState,
    handle: JoinHandle<()>,
}

impl MockFirmware {
    /// Start a mock firmware on a random port
    pub async fn start() -> Self {
        let state = Arc::new(RwLock::new(MockFirmwareState {
            config: json!({ "format": 1, "network": {}, "devices": [] }),
            status: json!({ "version": "mock-1.0", "devices": [] }),
            ..Default::default()
        }));

        let app = Router::new()
            .route("/config", get(get_config).post(post_config))
            .route("/status", get(get_status))
            .route("/device/action", post(post_action))
            .route("/ota", post(post_firmware))
            .route("/ota/public", post(post_public))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL for `HttpBackend`
    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub async fn set_config(&self, config: Value) {
        self.state.write().await.config = config;
    }

    pub async fn set_status(&self, status: Value) {
        self.state.write().await.status = status;
    }

    pub async fn fail_config_get(&self, fail: bool) {
        self.state.write().await.fail_config_get = fail;
    }

    pub async fn fail_config_post(&self, fail: bool) {
        self.state.write().await.fail_config_post = fail;
    }

    pub async fn fail_status(&self, fail: bool) {
        self.state.write().await.fail_status = fail;
    }

    pub async fn fail_actions(&self, fail: bool) {
        self.state.write().await.fail_actions = fail;
    }

    pub async fn fail_uploads(&self, fail: bool) {
        self.state.write().await.fail_uploads = fail;
    }

    /// Hold every `/device/action` response for `delay`
    pub async fn set_action_delay(&self, delay: Duration) {
        self.state.write().await.action_delay = Some(delay);
    }

    /// Bodies of every `POST /config`, oldest first
    pub async fn config_posts(&self) -> Vec<Value> {
        self.state.read().await.config_posts.clone()
    }

    pub async fn actions(&self) -> Vec<Value> {
        self.state.read().await.actions.clone()
    }

    pub async fn uploads(&self) -> Vec<RecordedUpload> {
        self.state.read().await.uploads.clone()
    }

    pub async fn status_requests(&self) -> usize {
        self.state.read().await.status_requests
    }

    pub async fn cache_headers(&self) -> Vec<CacheHeaders> {
        self.state.read().await.cache_headers.clone()
    }

    /// Stop the mock server
    pub async fn stop(self) {
        self.handle.abort();
    }
}

fn cache_headers(headers: &HeaderMap) -> CacheHeaders {
    let read = |name| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    CacheHeaders {
        cache_control: read(header::CACHE_CONTROL),
        pragma: read(header::PRAGMA),
    }
}

async fn get_config(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    let mut state = state.write().await;
    state.cache_headers.push(cache_headers(&headers));
    if state.fail_config_get {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    Ok(Json(state.config.clone()))
}

async fn post_config(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    let mut state = state.write().await;
    state.cache_headers.push(cache_headers(&headers));
    if state.fail_config_post {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    state.config_posts.push(body.clone());
    state.config = body;
    StatusCode::OK
}

async fn get_status(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    let mut state = state.write().await;
    state.status_requests += 1;
    state.cache_headers.push(cache_headers(&headers));
    if state.fail_status {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    Ok(Json(state.status.clone()))
}

async fn post_action(State(state): State<SharedState>, Json(body): Json<Value>) -> StatusCode {
    let delay = state.read().await.action_delay;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    let mut state = state.write().await;
    if state.fail_actions {
        return StatusCode::BAD_GATEWAY;
    }
    state.actions.push(body);
    StatusCode::OK
}

async fn post_firmware(State(state): State<SharedState>, multipart: Multipart) -> StatusCode {
    record_upload(state, "/ota", multipart).await
}

async fn post_public(State(state): State<SharedState>, multipart: Multipart) -> StatusCode {
    record_upload(state, "/ota/public", multipart).await
}

async fn record_upload(state: SharedState, path: &str, mut multipart: Multipart) -> StatusCode {
    let mut received = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().unwrap_or_default().to_string();
        let Ok(bytes) = field.bytes().await else {
            return StatusCode::BAD_REQUEST;
        };
        received.push(RecordedUpload {
            path: path.to_string(),
            field: name,
            file_name,
            len: bytes.len(),
        });
    }

    let mut state = state.write().await;
    if state.fail_uploads {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    state.uploads.extend(received);
    StatusCode::OK
}
