//! Mock upstream provider for integration tests
//!
//! Serves canned chat-completions and responses bodies, buffered or as SSE
//! delivered in caller-chosen raw chunks.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use tokio_util::sync::CancellationToken;

/// Usage event for a streamed chat completion: 100 prompt, 50 completion tokens
pub const CHAT_USAGE_EVENT: &str =
    "data: {\"id\":\"chatcmpl-1\",\"choices\":[],\"usage\":{\"prompt_tokens\":100,\"completion_tokens\":50,\"total_tokens\":150}}\n\n";

/// Mock upstream that returns predictable responses
pub struct MockUpstream {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

struct MockState {
    request_count: AtomicU32,
    buffered: serde_json::Value,
    stream_chunks: Vec<Bytes>,
    last_body: Mutex<Option<serde_json::Value>>,
    last_headers: Mutex<Option<HeaderMap>>,
}

impl MockUpstream {
    /// Start a mock whose buffered body reports 100 input and 50 output tokens
    pub async fn start() -> anyhow::Result<Self> {
        let buffered = serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": "Hello!" } }],
            "usage": { "prompt_tokens": 100, "completion_tokens": 50, "total_tokens": 150 }
        });
        Self::start_inner(buffered, default_stream()).await
    }

    /// Start a mock with a custom buffered body
    pub async fn start_with_body(buffered: serde_json::Value) -> anyhow::Result<Self> {
        Self::start_inner(buffered, default_stream()).await
    }

    /// Start a mock that streams `stream` split at the given byte offsets
    pub async fn start_with_stream(stream: &str, cuts: &[usize]) -> anyhow::Result<Self> {
        let mut chunks = Vec::new();
        let mut start = 0;
        for &cut in cuts {
            chunks.push(Bytes::copy_from_slice(&stream.as_bytes()[start..cut]));
            start = cut;
        }
        chunks.push(Bytes::copy_from_slice(&stream.as_bytes()[start..]));

        Self::start_inner(serde_json::Value::Null, chunks).await
    }

    async fn start_inner(buffered: serde_json::Value, stream_chunks: Vec<Bytes>) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            request_count: AtomicU32::new(0),
            buffered,
            stream_chunks,
            last_body: Mutex::new(None),
            last_headers: Mutex::new(None),
        });

        let app = Router::new()
            .route("/v1/chat/completions", routing::post(handle))
            .route("/v1/responses", routing::post(handle))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL to use as a model's `base_url`
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Total requests received
    pub fn request_count(&self) -> u32 {
        self.state.request_count.load(Ordering::Relaxed)
    }

    /// JSON body of the most recent request
    pub fn last_body(&self) -> Option<serde_json::Value> {
        self.state.last_body.lock().unwrap().clone()
    }

    /// Headers of the most recent request
    pub fn last_headers(&self) -> Option<HeaderMap> {
        self.state.last_headers.lock().unwrap().clone()
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn default_stream() -> Vec<Bytes> {
    vec![
        Bytes::from_static(b"data: {\"id\":\"chatcmpl-1\",\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n"),
        Bytes::from_static(CHAT_USAGE_EVENT.as_bytes()),
        Bytes::from_static(b"data: [DONE]\n\n"),
    ]
}

async fn handle(State(state): State<Arc<MockState>>, headers: HeaderMap, Json(body): Json<serde_json::Value>) -> Response {
    state.request_count.fetch_add(1, Ordering::Relaxed);
    let stream = body.get("stream").and_then(serde_json::Value::as_bool).unwrap_or(false);
    *state.last_body.lock().unwrap() = Some(body);
    *state.last_headers.lock().unwrap() = Some(headers);

    if !stream {
        return (StatusCode::OK, Json(state.buffered.clone())).into_response();
    }

    // Deliver each chunk as its own write with a pause between them
    let chunks = state.stream_chunks.clone();
    let body = futures_util::stream::unfold(chunks.into_iter(), |mut chunks| async move {
        let chunk = chunks.next()?;
        tokio::time::sleep(Duration::from_millis(5)).await;
        Some((Ok::<_, std::io::Error>(chunk), chunks))
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(body))
        .unwrap()
}
