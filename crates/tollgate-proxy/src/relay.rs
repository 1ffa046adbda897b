//! Response relay
//!
//! Streamed bodies are forwarded chunk by chunk while a [`StreamDecoder`]
//! watches the same bytes for usage. Buffered bodies are parsed, metered
//! and re-serialized.

use std::io;
use std::pin::Pin;

use axum::body::Body;
use axum::response::Response;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use http::{HeaderMap, StatusCode};
use tollgate_billing::UsageRecord;
use tollgate_core::relay_response_headers;

use crate::error::ProxyError;
use crate::meter::{MeterContext, UsageMeter};
use crate::sse::StreamDecoder;
use crate::usage;

struct PendingCharge {
    meter: UsageMeter,
    context: MeterContext,
    decoder: StreamDecoder,
}

impl PendingCharge {
    async fn settle(mut self) -> Option<UsageRecord> {
        let usage = self.decoder.finish();
        self.meter.settle(&self.context, usage).await
    }
}

/// Charge owed by a streamed response, settled exactly once
///
/// Settles when the upstream body ends or fails. If the relay is dropped
/// first (the caller disconnected), the usage observed so far is settled
/// on a task tracked by the meter's [`TaskTracker`].
///
/// [`TaskTracker`]: tokio_util::task::TaskTracker
pub struct Settlement {
    pending: Option<PendingCharge>,
}

impl Settlement {
    pub fn new(meter: UsageMeter, context: MeterContext) -> Self {
        Self {
            pending: Some(PendingCharge {
                meter,
                context,
                decoder: StreamDecoder::new(),
            }),
        }
    }

    fn observe(&mut self, chunk: &[u8]) {
        if let Some(pending) = &mut self.pending {
            pending.decoder.feed(chunk);
        }
    }

    async fn settle(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.settle().await;
        }
    }
}

impl Drop for Settlement {
    fn drop(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };

        tracing::debug!(
            model = %pending.context.model_id,
            events = pending.decoder.events(),
            "stream dropped before completion, settling observed usage"
        );

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let tasks = pending.meter.tasks().clone();
                tasks.spawn_on(pending.settle(), &handle);
            }
            Err(_) => {
                tracing::error!(model = %pending.context.model_id, "no runtime to settle dropped stream");
            }
        }
    }
}

struct RelayState<S> {
    upstream: Pin<Box<S>>,
    settlement: Settlement,
    done: bool,
}

/// Wrap an upstream byte stream so it is metered as it is relayed
///
/// Each upstream chunk is yielded unchanged. The next upstream read is
/// only issued once the caller pulls again.
pub fn metered_body<S, E>(upstream: S, settlement: Settlement) -> Body
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = RelayState {
        upstream: Box::pin(upstream),
        settlement,
        done: false,
    };

    let stream = futures_util::stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }

        match state.upstream.next().await {
            Some(Ok(chunk)) => {
                state.settlement.observe(&chunk);
                Some((Ok(chunk), state))
            }
            Some(Err(e)) => {
                let message = e.to_string();
                tracing::warn!(error = %message, "upstream stream failed");
                state.done = true;
                state.settlement.settle().await;
                Some((Err(io::Error::other(message)), state))
            }
            None => {
                state.settlement.settle().await;
                None
            }
        }
    });

    Body::from_stream(stream)
}

/// Relay a streamed upstream response
///
/// Non-2xx responses are relayed as-is and not metered.
pub fn streaming(response: reqwest::Response, meter: UsageMeter, context: MeterContext) -> Response {
    let status = response.status();
    let headers = relay_response_headers(response.headers());

    if !status.is_success() {
        tracing::warn!(%status, model = %context.model_id, "upstream rejected streamed request");
        return build(status, headers, Body::from_stream(response.bytes_stream()));
    }

    let body = metered_body(response.bytes_stream(), Settlement::new(meter, context));
    build(status, headers, body)
}

/// Relay a buffered upstream response
///
/// Server errors and non-JSON bodies become [`ProxyError::Upstream`].
/// Client errors are relayed with their status and not metered.
pub async fn buffered(response: reqwest::Response, meter: &UsageMeter, context: MeterContext) -> Result<Response, ProxyError> {
    let status = response.status();
    let headers = relay_response_headers(response.headers());

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ProxyError::Upstream(format!("failed to read upstream body: {e}")))?;

    if status.is_server_error() {
        tracing::warn!(%status, model = %context.model_id, body = %String::from_utf8_lossy(&bytes), "upstream server error");
        return Err(ProxyError::Upstream(format!("upstream returned {status}")));
    }

    let json: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| ProxyError::Upstream(format!("upstream returned a non-JSON body ({e})")))?;

    if status.is_success() {
        meter.settle(&context, usage::extract(&json)).await;
    } else {
        tracing::debug!(%status, model = %context.model_id, "relaying upstream client error");
    }

    let body = serde_json::to_vec(&json).map_err(|e| ProxyError::Internal(e.into()))?;

    Ok(build(status, headers, Body::from(body)))
}

fn build(status: StatusCode, headers: HeaderMap, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
