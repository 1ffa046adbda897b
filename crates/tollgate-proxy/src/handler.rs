//! Axum routes for the metered endpoints

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{OriginalUri, State};
use axum::response::Response;
use axum::{Router, routing};
use bytes::Bytes;
use http::{HeaderMap, Uri};
use tollgate_config::MountConfig;

use crate::error::ProxyError;
use crate::meter::MeterContext;
use crate::relay;
use crate::state::ProxyState;
use crate::transform::{self, RequestBody};

/// Metered upstream endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `POST /v1/chat/completions`
    ChatCompletions,
    /// `POST /v1/responses`
    Responses,
}

impl Endpoint {
    pub const ALL: [Self; 2] = [Self::ChatCompletions, Self::Responses];

    pub const fn path(self) -> &'static str {
        match self {
            Self::ChatCompletions => "/v1/chat/completions",
            Self::Responses => "/v1/responses",
        }
    }
}

#[derive(Clone)]
struct MountState {
    proxy: ProxyState,
    mount: Arc<MountConfig>,
}

/// Build the router for one mount point
pub fn proxy_router(state: ProxyState, mount: &MountConfig) -> Router {
    let mount_state = MountState {
        proxy: state,
        mount: Arc::new(mount.clone()),
    };

    let mut router = Router::new();

    for endpoint in Endpoint::ALL {
        let path = format!("{}{}", mount.prefix, endpoint.path());
        router = router.route(
            &path,
            routing::post(
                move |State(state): State<MountState>, OriginalUri(uri): OriginalUri, headers: HeaderMap, body: Bytes| {
                    proxy(state, endpoint, uri, headers, body)
                },
            ),
        );
    }

    router.with_state(mount_state)
}

/// Run one request through the pipeline
///
/// Gates run in order and each failure short-circuits: model lookup (no
/// I/O), caller identity, credit check. Only then is the upstream called.
async fn proxy(state: MountState, endpoint: Endpoint, uri: Uri, headers: HeaderMap, body: Bytes) -> Result<Response, ProxyError> {
    let started = Instant::now();
    let MountState { proxy, mount } = state;

    let request = RequestBody::parse(&body)?;
    let route = proxy.registry().get(request.model())?;

    let caller = proxy.auth().identify(&headers, route.requires_auth).await?;
    proxy.credits().check(&caller, route.requires_auth, &mount).await?;

    let path = uri.path().strip_prefix(mount.prefix.as_str()).unwrap_or_else(|| uri.path());
    let url = match uri.query() {
        Some(query) => route.upstream_url(&format!("{path}?{query}"))?,
        None => route.upstream_url(path)?,
    };

    let upstream_headers = transform::upstream_headers(&headers, &route)?;
    let stream = request.stream();
    let upstream_body = request.into_upstream(&route, endpoint)?;

    tracing::debug!(model = %route.id, upstream = %url, stream, "forwarding request");

    let response = proxy.upstream().post(url, upstream_headers, upstream_body).await?;

    let free = !route.requires_auth || caller.workspace_id().is_some_and(|workspace_id| mount.is_free(workspace_id));
    let context = MeterContext {
        model_id: route.id.clone(),
        caller,
        pricing: route.pricing,
        free,
        stream,
        started,
    };

    if stream {
        Ok(relay::streaming(response, proxy.meter().clone(), context))
    } else {
        relay::buffered(response, proxy.meter(), context).await
    }
}
