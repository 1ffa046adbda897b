//! Request rewriting between caller and upstream

use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde_json::{Map, Value};
use tollgate_core::{apply_renames, scrub_request_headers};

use crate::error::ProxyError;
use crate::handler::Endpoint;
use crate::registry::ModelRoute;

/// Caller request body, parsed just enough to route it
#[derive(Debug, Clone)]
pub struct RequestBody {
    fields: Map<String, Value>,
    model: String,
    stream: bool,
}

impl RequestBody {
    /// Parse a JSON object body with a string `model`
    pub fn parse(raw: &[u8]) -> Result<Self, ProxyError> {
        let value: Value =
            serde_json::from_slice(raw).map_err(|e| ProxyError::InvalidRequest(format!("body is not valid JSON ({e})")))?;

        let Value::Object(fields) = value else {
            return Err(ProxyError::InvalidRequest("body must be a JSON object".to_owned()));
        };

        let model = fields
            .get("model")
            .and_then(Value::as_str)
            .ok_or_else(|| ProxyError::InvalidRequest("missing model".to_owned()))?
            .to_owned();

        let stream = fields.get("stream").and_then(Value::as_bool).unwrap_or(false);

        Ok(Self { fields, model, stream })
    }

    /// Client-facing model ID
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether the caller asked for a streamed response
    pub const fn stream(&self) -> bool {
        self.stream
    }

    /// Serialize the body for the upstream
    ///
    /// Swaps in the upstream model name and, for streamed chat
    /// completions, asks the upstream to include usage in the stream.
    pub fn into_upstream(mut self, route: &ModelRoute, endpoint: Endpoint) -> Result<Vec<u8>, ProxyError> {
        self.fields
            .insert("model".to_owned(), Value::String(route.upstream_model.clone()));

        if self.stream && route.stream_usage && endpoint == Endpoint::ChatCompletions {
            let options = self
                .fields
                .entry("stream_options")
                .or_insert_with(|| Value::Object(Map::new()));
            if !options.is_object() {
                *options = Value::Object(Map::new());
            }
            if let Value::Object(options) = options {
                options.insert("include_usage".to_owned(), Value::Bool(true));
            }
        }

        serde_json::to_vec(&self.fields).map_err(|e| ProxyError::Internal(e.into()))
    }
}

/// Build upstream request headers from the caller's headers
///
/// Hop-by-hop headers and the caller's credential are dropped, rename
/// rules are applied and the upstream credential is set.
pub fn upstream_headers(incoming: &HeaderMap, route: &ModelRoute) -> Result<HeaderMap, ProxyError> {
    let mut headers = scrub_request_headers(incoming);
    apply_renames(incoming, &route.renames, &mut headers);

    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if let Some(key) = &route.api_key {
        let raw = if route.auth_header == AUTHORIZATION {
            format!("Bearer {}", key.expose_secret())
        } else {
            key.expose_secret().to_owned()
        };

        let mut value = HeaderValue::try_from(raw).map_err(|_| {
            ProxyError::Internal(anyhow::anyhow!("upstream credential for model {} is not a valid header value", route.id))
        })?;
        value.set_sensitive(true);
        headers.insert(route.auth_header.clone(), value);
    }

    Ok(headers)
}
