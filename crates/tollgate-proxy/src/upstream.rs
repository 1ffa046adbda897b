use http::HeaderMap;
use url::Url;

use crate::error::ProxyError;

/// Shared HTTP client for upstream requests
///
/// No request timeout is set. Dropping the response cancels the request.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
}

impl UpstreamClient {
    /// Create a new upstream client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new() -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http })
    }

    /// POST a prepared body
    ///
    /// Any response, including non-2xx, is returned to the caller; only
    /// transport failures are errors.
    pub async fn post(&self, url: Url, headers: HeaderMap, body: Vec<u8>) -> Result<reqwest::Response, ProxyError> {
        self.http
            .post(url.clone())
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(upstream = %url, error = %e, "upstream request failed");
                ProxyError::Upstream(e.to_string())
            })
    }
}
