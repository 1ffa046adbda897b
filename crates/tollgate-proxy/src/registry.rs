//! Static table of upstream targets
//!
//! Built once from config and shared read-only by every request.

use std::collections::HashMap;
use std::sync::Arc;

use http::HeaderName;
use indexmap::IndexMap;
use secrecy::SecretString;
use tollgate_billing::Pricing;
use tollgate_config::ModelConfig;
use tollgate_core::HeaderRename;
use url::Url;

use crate::error::ProxyError;

/// Resolved upstream target for one client-facing model ID
#[derive(Debug)]
pub struct ModelRoute {
    pub id: String,
    pub base_url: Url,
    pub api_key: Option<SecretString>,
    pub upstream_model: String,
    pub auth_header: HeaderName,
    pub requires_auth: bool,
    pub stream_usage: bool,
    pub renames: Vec<HeaderRename>,
    pub pricing: Pricing,
}

impl ModelRoute {
    /// Build a route from its config entry
    ///
    /// # Errors
    ///
    /// Returns an error if a header name is invalid
    pub fn from_config(id: &str, config: &ModelConfig) -> anyhow::Result<Self> {
        let renames = config
            .headers
            .iter()
            .map(|(from, to)| {
                Ok(HeaderRename {
                    from: HeaderName::try_from(from.as_str())?,
                    to: HeaderName::try_from(to.as_str())?,
                })
            })
            .collect::<Result<Vec<_>, http::header::InvalidHeaderName>>()?;

        Ok(Self {
            id: id.to_owned(),
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            upstream_model: config.upstream_model.clone().unwrap_or_else(|| id.to_owned()),
            auth_header: HeaderName::try_from(config.auth_header.as_str())?,
            requires_auth: config.requires_auth,
            stream_usage: config.stream_usage,
            renames,
            pricing: Pricing::from(&config.cost),
        })
    }

    /// Upstream URL for a request path already stripped of its mount prefix
    ///
    /// `path_and_query` must start with `/`.
    pub fn upstream_url(&self, path_and_query: &str) -> Result<Url, ProxyError> {
        let base = self.base_url.as_str().trim_end_matches('/');

        Url::parse(&format!("{base}{path_and_query}"))
            .map_err(|e| ProxyError::Internal(anyhow::anyhow!("invalid upstream URL for model {}: {e}", self.id)))
    }
}

/// Exact-match lookup from model ID to route
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    routes: Arc<HashMap<String, Arc<ModelRoute>>>,
}

impl ModelRegistry {
    /// Build from the `[models]` table
    ///
    /// # Errors
    ///
    /// Returns an error if any model entry is invalid
    pub fn from_config(models: &IndexMap<String, ModelConfig>) -> anyhow::Result<Self> {
        let routes = models
            .iter()
            .map(|(id, config)| Ok((id.clone(), Arc::new(ModelRoute::from_config(id, config)?))))
            .collect::<anyhow::Result<HashMap<_, _>>>()?;

        Ok(Self {
            routes: Arc::new(routes),
        })
    }

    /// Look up a model; unknown IDs fail without side effects
    pub fn get(&self, model: &str) -> Result<Arc<ModelRoute>, ProxyError> {
        self.routes.get(model).cloned().ok_or_else(|| ProxyError::Model {
            model: model.to_owned(),
        })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
