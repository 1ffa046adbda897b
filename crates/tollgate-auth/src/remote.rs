use std::time::Duration;

use async_trait::async_trait;
use jiff::Timestamp;
use mini_moka::sync::Cache;
use secrecy::{ExposeSecret, SecretString};
use tollgate_config::RemoteKeyStoreConfig;
use tollgate_core::ApiKeyRecord;
use url::Url;

use crate::store::{KeyStore, sha256_hex};
use crate::AuthError;

/// Header carrying the gateway's shared secret
const GATEWAY_SECRET_HEADER: &str = "x-gateway-secret";

/// Resolves API keys through the account service with caching
#[derive(Clone)]
pub struct RemoteKeyStore {
    http: reqwest::Client,
    api_url: Url,
    secret: SecretString,
    cache: Cache<String, ApiKeyRecord>,
}

impl RemoteKeyStore {
    /// Create a new remote key store
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(
        api_url: Url,
        secret: SecretString,
        cache_ttl: Duration,
        cache_capacity: u64,
        tls_skip_verify: bool,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .danger_accept_invalid_certs(tls_skip_verify)
            .build()?;

        let cache = Cache::builder()
            .time_to_live(cache_ttl)
            .max_capacity(cache_capacity)
            .build();

        Ok(Self {
            http,
            api_url,
            secret,
            cache,
        })
    }

    /// Build from the `[auth]` section
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn from_config(config: &RemoteKeyStoreConfig) -> anyhow::Result<Self> {
        Self::new(
            config.api_url.clone(),
            config.secret.clone(),
            Duration::from_secs(config.cache_ttl_seconds),
            config.cache_capacity,
            config.tls_skip_verify,
        )
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        self.api_url.join(path).map_err(|e| AuthError::Api {
            status: 0,
            message: format!("invalid URL: {e}"),
        })
    }
}

#[async_trait]
impl KeyStore for RemoteKeyStore {
    async fn lookup(&self, secret: &str) -> Result<Option<ApiKeyRecord>, AuthError> {
        let cache_key = sha256_hex(secret);

        if let Some(cached) = self.cache.get(&cache_key) {
            return Ok(Some(cached));
        }

        let response = self
            .http
            .post(self.endpoint("internal/keys/resolve")?)
            .header(GATEWAY_SECRET_HEADER, self.secret.expose_secret())
            .json(&serde_json::json!({ "key": secret }))
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AuthError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let record: ApiKeyRecord = response.json().await.map_err(|e| AuthError::Api {
            status: 0,
            message: format!("failed to parse response: {e}"),
        })?;

        self.cache.insert(cache_key, record.clone());

        Ok(Some(record))
    }

    async fn touch(&self, key_id: &str, at: Timestamp) -> Result<(), AuthError> {
        let response = self
            .http
            .post(self.endpoint(&format!("internal/keys/{key_id}/touch"))?)
            .header(GATEWAY_SECRET_HEADER, self.secret.expose_secret())
            .json(&serde_json::json!({ "usedAt": at }))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            Err(AuthError::Api { status, message })
        }
    }
}

impl std::fmt::Debug for RemoteKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteKeyStore")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}
