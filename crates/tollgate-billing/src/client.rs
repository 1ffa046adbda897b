use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tollgate_config::RemoteLedgerConfig;
use url::Url;

use crate::error::BillingError;
use crate::ledger::Ledger;
use crate::types::{BalanceResponse, Charge, RecordsResponse, UsageRecord};

/// Header carrying the gateway's shared secret
const GATEWAY_SECRET_HEADER: &str = "x-gateway-secret";

/// Async HTTP client for the billing service
///
/// The service owns the balance rows; each charge is applied there as a
/// single transaction keyed by the usage record ID.
#[derive(Clone)]
pub struct RemoteLedger {
    http: reqwest::Client,
    base_url: Url,
    secret: SecretString,
}

impl RemoteLedger {
    /// Create a new billing client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(base_url: Url, secret: SecretString, tls_skip_verify: bool) -> Result<Self, BillingError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .danger_accept_invalid_certs(tls_skip_verify)
            .build()
            .map_err(BillingError::Request)?;

        Ok(Self {
            http,
            base_url,
            secret,
        })
    }

    /// Build from the `[billing]` section
    pub fn from_config(config: &RemoteLedgerConfig) -> Result<Self, BillingError> {
        Self::new(config.api_url.clone(), config.secret.clone(), config.tls_skip_verify)
    }

    fn endpoint(&self, path: &str) -> Result<Url, BillingError> {
        self.base_url.join(path).map_err(|e| BillingError::Api {
            status: 0,
            message: format!("invalid URL: {e}"),
        })
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, BillingError> {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            Err(BillingError::Api { status, message })
        }
    }
}

#[async_trait]
impl Ledger for RemoteLedger {
    /// GET `/internal/balances/:workspaceId`
    async fn balance(&self, workspace_id: &str) -> Result<i64, BillingError> {
        let response = self
            .http
            .get(self.endpoint(&format!("internal/balances/{workspace_id}"))?)
            .header(GATEWAY_SECRET_HEADER, self.secret.expose_secret())
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(0);
        }

        let body: BalanceResponse = Self::decode(response).await?;
        Ok(body.balance_micro_cents)
    }

    /// POST `/internal/balances/:workspaceId/charges`
    async fn charge(&self, charge: Charge) -> Result<UsageRecord, BillingError> {
        let record = UsageRecord::from(charge);
        let url = self.endpoint(&format!("internal/balances/{}/charges", record.workspace_id))?;

        let response = self
            .http
            .post(url)
            .header(GATEWAY_SECRET_HEADER, self.secret.expose_secret())
            .header("idempotency-key", record.id.to_string())
            .json(&record)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(record)
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            Err(BillingError::Api { status, message })
        }
    }

    /// GET `/internal/balances/:workspaceId/charges`
    async fn records(&self, workspace_id: &str) -> Result<Vec<UsageRecord>, BillingError> {
        let response = self
            .http
            .get(self.endpoint(&format!("internal/balances/{workspace_id}/charges"))?)
            .header(GATEWAY_SECRET_HEADER, self.secret.expose_secret())
            .send()
            .await?;

        let body: RecordsResponse = Self::decode(response).await?;
        Ok(body.records)
    }
}

impl std::fmt::Debug for RemoteLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteLedger")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
