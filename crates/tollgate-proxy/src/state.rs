//! Shared state for proxy route handlers

use std::sync::Arc;

use tokio_util::task::TaskTracker;
use tollgate_auth::{AuthGate, KeyStore};
use tollgate_billing::{CreditGate, Ledger};
use tollgate_config::Config;

use crate::meter::UsageMeter;
use crate::registry::ModelRegistry;
use crate::upstream::UpstreamClient;

/// Collaborators shared by every mount
#[derive(Clone)]
pub struct ProxyState {
    inner: Arc<ProxyStateInner>,
}

struct ProxyStateInner {
    registry: ModelRegistry,
    auth: AuthGate,
    credits: CreditGate,
    upstream: UpstreamClient,
    meter: UsageMeter,
    ledger: Arc<dyn Ledger>,
}

impl ProxyState {
    /// Wire the pipeline around explicit collaborators
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream HTTP client cannot be built
    pub fn new(registry: ModelRegistry, keys: Arc<dyn KeyStore>, ledger: Arc<dyn Ledger>) -> anyhow::Result<Self> {
        Ok(Self {
            inner: Arc::new(ProxyStateInner {
                registry,
                auth: AuthGate::new(Arc::clone(&keys)),
                credits: CreditGate::new(Arc::clone(&ledger)),
                upstream: UpstreamClient::new()?,
                meter: UsageMeter::new(Arc::clone(&ledger), keys),
                ledger,
            }),
        })
    }

    /// Build the registry and collaborators described by the config
    ///
    /// # Errors
    ///
    /// Returns an error if a model entry or a collaborator is invalid
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let registry = ModelRegistry::from_config(&config.models)?;
        let keys = tollgate_auth::key_store_from_config(&config.auth)?;
        let ledger = tollgate_billing::ledger_from_config(&config.billing)?;

        Self::new(registry, keys, ledger)
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.inner.registry
    }

    pub(crate) fn auth(&self) -> &AuthGate {
        &self.inner.auth
    }

    pub(crate) fn credits(&self) -> &CreditGate {
        &self.inner.credits
    }

    pub(crate) fn upstream(&self) -> &UpstreamClient {
        &self.inner.upstream
    }

    pub(crate) fn meter(&self) -> &UsageMeter {
        &self.inner.meter
    }

    /// Settlements of dropped streams that are still running
    pub fn settlements(&self) -> &TaskTracker {
        self.inner.meter.tasks()
    }

    /// Ledger that balances are read from and charges written to
    pub fn ledger(&self) -> &Arc<dyn Ledger> {
        &self.inner.ledger
    }
}

impl std::fmt::Debug for ProxyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyState")
            .field("models", &self.inner.registry.len())
            .finish_non_exhaustive()
    }
}
