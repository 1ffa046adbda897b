use indexmap::IndexMap;
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Where balances and usage records live
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerConfig {
    /// Process-local ledger seeded from config (dev and tests)
    Memory(MemoryLedgerConfig),
    /// Billing service that owns the balance rows
    Remote(RemoteLedgerConfig),
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::Memory(MemoryLedgerConfig::default())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryLedgerConfig {
    /// Starting balance per workspace, in micro-cents
    #[serde(default)]
    pub balances: IndexMap<String, i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteLedgerConfig {
    /// Base URL of the billing service
    pub api_url: Url,
    /// Shared secret for gateway-to-service calls
    pub secret: SecretString,
    /// Skip TLS certificate verification (dev only)
    #[serde(default)]
    pub tls_skip_verify: bool,
}
