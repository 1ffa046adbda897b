use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Where API keys are resolved
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeyStoreConfig {
    /// Keys listed inline in the config file
    Static(StaticKeysConfig),
    /// Keys resolved through the account service
    Remote(RemoteKeyStoreConfig),
}

impl Default for KeyStoreConfig {
    fn default() -> Self {
        Self::Static(StaticKeysConfig::default())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticKeysConfig {
    #[serde(default)]
    pub keys: Vec<StaticKeyConfig>,
}

/// A single inline API key
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticKeyConfig {
    /// Bearer token presented by callers
    pub secret: SecretString,
    /// Key record ID
    pub id: String,
    /// Workspace billed for this key
    pub workspace_id: String,
}

/// Account service key resolution
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteKeyStoreConfig {
    /// Base URL of the account service
    pub api_url: Url,
    /// Shared secret for gateway-to-service calls
    pub secret: SecretString,
    /// Cache TTL in seconds for resolved keys
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
    /// Maximum number of cached key resolutions
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
    /// Skip TLS certificate verification (dev only)
    #[serde(default)]
    pub tls_skip_verify: bool,
}

const fn default_cache_ttl() -> u64 {
    30
}

const fn default_cache_capacity() -> u64 {
    10_000
}
