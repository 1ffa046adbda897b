use indexmap::IndexMap;
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Configuration for one client-facing model ID
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Upstream base URL; the request path minus the mount prefix is appended
    pub base_url: Url,
    /// Credential injected on every upstream request
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Model name sent upstream (defaults to the client-facing ID)
    #[serde(default)]
    pub upstream_model: Option<String>,
    /// Header carrying the credential; `authorization` gets a `Bearer` scheme
    #[serde(default = "default_auth_header")]
    pub auth_header: String,
    /// Free/public models skip caller identity and credit checks when `false`
    #[serde(default = "default_true")]
    pub requires_auth: bool,
    /// Ask for inline usage on streamed chat completions
    #[serde(default = "default_true")]
    pub stream_usage: bool,
    /// Caller header → upstream header copies
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    /// Per-token pricing
    #[serde(default)]
    pub cost: CostTable,
}

/// Prices in USD per million tokens
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CostTable {
    #[serde(default)]
    pub input: f64,
    #[serde(default)]
    pub output: f64,
    /// Falls back to `output` when unset
    #[serde(default)]
    pub reasoning: Option<f64>,
    #[serde(default)]
    pub cache_read: f64,
    #[serde(default)]
    pub cache_write: f64,
}

impl CostTable {
    /// All configured rates, reasoning resolved
    pub fn rates(&self) -> [f64; 5] {
        [
            self.input,
            self.output,
            self.reasoning.unwrap_or(self.output),
            self.cache_read,
            self.cache_write,
        ]
    }
}

fn default_auth_header() -> String {
    "authorization".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_true() -> bool {
    true
}
