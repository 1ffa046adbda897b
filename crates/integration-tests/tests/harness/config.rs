//! Programmatic configuration builder for integration tests

use std::collections::BTreeSet;
use std::net::SocketAddr;

use indexmap::IndexMap;
use secrecy::SecretString;
use tollgate_config::{
    Config, CostTable, HealthConfig, KeyStoreConfig, LedgerConfig, MemoryLedgerConfig, ModelConfig, MountConfig,
    ServerConfig, StaticKeyConfig, StaticKeysConfig,
};

/// Bearer token for the default test key
pub const API_KEY: &str = "sk-test-caller";

/// Workspace billed for [`API_KEY`]
pub const WORKSPACE: &str = "wrk_test";

/// Builder for constructing test configurations
///
/// Starts with one `/zen` mount, one key for [`WORKSPACE`] and an in-memory
/// ledger.
pub struct ConfigBuilder {
    config: Config,
    keys: Vec<StaticKeyConfig>,
    balances: IndexMap<String, i64>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config {
                server: ServerConfig {
                    listen_address: Some(SocketAddr::from(([127, 0, 0, 1], 0))),
                    health: HealthConfig::default(),
                    mounts: vec![MountConfig {
                        prefix: "/zen".to_owned(),
                        enforce_credits: true,
                        free_workspaces: BTreeSet::new(),
                    }],
                },
                ..Config::default()
            },
            keys: Vec::new(),
            balances: IndexMap::new(),
        }
        .with_key(API_KEY, "key_test", WORKSPACE)
    }

    /// Add a paid model priced in USD per million input and output tokens
    pub fn with_model(self, id: &str, base_url: &str, input: f64, output: f64) -> Self {
        self.with_model_config(
            id,
            model(
                base_url,
                CostTable {
                    input,
                    output,
                    ..CostTable::default()
                },
            ),
        )
    }

    /// Add a public model that skips caller identity and credit checks
    pub fn with_free_model(self, id: &str, base_url: &str) -> Self {
        let mut config = model(base_url, CostTable::default());
        config.requires_auth = false;
        self.with_model_config(id, config)
    }

    pub fn with_model_config(mut self, id: &str, config: ModelConfig) -> Self {
        self.config.models.insert(id.to_owned(), config);
        self
    }

    pub fn with_key(mut self, secret: &str, id: &str, workspace_id: &str) -> Self {
        self.keys.push(StaticKeyConfig {
            secret: SecretString::from(secret),
            id: id.to_owned(),
            workspace_id: workspace_id.to_owned(),
        });
        self
    }

    /// Seed a workspace balance in micro-cents
    pub fn with_balance(mut self, workspace_id: &str, balance: i64) -> Self {
        self.balances.insert(workspace_id.to_owned(), balance);
        self
    }

    pub fn with_mount(mut self, mount: MountConfig) -> Self {
        self.config.server.mounts.push(mount);
        self
    }

    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    pub fn build(mut self) -> Config {
        self.config.auth = KeyStoreConfig::Static(StaticKeysConfig { keys: self.keys });
        self.config.billing = LedgerConfig::Memory(MemoryLedgerConfig {
            balances: self.balances,
        });
        self.config
    }
}

fn model(base_url: &str, cost: CostTable) -> ModelConfig {
    ModelConfig {
        base_url: base_url.parse().expect("valid URL"),
        api_key: Some(SecretString::from("sk-upstream")),
        upstream_model: None,
        auth_header: "authorization".to_owned(),
        requires_auth: true,
        stream_usage: true,
        headers: IndexMap::new(),
        cost,
    }
}
