#![allow(clippy::must_use_candidate)]

pub mod auth;
pub mod billing;
mod env;
pub mod health;
mod loader;
pub mod model;
pub mod server;
pub mod telemetry;

use indexmap::IndexMap;
use serde::Deserialize;

pub use auth::*;
pub use billing::*;
pub use health::*;
pub use model::*;
pub use server::*;
pub use telemetry::*;

/// Top-level tollgate configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Listener, health check and proxy mounts
    #[serde(default)]
    pub server: ServerConfig,
    /// Upstream model registry keyed by the client-facing model ID
    #[serde(default)]
    pub models: IndexMap<String, ModelConfig>,
    /// API key store
    #[serde(default)]
    pub auth: KeyStoreConfig,
    /// Prepaid balance ledger
    #[serde(default)]
    pub billing: LedgerConfig,
    /// Logging and trace export
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}
