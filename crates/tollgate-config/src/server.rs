use std::collections::BTreeSet;
use std::net::SocketAddr;

use serde::Deserialize;

use crate::health::HealthConfig;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub listen_address: Option<SocketAddr>,
    #[serde(default)]
    pub health: HealthConfig,
    /// Proxy mount points, each with its own credit policy
    #[serde(default)]
    pub mounts: Vec<MountConfig>,
}

/// A proxy mount point (e.g. `/zen` or `/gateway`)
///
/// Routes `POST {prefix}/v1/chat/completions` and `POST {prefix}/v1/responses`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MountConfig {
    /// Path prefix stripped before forwarding upstream
    pub prefix: String,
    /// Reject paid requests from workspaces with a non-positive balance
    #[serde(default = "default_enforce_credits")]
    pub enforce_credits: bool,
    /// Workspaces exempt from balance checks and charges on this mount
    #[serde(default)]
    pub free_workspaces: BTreeSet<String>,
}

impl MountConfig {
    /// Whether a workspace is on this mount's free-tier allow-list
    pub fn is_free(&self, workspace_id: &str) -> bool {
        self.free_workspaces.contains(workspace_id)
    }
}

#[allow(clippy::missing_const_for_fn)]
fn default_enforce_credits() -> bool {
    true
}
