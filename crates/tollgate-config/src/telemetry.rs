use serde::Deserialize;
use url::Url;

/// Log output and trace export configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive (e.g. `info,tollgate_proxy=debug`)
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Log line format
    #[serde(default)]
    pub format: LogFormat,
    /// Service name attached to exported spans
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// OTLP gRPC endpoint for trace export
    #[serde(default)]
    pub otlp_endpoint: Option<Url>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            format: LogFormat::default(),
            service_name: default_service_name(),
            otlp_endpoint: None,
        }
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One flat JSON object per line
    Json,
}

fn default_filter() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "tollgate".to_string()
}
