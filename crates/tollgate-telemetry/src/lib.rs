//! Telemetry for tollgate
//!
//! Log lines go to stdout as text or flat JSON. Spans are optionally
//! exported over OTLP.

mod metadata;

use opentelemetry::global;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tollgate_config::{LogFormat, TelemetryConfig};
use tracing_subscriber::EnvFilter;

/// Guard that flushes and shuts down trace export on drop
pub struct TelemetryGuard {
    tracer_provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer_provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("failed to shutdown tracer provider: {e}");
        }
    }
}

/// Initialize telemetry from configuration
///
/// `RUST_LOG`, when set, takes precedence over `telemetry.filter`. Returns
/// a guard that must be held for the lifetime of the application.
///
/// # Errors
///
/// Returns an error if the filter directive is invalid or the OTLP
/// exporter cannot be built
pub fn init(config: &TelemetryConfig) -> anyhow::Result<TelemetryGuard> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = env_filter(config)?;

    let (text_layer, json_layer) = match config.format {
        LogFormat::Text => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            ),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(false)
                    .with_span_list(false)
                    .with_target(true),
            ),
        ),
    };

    let mut guard = TelemetryGuard { tracer_provider: None };

    let otel_layer = match &config.otlp_endpoint {
        Some(endpoint) => {
            let provider = init_tracer(config, endpoint.as_str())?;
            let tracer = provider.tracer("tollgate");
            global::set_tracer_provider(provider.clone());
            guard.tracer_provider = Some(provider);
            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text_layer)
        .with(json_layer)
        .with(otel_layer)
        .init();

    tracing::debug!(
        format = ?config.format,
        otlp_export = config.otlp_endpoint.is_some(),
        "telemetry initialized"
    );

    Ok(guard)
}

/// Resolve the log filter
fn env_filter(config: &TelemetryConfig) -> anyhow::Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    EnvFilter::try_new(&config.filter)
        .map_err(|e| anyhow::anyhow!("invalid telemetry.filter '{}': {e}", config.filter))
}

/// Initialize OTLP trace export over gRPC
fn init_tracer(config: &TelemetryConfig, endpoint: &str) -> anyhow::Result<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build gRPC span exporter: {e}"))?;

    Ok(SdkTracerProvider::builder()
        .with_resource(metadata::build_resource(config))
        .with_batch_exporter(exporter)
        .build())
}
