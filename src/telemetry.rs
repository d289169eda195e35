//! Logging, metrics export and trace export for synth-dns.
//!
//! The `fmt` layer is always on. The Prometheus exporter needs the
//! `prometheus` feature and `telemetry.prometheus_addr`; OTLP span export
//! needs the `otel` feature and a `[telemetry.opentelemetry]` table.

#[cfg(feature = "prometheus")]
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::TelemetryConfig;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Flushes exporters when dropped; keep it alive for the life of the process.
#[must_use = "dropping the guard flushes and stops trace export"]
pub struct TelemetryGuard {
    #[cfg(feature = "otel")]
    provider: Option<opentelemetry_sdk::trace::SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        #[cfg(feature = "otel")]
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                tracing::warn!("Error shutting down tracer provider: {}", e);
            }
        }
    }
}

/// Install the global subscriber and any configured exporters.
///
/// `RUST_LOG` overrides `telemetry.log_level` when set.
pub fn init(config: &TelemetryConfig) -> Result<TelemetryGuard, BoxError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    #[cfg(feature = "otel")]
    let (otel_layer, provider) = match config.opentelemetry {
        Some(ref otel) => {
            let provider = tracer_provider(otel)?;
            use opentelemetry::trace::TracerProvider;
            let tracer = provider.tracer("synth-dns");
            (
                Some(tracing_opentelemetry::layer().with_tracer(tracer)),
                Some(provider),
            )
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true));

    #[cfg(feature = "otel")]
    registry.with(otel_layer).try_init()?;
    #[cfg(not(feature = "otel"))]
    registry.try_init()?;

    #[cfg(feature = "otel")]
    if let Some(ref otel) = config.opentelemetry {
        info!(endpoint = %otel.endpoint, service = %otel.service_name, "OpenTelemetry tracing enabled");
    }

    #[cfg(feature = "prometheus")]
    if let Some(addr) = config.prometheus_addr {
        start_prometheus_exporter(addr)?;
    }

    info!(log_level = %config.log_level, "telemetry initialized");

    Ok(TelemetryGuard {
        #[cfg(feature = "otel")]
        provider,
    })
}

#[cfg(feature = "otel")]
fn tracer_provider(
    config: &crate::config::OpenTelemetryConfig,
) -> Result<opentelemetry_sdk::trace::SdkTracerProvider, BoxError> {
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
    use opentelemetry_sdk::{trace::SdkTracerProvider, Resource};

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.endpoint)
        .build()?;

    let resource = Resource::builder()
        .with_attributes([
            KeyValue::new(SERVICE_NAME, config.service_name.clone()),
            KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
        ])
        .build();

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build())
}

#[cfg(feature = "prometheus")]
fn start_prometheus_exporter(addr: SocketAddr) -> Result<(), BoxError> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    crate::metrics::describe();

    info!(%addr, "Prometheus metrics exporter started");
    Ok(())
}
