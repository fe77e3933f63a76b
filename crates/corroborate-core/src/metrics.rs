use anyhow::Result;
use once_cell::sync::OnceCell;
use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::{KeyValue, global};
use tracing::info;

pub const METRICS_ENDPOINT_ENV: &str = "CORROBORATE_OTEL_METRICS_ENDPOINT";

struct ProviderMetrics {
    fetches: Counter<u64>,
    duration_ms: Histogram<f64>,
    items: Counter<u64>,
}

static METRICS: OnceCell<ProviderMetrics> = OnceCell::new();

fn handles() -> &'static ProviderMetrics {
    METRICS.get_or_init(|| {
        let meter: Meter = global::meter("corroborate.providers");
        ProviderMetrics {
            fetches: meter
                .u64_counter("provider_fetch_total")
                .with_description("Provider fetches by provider and outcome")
                .init(),
            duration_ms: meter
                .f64_histogram("provider_fetch_duration_ms")
                .with_description("Provider fetch latency in milliseconds")
                .init(),
            items: meter
                .u64_counter("provider_items_total")
                .with_description("Research items contributed per provider")
                .init(),
        }
    })
}

/// Log whether an OTLP endpoint is configured. Exporter wiring belongs to the deployment.
pub fn init_metrics_from_env(service_name: &str) -> Result<()> {
    if let Ok(endpoint) = std::env::var(METRICS_ENDPOINT_ENV) {
        info!(
            target = "telemetry",
            %endpoint,
            "{METRICS_ENDPOINT_ENV} detected for {service_name}; install an OTLP meter provider to export provider metrics"
        );
    }
    Ok(())
}

/// Record one provider fetch. No-op unless a meter provider is installed.
pub fn record_provider_fetch(provider: &str, status: &str, duration_ms: u64, items: usize) {
    let metrics = handles();
    let attrs = [
        KeyValue::new("provider", provider.to_string()),
        KeyValue::new("status", status.to_string()),
    ];

    metrics.fetches.add(1, &attrs);
    metrics.duration_ms.record(duration_ms as f64, &attrs);
    metrics.items.add(items as u64, &attrs);
}
