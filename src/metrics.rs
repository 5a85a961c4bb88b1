use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus exporter and register all sync metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    // Pre-register counters so they appear even before the first increment.
    counter!("sync_runs_total").absolute(0);
    counter!("sync_failures_total").absolute(0);
    counter!("signatures_discovered_total").absolute(0);
    counter!("events_stored_total").absolute(0);
    counter!("decode_defects_total").absolute(0);
    counter!("transactions_not_found_total").absolute(0);
    counter!("batch_retries_total").absolute(0);
    counter!("price_failures_total").absolute(0);

    // Histogram is lazily created on first record; force creation.
    histogram!("sync_duration_seconds").record(0.0);

    Ok(handle)
}
