//! Delivery metrics.
//!
//! Counters go through the `metrics` facade. A one-shot run has no scrape
//! endpoint, so the CLI can install a Prometheus recorder and print the
//! snapshot when it finishes.

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Transport labels every per-transport counter is initialized with.
pub const TRANSPORT_LABELS: [&str; 3] = ["sendgrid", "webhook", "smtp"];

/// Register HELP text for every stockmail metric.
pub fn register_metric_descriptions() {
    describe_counter!(
        "stockmail_emails_sent_total",
        "Total number of emails accepted by a transport"
    );
    describe_counter!(
        "stockmail_email_errors_total",
        "Total number of email sends that failed"
    );
    describe_counter!(
        "stockmail_stockout_alerts_total",
        "Total number of out-of-stock alerts sent"
    );
}

/// Set every counter to zero so it shows up before the first event.
pub fn initialize_metrics() {
    for transport in TRANSPORT_LABELS {
        counter!("stockmail_emails_sent_total", "transport" => transport).absolute(0);
        counter!("stockmail_email_errors_total", "transport" => transport).absolute(0);
    }
    counter!("stockmail_stockout_alerts_total").absolute(0);
}

/// Install the global Prometheus recorder and register all metrics.
///
/// Fails if a global recorder is already installed.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metric_descriptions();
    initialize_metrics();
    tracing::debug!("Prometheus recorder installed");
    Ok(handle)
}
