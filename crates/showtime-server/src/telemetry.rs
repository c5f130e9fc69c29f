//! Logging and metrics initialization.

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use showtime_config::ObservabilityConfig;
use showtime_core::{ShowtimeError, ShowtimeResult};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Histogram buckets for `*_duration_seconds` metrics.
const DURATION_BUCKETS: &[f64] = &[0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Default filter directives for the configured level.
#[must_use]
pub fn default_filter(log_level: &str) -> String {
    format!("{log_level},showtime=debug,tower_http=debug")
}

/// Installs the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&config.log_level)));

    let registry = tracing_subscriber::registry().with(filter);

    if config.log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_target(true).with_current_span(true))
            .init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}

/// Installs the Prometheus recorder and describes the job engine metrics.
pub fn install_metrics() -> ShowtimeResult<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            DURATION_BUCKETS,
        )
        .and_then(PrometheusBuilder::install_recorder)
        .map_err(|e| ShowtimeError::Configuration(format!("Metrics recorder: {e}")))?;

    showtime_jobs::register_metrics();
    info!("Prometheus metrics recorder installed");
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert_eq!(
            default_filter("info"),
            "info,showtime=debug,tower_http=debug"
        );
    }

    #[test]
    fn test_filter_parses() {
        assert!(EnvFilter::try_new(default_filter("warn")).is_ok());
    }
}
