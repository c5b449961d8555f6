use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register descriptions for every metric the gateway emits.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "marscache_cache_hit_total",
            Unit::Count,
            "Total number of lookups answered from the cache backend."
        );
        describe_counter!(
            "marscache_cache_miss_total",
            Unit::Count,
            "Total number of lookups that fell through to the upstream provider."
        );
        describe_counter!(
            "marscache_cache_backend_error_total",
            Unit::Count,
            "Total number of cache backend operations that failed."
        );
        describe_counter!(
            "marscache_cache_local_evict_total",
            Unit::Count,
            "Total number of local cache evictions due to capacity."
        );
        describe_histogram!(
            "marscache_upstream_fetch_ms",
            Unit::Milliseconds,
            "Latency of successful upstream fetches in milliseconds."
        );
        describe_counter!(
            "marscache_upstream_error_total",
            Unit::Count,
            "Total number of upstream fetches that failed."
        );
    });
}
