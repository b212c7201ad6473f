use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static DESCRIBE_ONCE: Once = Once::new();

/// Install the global tracing subscriber and register metric descriptions.
/// The descriptions are guarded by a `Once` so repeated calls from tests
/// stay harmless.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    DESCRIBE_ONCE.call_once(describe_metrics);

    let registry = tracing_subscriber::registry()
        .with(
            EnvFilter::builder()
                .with_default_directive(logging.level.into())
                .from_env_lossy(),
        )
        .with(ErrorLayer::default());

    let result = match logging.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(true))
            .try_init(),
    };

    result.map_err(|err| {
        InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
    })
}

fn describe_metrics() {
    describe_counter!(
        "rotta_redirect_match_total",
        Unit::Count,
        "Total number of requests answered with a redirect."
    );
    describe_counter!(
        "rotta_redirect_gone_total",
        Unit::Count,
        "Total number of requests answered 410 by a gone rule."
    );
    describe_counter!(
        "rotta_redirect_pass_total",
        Unit::Count,
        "Total number of requests passed through with no matching rule."
    );
    describe_counter!(
        "rotta_sitemap_cache_fresh_hit_total",
        Unit::Count,
        "Total number of sitemap reads served from the fresh tier."
    );
    describe_counter!(
        "rotta_sitemap_cache_stale_hit_total",
        Unit::Count,
        "Total number of sitemap reads served from the stale tier."
    );
    describe_counter!(
        "rotta_sitemap_cache_miss_total",
        Unit::Count,
        "Total number of sitemap reads that generated synchronously."
    );
    describe_counter!(
        "rotta_sitemap_rebuild_total",
        Unit::Count,
        "Total number of background sitemap rebuild jobs executed."
    );
    describe_histogram!(
        "rotta_sitemap_generate_ms",
        Unit::Milliseconds,
        "Sitemap generation latency in milliseconds."
    );
}
