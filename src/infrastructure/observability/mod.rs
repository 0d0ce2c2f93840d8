use crate::config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const DEFAULT_FILTER: &str = "rentalhub_recovery=debug,tower_http=debug,axum=info";

#[derive(Debug, thiserror::Error)]
pub enum ObservabilityError {
    #[error("Failed to install tracing subscriber: {0}")]
    Tracing(#[from] tracing_subscriber::util::TryInitError),

    #[error("Failed to install metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

pub fn init(config: &Config) -> Result<(), ObservabilityError> {
    init_tracing(DEFAULT_FILTER)?;
    init_metrics(config)?;
    Ok(())
}

/// Structured logs to stdout; `RUST_LOG` overrides `default_filter`
pub fn init_tracing(default_filter: &str) -> Result<(), ObservabilityError> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_thread_ids(true)
        .with_target(true);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    Registry::default()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

fn init_metrics(config: &Config) -> Result<(), ObservabilityError> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], config.metrics_port))
        .install()?;

    tracing::info!(
        "Metrics exporter (Prometheus) started on port {}",
        config.metrics_port
    );
    Ok(())
}
