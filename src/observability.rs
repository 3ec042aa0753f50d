//! Observability for Meridian.
//!
//! Logging goes through `tracing`; planning outcomes are counted through the
//! `metrics` facade. No recorder is installed here, so counters are no-ops
//! unless the embedding process installs one.

use crate::cluster::ConfigureMode;
use crate::config::ObservabilityConfig;
use crate::error::{MeridianError, Result};
use metrics::counter;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Directive used when `RUST_LOG` is unset: quiet dependencies, configured
/// level for this crate.
fn default_directive(log_level: &str) -> String {
    format!("warn,meridian={}", log_level)
}

/// Initialize logging on stderr. Stdout is reserved for plan output.
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.log_level)));

    let layer = if config.json_logs {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|e| MeridianError::Config(format!("logging already initialized: {}", e)))?;

    info!(level = %config.log_level, json = config.json_logs, "Logging initialized");
    Ok(())
}

/// Record a completed planning call.
pub fn record_plan(mode: ConfigureMode) {
    counter!("meridian_plans_total", "mode" => mode.as_str()).increment(1);
}

/// Record a failed planning call.
pub fn record_plan_failure(err: &MeridianError) {
    counter!("meridian_plan_failures_total", "kind" => err.kind()).increment(1);
}

/// Record planned node actions.
pub fn record_nodes_planned(added: usize, removed: usize) {
    counter!("meridian_nodes_planned_total", "action" => "add").increment(added as u64);
    counter!("meridian_nodes_planned_total", "action" => "remove").increment(removed as u64);
}

/// Record newly elected masters.
pub fn record_masters_elected(count: usize) {
    counter!("meridian_masters_elected_total").increment(count as u64);
}
