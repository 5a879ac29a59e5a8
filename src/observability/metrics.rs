//! # Metrics
//!
//! Metric names and recording helpers on top of the `metrics` facade. Nothing
//! is recorded until a recorder is installed, so library users and tests pay
//! nothing unless the Prometheus exporter is enabled.
//!
//! ## Metrics
//! - `tenant_groups_resolutions_total{outcome}` - directory resolutions by outcome
//! - `tenant_groups_evictions_total` - stale freshness records removed
//! - `tenant_groups_cached_names` - group names currently cached
//! - `claims_enrichment_total{outcome}` - requests seen by the claim projector

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

use crate::core::error::{GatewayError, GatewayResult};

pub const RESOLUTIONS_TOTAL: &str = "tenant_groups_resolutions_total";
pub const EVICTIONS_TOTAL: &str = "tenant_groups_evictions_total";
pub const CACHED_NAMES: &str = "tenant_groups_cached_names";
pub const ENRICHMENT_TOTAL: &str = "claims_enrichment_total";

pub const OUTCOME_SUCCESS: &str = "success";
pub const OUTCOME_FAILURE: &str = "failure";
pub const OUTCOME_ENRICHED: &str = "enriched";
pub const OUTCOME_NO_TOKEN: &str = "no_token";
pub const OUTCOME_NO_TENANT: &str = "no_tenant";

/// Install the Prometheus recorder with an HTTP scrape listener
///
/// Must be called from within a tokio runtime.
pub fn install_prometheus_exporter(address: SocketAddr) -> GatewayResult<()> {
    PrometheusBuilder::new()
        .with_http_listener(address)
        .install()
        .map_err(|e| GatewayError::internal(format!("Failed to initialize metrics exporter: {}", e)))?;

    info!(%address, "Prometheus metrics exporter listening");
    Ok(())
}

/// Register descriptions for all metrics emitted by the gateway
pub fn describe_metrics() {
    ::metrics::describe_counter!(RESOLUTIONS_TOTAL, "Directory group resolutions by outcome");
    ::metrics::describe_counter!(EVICTIONS_TOTAL, "Stale tenant freshness records evicted");
    ::metrics::describe_gauge!(CACHED_NAMES, "Group display names currently cached");
    ::metrics::describe_counter!(ENRICHMENT_TOTAL, "Requests processed by the claim projector by outcome");
}

pub fn record_resolution(outcome: &'static str) {
    ::metrics::counter!(RESOLUTIONS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_eviction() {
    ::metrics::counter!(EVICTIONS_TOTAL).increment(1);
}

pub fn set_cached_names(count: usize) {
    ::metrics::gauge!(CACHED_NAMES).set(count as f64);
}

pub fn record_enrichment(outcome: &'static str) {
    ::metrics::counter!(ENRICHMENT_TOTAL, "outcome" => outcome).increment(1);
}
