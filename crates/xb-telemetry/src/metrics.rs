//! Prometheus metrics for transfers and mesh wiring.
//!
//! All metrics follow the naming convention: `xb_<area>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // TRANSFER METRICS
    // =========================================================================

    /// Transfers by terminal status
    pub static ref TRANSFERS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("xb_transfers_total", "Transfers by terminal status"),
        &["status"]  // simulated/submitted/confirmed/timed_out/failed
    ).expect("metric creation failed");

    /// Stage outcomes
    pub static ref STAGE_OUTCOMES: CounterVec = CounterVec::new(
        Opts::new("xb_transfer_stage_outcomes_total", "Pipeline stage outcomes"),
        &["stage", "outcome"]
    ).expect("metric creation failed");

    /// Fee quotes that fell back to the configured fee
    pub static ref FEE_FALLBACKS: CounterVec = CounterVec::new(
        Opts::new("xb_fee_fallbacks_total", "Fee quotes replaced by the fallback fee"),
        &["source_endpoint"]
    ).expect("metric creation failed");

    /// Delivery observations per watched transfer
    pub static ref DELIVERY_POLL_ATTEMPTS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "xb_delivery_poll_attempts",
            "Observations performed while watching for delivery"
        ).buckets(vec![1.0, 2.0, 5.0, 10.0, 20.0, 40.0, 60.0, 120.0])
    ).expect("metric creation failed");

    // =========================================================================
    // WIRING METRICS
    // =========================================================================

    /// Peer binding checks by result
    pub static ref PEER_WRITES: CounterVec = CounterVec::new(
        Opts::new("xb_peer_reconciles_total", "Peer binding reconciles by result"),
        &["result"]  // changed/unchanged/failed
    ).expect("metric creation failed");
}

/// Handle proving the metrics were registered.
#[derive(Debug)]
pub struct MetricsHandle {
    registry: Registry,
}

impl MetricsHandle {
    /// Registry the metrics live in.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// Register all metrics with the global registry.
///
/// Fails with `MetricsInit` when called twice.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(TRANSFERS_TOTAL.clone()),
        Box::new(STAGE_OUTCOMES.clone()),
        Box::new(FEE_FALLBACKS.clone()),
        Box::new(DELIVERY_POLL_ATTEMPTS.clone()),
        Box::new(PEER_WRITES.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle {
        registry: REGISTRY.clone(),
    })
}

/// Record a finished transfer.
pub fn record_transfer(status: &str, stages: &[(&str, &str)], poll_attempts: u32) {
    TRANSFERS_TOTAL.with_label_values(&[status]).inc();
    for &(stage, outcome) in stages {
        STAGE_OUTCOMES.with_label_values(&[stage, outcome]).inc();
    }
    if poll_attempts > 0 {
        DELIVERY_POLL_ATTEMPTS.observe(f64::from(poll_attempts));
    }
}

/// Record a fee fallback on `source_endpoint`.
pub fn record_fee_fallback(source_endpoint: &str) {
    FEE_FALLBACKS.with_label_values(&[source_endpoint]).inc();
}

/// Record one peer reconcile.
pub fn record_peer_reconcile(result: &str) {
    PEER_WRITES.with_label_values(&[result]).inc();
}

/// Encode all metrics as Prometheus text format.
pub fn gather() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
