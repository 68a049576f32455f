//! Prometheus metrics for the distribution server
//!
//! This module provides metrics tracking for:
//! - Catalog: generation duration, entry count, generations published
//! - Routing: local vs. help/main redirect decisions
//! - HTTP: responses by endpoint and status, request duration
//! - Settings: reload outcomes
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram,
    register_histogram_vec, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramVec,
    TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for all distribution metrics
struct DistributionMetrics {
    catalog_duration: Histogram,
    catalog_entries: Gauge,
    catalog_generations: Counter,
    routing_decisions: CounterVec,
    responses: CounterVec,
    request_duration: HistogramVec,
    settings_reloads: CounterVec,
}

/// Global storage for distribution metrics
static METRICS: OnceLock<DistributionMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// This function should be called once at application startup.
/// If metric registration fails, subsequent metric operations become no-ops.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = geodist::metrics::init_metrics() {
///     eprintln!("Warning: Metrics initialization failed: {}", e);
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    // Prevent double initialization
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let metrics = DistributionMetrics {
        catalog_duration: register_histogram!(
            "geodist_catalog_generation_seconds",
            "Time spent generating the catalog descriptor in seconds",
            vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]
        )?,
        catalog_entries: register_gauge!(
            "geodist_catalog_entries",
            "Number of entries in the published catalog"
        )?,
        catalog_generations: register_counter!(
            "geodist_catalog_generations_total",
            "Total catalog generations published"
        )?,
        routing_decisions: register_counter_vec!(
            "geodist_routing_decisions_total",
            "Download routing decisions by outcome",
            &["decision"]
        )?,
        responses: register_counter_vec!(
            "geodist_http_responses_total",
            "HTTP responses by endpoint and status",
            &["endpoint", "status"]
        )?,
        request_duration: register_histogram_vec!(
            "geodist_http_request_duration_seconds",
            "Time to produce response headers in seconds",
            &["endpoint"],
            vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
        )?,
        settings_reloads: register_counter_vec!(
            "geodist_settings_reloads_total",
            "Download settings reloads by result",
            &["result"]
        )?,
    };

    METRICS
        .set(metrics)
        .map_err(|_| "Distribution metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record a published catalog generation
pub fn record_catalog_generation(duration_secs: f64, entries: usize) {
    let Some(m) = METRICS.get() else {
        return;
    };

    m.catalog_duration.observe(duration_secs);
    m.catalog_entries.set(entries as f64);
    m.catalog_generations.inc();
}

/// Record a routing decision (`local`, `help` or `main`)
pub fn record_routing_decision(decision: &str) {
    if let Some(m) = METRICS.get() {
        m.routing_decisions.with_label_values(&[decision]).inc();
    }
}

/// Record an HTTP response
pub fn record_response(endpoint: &str, status: u16, duration_secs: f64) {
    let Some(m) = METRICS.get() else {
        return;
    };

    let status_str = status.to_string();
    m.responses
        .with_label_values(&[endpoint, &status_str])
        .inc();
    m.request_duration
        .with_label_values(&[endpoint])
        .observe(duration_secs);
}

/// Record a settings reload
pub fn record_settings_reload(success: bool) {
    if let Some(m) = METRICS.get() {
        let result = if success { "success" } else { "failure" };
        m.settings_reloads.with_label_values(&[result]).inc();
    }
}

// ============================================================================
// Tests
// ============================================================================
