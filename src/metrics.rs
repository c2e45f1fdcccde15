//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use std::sync::Once;

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Upload Metrics
    pub static ref UPLOADS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("media_gateway_uploads_total", "Total number of upload requests by outcome"),
        &["kind", "outcome"]
    ).expect("metric can be created");
    pub static ref UPLOAD_BYTES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("media_gateway_upload_bytes_total", "Total bytes forwarded to the media provider"),
        &["kind"]
    ).expect("metric can be created");
    pub static ref UPLOAD_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "media_gateway_upload_duration_seconds",
            "Time spent uploading to the media provider"
        ).buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["kind"]
    ).expect("metric can be created");
    pub static ref ORPHANED_ASSETS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "media_gateway_orphaned_assets_total",
            "Uploaded assets whose record could not be saved"
        ),
        &["kind"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("media_gateway_errors_total", "Total number of error responses"),
        &["error_type"]
    ).expect("metric can be created");
}

static INIT: Once = Once::new();

/// Initialize metrics registry.
///
/// Safe to call more than once; only the first call registers.
pub fn init_metrics() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(UPLOADS_TOTAL.clone()))
            .expect("UPLOADS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(UPLOAD_BYTES_TOTAL.clone()))
            .expect("UPLOAD_BYTES_TOTAL can be registered");
        REGISTRY
            .register(Box::new(UPLOAD_DURATION_SECONDS.clone()))
            .expect("UPLOAD_DURATION_SECONDS can be registered");
        REGISTRY
            .register(Box::new(ORPHANED_ASSETS_TOTAL.clone()))
            .expect("ORPHANED_ASSETS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(ERRORS_TOTAL.clone()))
            .expect("ERRORS_TOTAL can be registered");

        tracing::info!("Metrics registry initialized");
    });
}
