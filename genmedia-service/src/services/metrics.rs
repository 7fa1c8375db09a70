//! Prometheus metrics for genmedia-service.
//!
//! Generation outcomes, provider polling and provider errors, exported in
//! the Prometheus text format at `/metrics`.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

// Global registry
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

// Generation metrics
pub static GENERATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static GENERATION_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();

// Provider metrics
pub static PROVIDER_POLLS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static PROVIDER_ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

// Storage metrics
pub static ARTIFACTS_STORED_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

// Image Q&A metrics
pub static IMAGE_QA_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Must be called once at startup.
pub fn init_metrics() {
    if REGISTRY.get().is_some() {
        return;
    }
    let registry = Registry::new();

    // Generation outcome counter (success, plan_fallback, error)
    let generations = IntCounterVec::new(
        Opts::new("genmedia_generations_total", "Total video generation requests"),
        &["mode", "outcome", "error_type"],
    )
    .expect("Failed to create genmedia_generations_total metric");

    // End-to-end generation duration, polling included
    let generation_duration = HistogramVec::new(
        HistogramOpts::new(
            "genmedia_generation_duration_seconds",
            "Video generation duration in seconds",
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 240.0, 480.0, 720.0]),
        &["mode", "outcome"],
    )
    .expect("Failed to create genmedia_generation_duration_seconds metric");

    let polls = IntCounterVec::new(
        Opts::new(
            "genmedia_provider_polls_total",
            "Total status polls of long-running provider operations",
        ),
        &["provider"],
    )
    .expect("Failed to create genmedia_provider_polls_total metric");

    let provider_errors = IntCounterVec::new(
        Opts::new("genmedia_provider_errors_total", "Total provider errors"),
        &["provider", "operation", "error_type"],
    )
    .expect("Failed to create genmedia_provider_errors_total metric");

    let artifacts = IntCounterVec::new(
        Opts::new("genmedia_artifacts_stored_total", "Total artifacts written to storage"),
        &["kind"],
    )
    .expect("Failed to create genmedia_artifacts_stored_total metric");

    let image_qa = IntCounterVec::new(
        Opts::new("genmedia_image_qa_requests_total", "Total image Q&A requests"),
        &["status"],
    )
    .expect("Failed to create genmedia_image_qa_requests_total metric");

    // Register all metrics
    registry
        .register(Box::new(generations.clone()))
        .expect("Failed to register genmedia_generations_total");
    registry
        .register(Box::new(generation_duration.clone()))
        .expect("Failed to register genmedia_generation_duration_seconds");
    registry
        .register(Box::new(polls.clone()))
        .expect("Failed to register genmedia_provider_polls_total");
    registry
        .register(Box::new(provider_errors.clone()))
        .expect("Failed to register genmedia_provider_errors_total");
    registry
        .register(Box::new(artifacts.clone()))
        .expect("Failed to register genmedia_artifacts_stored_total");
    registry
        .register(Box::new(image_qa.clone()))
        .expect("Failed to register genmedia_image_qa_requests_total");

    // Initialize globals
    let _ = REGISTRY.set(registry);
    let _ = GENERATIONS_TOTAL.set(generations);
    let _ = GENERATION_DURATION_SECONDS.set(generation_duration);
    let _ = PROVIDER_POLLS_TOTAL.set(polls);
    let _ = PROVIDER_ERRORS_TOTAL.set(provider_errors);
    let _ = ARTIFACTS_STORED_TOTAL.set(artifacts);
    let _ = IMAGE_QA_REQUESTS_TOTAL.set(image_qa);

    tracing::info!("Prometheus metrics initialized");
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    let registry = match REGISTRY.get() {
        Some(r) => r,
        None => {
            tracing::error!("Metrics registry not initialized");
            return "# Metrics registry not initialized\n".to_string();
        }
    };

    let metric_families = registry.gather();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return format!("# Failed to encode metrics: {}\n", e);
    }

    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to convert metrics to UTF-8");
            format!("# Failed to convert metrics to UTF-8: {}\n", e)
        }
    }
}

// Helper functions for recording metrics

/// Record a finished generation. `error_type` is empty unless the outcome is an error.
pub fn record_generation(mode: &str, outcome: &str, error_type: &str, duration_secs: f64) {
    if let Some(counter) = GENERATIONS_TOTAL.get() {
        counter.with_label_values(&[mode, outcome, error_type]).inc();
    }
    if let Some(histogram) = GENERATION_DURATION_SECONDS.get() {
        histogram
            .with_label_values(&[mode, outcome])
            .observe(duration_secs);
    }
}

pub fn record_poll(provider: &str) {
    if let Some(counter) = PROVIDER_POLLS_TOTAL.get() {
        counter.with_label_values(&[provider]).inc();
    }
}

/// Record a provider error.
pub fn record_provider_error(provider: &str, operation: &str, error_type: &str) {
    if let Some(counter) = PROVIDER_ERRORS_TOTAL.get() {
        counter
            .with_label_values(&[provider, operation, error_type])
            .inc();
    }
}

pub fn record_artifact_stored(kind: &str) {
    if let Some(counter) = ARTIFACTS_STORED_TOTAL.get() {
        counter.with_label_values(&[kind]).inc();
    }
}

pub fn record_image_qa(status: &str) {
    if let Some(counter) = IMAGE_QA_REQUESTS_TOTAL.get() {
        counter.with_label_values(&[status]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_generations_appear_in_export() {
        init_metrics();
        record_generation("text", "plan_fallback", "", 600.0);
        record_poll("veo");

        let exported = get_metrics();

        assert!(exported.contains("genmedia_generations_total"));
        assert!(exported.contains("outcome=\"plan_fallback\""));
        assert!(exported.contains("genmedia_provider_polls_total"));
    }
}
