//! Prometheus metrics for gray-router.
//!
//! Tracks routing decisions, upstream failures and fallbacks, and proxy latency.
use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, Counter, CounterVec, Encoder,
    HistogramVec, TextEncoder,
};
use tracing::warn;

lazy_static! {
    /// Total number of requests processed
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "gray_router_requests_total",
        "Total number of requests processed by the router",
        &["method", "status"]
    )
    .unwrap();

    /// Routing decisions by outcome
    pub static ref ROUTING_DECISIONS_TOTAL: CounterVec = register_counter_vec!(
        "gray_router_routing_decisions_total",
        "Total number of routing decisions",
        &["project", "rule", "version"]  // rule: whitelist|env_override|forced_legacy|canary|no_tag
    )
    .unwrap();

    /// Failed outbound attempts
    pub static ref UPSTREAM_FAILURES_TOTAL: CounterVec = register_counter_vec!(
        "gray_router_upstream_failures_total",
        "Total number of failed upstream attempts",
        &["attempt", "reason"]  // attempt: primary|fallback
    )
    .unwrap();

    /// Fallback outcomes
    pub static ref FALLBACK_TOTAL: CounterVec = register_counter_vec!(
        "gray_router_fallback_total",
        "Total number of fallback requests to the original host",
        &["result"]  // result: success|failure
    )
    .unwrap();

    /// Inbound requests refused because they already carried the hop marker
    pub static ref LOOPS_REJECTED_TOTAL: Counter = register_counter!(
        "gray_router_loops_rejected_total",
        "Total number of requests refused because they were forwarded by a router"
    )
    .unwrap();

    /// Proxy request duration
    pub static ref PROXY_REQUEST_DURATION_MS: HistogramVec = register_histogram_vec!(
        "gray_router_proxy_request_duration_ms",
        "Total request duration including routing and forwarding",
        &["method", "rule"],
        vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0]
    )
    .unwrap();

    /// Upstream request duration
    pub static ref UPSTREAM_REQUEST_DURATION_MS: HistogramVec = register_histogram_vec!(
        "gray_router_upstream_request_duration_ms",
        "Duration of successful upstream requests",
        &["method", "status"]
    )
    .unwrap();
}

/// Collect and return all metrics in Prometheus text format
pub fn collect_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

pub fn record_request(method: &str, status: u16) {
    REQUESTS_TOTAL
        .with_label_values(&[method, &status.to_string()])
        .inc();
}

pub fn record_decision(project: &str, rule: &str, version: &str) {
    ROUTING_DECISIONS_TOTAL
        .with_label_values(&[project, rule, version])
        .inc();
}

pub fn record_upstream_failure(attempt: &str, reason: &str) {
    UPSTREAM_FAILURES_TOTAL
        .with_label_values(&[attempt, reason])
        .inc();
}

pub fn record_fallback(success: bool) {
    let result = if success { "success" } else { "failure" };
    FALLBACK_TOTAL.with_label_values(&[result]).inc();
}

pub fn record_loop_rejected() {
    LOOPS_REJECTED_TOTAL.inc();
}

pub fn record_proxy_duration(method: &str, duration_ms: f64, rule: &str) {
    PROXY_REQUEST_DURATION_MS
        .with_label_values(&[method, rule])
        .observe(duration_ms);
}

pub fn record_upstream_duration(method: &str, status: u16, duration_ms: f64) {
    UPSTREAM_REQUEST_DURATION_MS
        .with_label_values(&[method, &status.to_string()])
        .observe(duration_ms);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collection() {
        record_request("GET", 200);
        record_decision("web", "canary", "new");

        let metrics = collect_metrics();
        assert!(metrics.contains("gray_router_requests_total"));
        assert!(metrics.contains("gray_router_routing_decisions_total"));
    }

    #[test]
    fn test_decision_labels() {
        record_decision("h5", "env_override", "none");
        record_decision("none", "whitelist", "none");

        let metrics = collect_metrics();
        assert!(metrics.contains(r#"rule="env_override""#));
        assert!(metrics.contains(r#"rule="whitelist""#));
    }

    #[test]
    fn test_failure_and_fallback_metrics() {
        record_upstream_failure("primary", "connect");
        record_upstream_failure("fallback", "timeout");
        record_fallback(true);
        record_fallback(false);
        record_loop_rejected();

        let metrics = collect_metrics();
        assert!(metrics.contains("gray_router_upstream_failures_total"));
        assert!(metrics.contains("gray_router_loops_rejected_total"));
        assert!(metrics.contains(r#"result="success""#));
        assert!(metrics.contains(r#"result="failure""#));
    }

    #[test]
    fn test_record_request_error_codes() {
        record_request("GET", 404);
        record_request("POST", 503);

        let metrics = collect_metrics();
        assert!(metrics.contains(r#"status="503""#));
    }

    #[test]
    fn test_duration_histograms() {
        record_proxy_duration("GET", 10.5, "canary");
        record_proxy_duration("POST", 100.0, "forced_legacy");
        record_upstream_duration("GET", 200, 15.5);
        record_upstream_duration("GET", 500, 100.0);

        let metrics = collect_metrics();
        assert!(metrics.contains("gray_router_proxy_request_duration_ms"));
        assert!(metrics.contains("gray_router_upstream_request_duration_ms"));
    }
}
