//! Metrics and observability utilities
//!
//! Records bibliographic API traffic and traversal totals through the
//! `metrics` facade. Nothing is exported unless a recorder is installed.

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};
use std::time::Instant;

/// Metrics prefix for all CiteForge metrics
pub const METRICS_PREFIX: &str = "citeforge";

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_api_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of bibliographic API requests"
    );

    describe_histogram!(
        format!("{}_api_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Bibliographic API latency in seconds"
    );

    describe_counter!(
        format!("{}_api_retries_total", METRICS_PREFIX),
        Unit::Count,
        "Requests retried after a rate-limit response"
    );

    describe_gauge!(
        format!("{}_traversal_nodes", METRICS_PREFIX),
        Unit::Count,
        "Nodes in the last built citation network"
    );

    describe_gauge!(
        format!("{}_traversal_edges", METRICS_PREFIX),
        Unit::Count,
        "Edges in the last built citation network"
    );

    tracing::debug!("Metrics registered");
}

/// Helper to record one API request
pub struct RequestMetrics {
    start: Instant,
    endpoint: &'static str,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(endpoint: &'static str) -> Self {
        Self {
            start: Instant::now(),
            endpoint,
        }
    }

    /// Record request completion with the HTTP status (0 on transport failure)
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_api_requests_total", METRICS_PREFIX),
            "endpoint" => self.endpoint,
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_api_request_duration_seconds", METRICS_PREFIX),
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record a retry after a rate-limit response
pub fn record_retry(endpoint: &'static str) {
    counter!(
        format!("{}_api_retries_total", METRICS_PREFIX),
        "endpoint" => endpoint
    )
    .increment(1);
}

/// Record the size of a finished network
pub fn record_network(nodes: usize, edges: usize) {
    gauge!(format!("{}_traversal_nodes", METRICS_PREFIX)).set(nodes as f64);
    gauge!(format!("{}_traversal_edges", METRICS_PREFIX)).set(edges as f64);
}
