//! Metrics and observability utilities
//!
//! Provides Prometheus-style metrics for the chat pipeline and its
//! external collaborators, with standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all PaperChat metrics
pub const METRICS_PREFIX: &str = "paperchat";

/// Histogram buckets for generation and tool latency (in seconds).
/// Generation regularly takes multiple seconds on local models.
pub const LATENCY_BUCKETS: &[f64] = &[
    0.050, // 50ms
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
    10.00, // 10s
    30.00, // 30s
    60.00, // 1m
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Chat pipeline metrics
    describe_counter!(
        format!("{}_chat_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of chat queries processed"
    );

    describe_histogram!(
        format!("{}_chat_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Chat pipeline latency in seconds"
    );

    describe_counter!(
        format!("{}_sources_extracted_total", METRICS_PREFIX),
        Unit::Count,
        "Total source records extracted from model output"
    );

    // Paper tool metrics
    describe_counter!(
        format!("{}_tool_calls_total", METRICS_PREFIX),
        Unit::Count,
        "Total external paper tool invocations"
    );

    describe_histogram!(
        format!("{}_tool_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "External paper tool latency in seconds"
    );

    // Rendering metrics
    describe_counter!(
        format!("{}_diagrams_rendered_total", METRICS_PREFIX),
        Unit::Count,
        "Total diagrams rendered, labelled by outcome"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record chat pipeline metrics
pub struct ChatMetrics {
    start: Instant,
    intent: String,
}

impl ChatMetrics {
    /// Start tracking a chat query
    pub fn start(intent: &str) -> Self {
        Self {
            start: Instant::now(),
            intent: intent.to_string(),
        }
    }

    /// Record query completion
    pub fn finish(self, source_count: usize) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_chat_queries_total", METRICS_PREFIX),
            "intent" => self.intent.clone()
        )
        .increment(1);

        histogram!(
            format!("{}_chat_duration_seconds", METRICS_PREFIX),
            "intent" => self.intent
        )
        .record(duration);

        counter!(format!("{}_sources_extracted_total", METRICS_PREFIX))
            .increment(source_count as u64);
    }
}

/// Helper to record paper tool metrics
pub fn record_tool_call(tool: &str, duration_secs: f64, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_tool_calls_total", METRICS_PREFIX),
        "tool" => tool.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_tool_duration_seconds", METRICS_PREFIX),
        "tool" => tool.to_string()
    )
    .record(duration_secs);
}

/// Helper to record diagram rendering metrics.
/// Outcome is one of: dot, fallback, placeholder.
pub fn record_render(outcome: &str) {
    counter!(
        format!("{}_diagrams_rendered_total", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets_sorted() {
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_chat_metrics() {
        let metrics = ChatMetrics::start("explain");
        std::thread::sleep(std::time::Duration::from_millis(10));
        metrics.finish(2);
        // Just verify it runs without panic
    }
}
