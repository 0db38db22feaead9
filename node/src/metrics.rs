//! Prometheus metrics for the overlay node.
//!
//! [`NodeMetrics`] owns a dedicated [`Registry`] so several nodes can live
//! in one process (as they do in tests) without clashing on metric names.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge,
    Opts, Registry, TextEncoder,
};

pub struct NodeMetrics {
    pub registry: Registry,

    // ── Submission ──────────────────────────────────────────────────────
    /// Submissions that passed the up-front checks.
    pub submissions_accepted: IntCounter,
    /// Submissions rejected or failed during evaluation.
    pub submissions_rejected: IntCounter,
    /// Submissions whose acknowledgment missed the deadline.
    pub submission_timeouts: IntCounter,
    /// Outputs admitted across all topics.
    pub outputs_admitted: IntCounter,

    // ── Sync ────────────────────────────────────────────────────────────
    pub sync_rounds: IntCounter,
    pub graphs_committed: IntCounter,
    pub graphs_discarded: IntCounter,
    /// Outputs written by committed graphs.
    pub outputs_synced: IntCounter,
    /// Nodes pushed to peers during reply phases.
    pub nodes_pushed: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub topics_hosted: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Time from submission to acknowledgment, in milliseconds.
    pub submission_latency_ms: Histogram,
    /// Duration of a sync round, in milliseconds.
    pub sync_duration_ms: Histogram,
}

impl NodeMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let submissions_accepted = register_int_counter_with_registry!(
            Opts::new(
                "overlay_submissions_accepted_total",
                "Submissions accepted for evaluation"
            ),
            registry
        )
        .expect("failed to register submissions_accepted counter");

        let submissions_rejected = register_int_counter_with_registry!(
            Opts::new(
                "overlay_submissions_rejected_total",
                "Submissions rejected or failed"
            ),
            registry
        )
        .expect("failed to register submissions_rejected counter");

        let submission_timeouts = register_int_counter_with_registry!(
            Opts::new(
                "overlay_submission_timeouts_total",
                "Submissions whose acknowledgment timed out"
            ),
            registry
        )
        .expect("failed to register submission_timeouts counter");

        let outputs_admitted = register_int_counter_with_registry!(
            Opts::new("overlay_outputs_admitted_total", "Outputs admitted by submissions"),
            registry
        )
        .expect("failed to register outputs_admitted counter");

        let sync_rounds = register_int_counter_with_registry!(
            Opts::new("overlay_sync_rounds_total", "GASP sync rounds run"),
            registry
        )
        .expect("failed to register sync_rounds counter");

        let graphs_committed = register_int_counter_with_registry!(
            Opts::new("overlay_graphs_committed_total", "GASP graphs committed"),
            registry
        )
        .expect("failed to register graphs_committed counter");

        let graphs_discarded = register_int_counter_with_registry!(
            Opts::new("overlay_graphs_discarded_total", "GASP graphs discarded"),
            registry
        )
        .expect("failed to register graphs_discarded counter");

        let outputs_synced = register_int_counter_with_registry!(
            Opts::new("overlay_outputs_synced_total", "Outputs written by GASP sync"),
            registry
        )
        .expect("failed to register outputs_synced counter");

        let nodes_pushed = register_int_counter_with_registry!(
            Opts::new("overlay_nodes_pushed_total", "Nodes pushed to peers"),
            registry
        )
        .expect("failed to register nodes_pushed counter");

        let topics_hosted = register_int_gauge_with_registry!(
            Opts::new("overlay_topics_hosted", "Topics hosted by this node"),
            registry
        )
        .expect("failed to register topics_hosted gauge");

        // 1 ms → ~16 s.
        let submission_latency_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "overlay_submission_latency_ms",
                "Submission acknowledgment latency in milliseconds"
            )
            .buckets(prometheus::exponential_buckets(1.0, 2.0, 15).unwrap()),
            registry
        )
        .expect("failed to register submission_latency_ms histogram");

        let sync_duration_ms = register_histogram_with_registry!(
            HistogramOpts::new("overlay_sync_duration_ms", "Sync round duration in milliseconds")
                .buckets(prometheus::exponential_buckets(1.0, 2.0, 18).unwrap()),
            registry
        )
        .expect("failed to register sync_duration_ms histogram");

        Self {
            registry,
            submissions_accepted,
            submissions_rejected,
            submission_timeouts,
            outputs_admitted,
            sync_rounds,
            graphs_committed,
            graphs_discarded,
            outputs_synced,
            nodes_pushed,
            topics_hosted,
            submission_latency_ms,
            sync_duration_ms,
        }
    }

    /// Render every metric in the Prometheus text exposition format.
    pub fn encode_text(&self) -> String {
        let mut buffer = Vec::new();
        if TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .is_err()
        {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separate_instances_do_not_clash() {
        let a = NodeMetrics::new();
        let b = NodeMetrics::new();
        a.submissions_accepted.inc();
        assert_eq!(a.submissions_accepted.get(), 1);
        assert_eq!(b.submissions_accepted.get(), 0);
    }

    #[test]
    fn text_encoding_lists_counters() {
        let metrics = NodeMetrics::new();
        metrics.graphs_committed.inc_by(3);
        let text = metrics.encode_text();
        assert!(text.contains("overlay_graphs_committed_total 3"));
    }
}
