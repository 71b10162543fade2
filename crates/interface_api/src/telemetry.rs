//! Prometheus export of the posting counters
//!
//! Each [`PrometheusMetrics`] owns its own recorder instead of installing a
//! process-wide one, so several application states (one per test, say)
//! never share counts.

use metrics::{counter, describe_counter, with_local_recorder};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

use domain_ledger::{LedgerMetric, MetricsCollector};

const ALL_METRICS: [LedgerMetric; 12] = [
    LedgerMetric::EntriesPosted,
    LedgerMetric::EntriesApproved,
    LedgerMetric::EntriesRejected,
    LedgerMetric::LinesPosted,
    LedgerMetric::LedgerRowsWritten,
    LedgerMetric::BalanceChanges,
    LedgerMetric::BatchesPosted,
    LedgerMetric::BatchesApproved,
    LedgerMetric::BatchesRejected,
    LedgerMetric::EntriesReversed,
    LedgerMetric::BatchesReversed,
    LedgerMetric::PostingFailures,
];

/// Posting counters recorded through the `metrics` facade
pub struct PrometheusMetrics {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl PrometheusMetrics {
    pub fn new() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        with_local_recorder(&recorder, || {
            for metric in ALL_METRICS {
                describe_counter!(metric.name(), describe(metric));
                counter!(metric.name()).absolute(0);
            }
        });

        Self { recorder, handle }
    }

    /// Prometheus text exposition of every counter
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl Default for PrometheusMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector for PrometheusMetrics {
    fn increment(&self, metric: LedgerMetric, by: u64) {
        with_local_recorder(&self.recorder, || {
            counter!(metric.name()).increment(by);
        });
    }
}

fn describe(metric: LedgerMetric) -> &'static str {
    match metric {
        LedgerMetric::EntriesPosted => "Journal entries posted",
        LedgerMetric::EntriesApproved => "Journal entries approved",
        LedgerMetric::EntriesRejected => "Journal entries rejected",
        LedgerMetric::LinesPosted => "Journal lines posted",
        LedgerMetric::LedgerRowsWritten => "General ledger rows written",
        LedgerMetric::BalanceChanges => "Account balance movements",
        LedgerMetric::BatchesPosted => "Posting batches posted",
        LedgerMetric::BatchesApproved => "Posting batches approved",
        LedgerMetric::BatchesRejected => "Posting batches rejected",
        LedgerMetric::EntriesReversed => "Journal entries reversed",
        LedgerMetric::BatchesReversed => "Posting batches reversed",
        LedgerMetric::PostingFailures => "Posts rejected by the engine",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(rendered: &str, name: &str) -> Option<u64> {
        rendered
            .lines()
            .find(|line| line.starts_with(name) && !line.starts_with('#'))
            .and_then(|line| line.rsplit(' ').next())
            .and_then(|value| value.parse().ok())
    }

    #[test]
    fn test_increments_render_as_counters() {
        let metrics = PrometheusMetrics::new();
        metrics.increment(LedgerMetric::EntriesPosted, 2);
        metrics.increment(LedgerMetric::EntriesPosted, 1);

        let rendered = metrics.render();
        assert!(rendered.contains("# TYPE ledger_entries_posted_total counter"));
        assert_eq!(sample(&rendered, "ledger_entries_posted_total"), Some(3));
        assert_eq!(sample(&rendered, "ledger_posting_failures_total"), Some(0));
    }

    #[test]
    fn test_instances_do_not_share_counts() {
        let a = PrometheusMetrics::new();
        let b = PrometheusMetrics::new();
        a.increment(LedgerMetric::BatchesPosted, 1);

        assert_eq!(sample(&a.render(), "ledger_batches_posted_total"), Some(1));
        assert_eq!(sample(&b.render(), "ledger_batches_posted_total"), Some(0));
    }
}
