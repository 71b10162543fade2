//! Posting metrics
//!
//! Counters are reported through an injected [`MetricsCollector`] rather
//! than process-wide statics, so each engine (and each test) sees only its
//! own counts. The HTTP layer supplies a Prometheus-backed collector.

use serde::Serialize;

/// Counters emitted by the posting path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerMetric {
    EntriesPosted,
    EntriesApproved,
    EntriesRejected,
    LinesPosted,
    LedgerRowsWritten,
    BalanceChanges,
    BatchesPosted,
    BatchesApproved,
    BatchesRejected,
    EntriesReversed,
    BatchesReversed,
    PostingFailures,
}

impl LedgerMetric {
    pub fn name(&self) -> &'static str {
        match self {
            LedgerMetric::EntriesPosted => "ledger_entries_posted_total",
            LedgerMetric::EntriesApproved => "ledger_entries_approved_total",
            LedgerMetric::EntriesRejected => "ledger_entries_rejected_total",
            LedgerMetric::LinesPosted => "ledger_lines_posted_total",
            LedgerMetric::LedgerRowsWritten => "ledger_rows_written_total",
            LedgerMetric::BalanceChanges => "ledger_balance_changes_total",
            LedgerMetric::BatchesPosted => "ledger_batches_posted_total",
            LedgerMetric::BatchesApproved => "ledger_batches_approved_total",
            LedgerMetric::BatchesRejected => "ledger_batches_rejected_total",
            LedgerMetric::EntriesReversed => "ledger_entries_reversed_total",
            LedgerMetric::BatchesReversed => "ledger_batches_reversed_total",
            LedgerMetric::PostingFailures => "ledger_posting_failures_total",
        }
    }
}

/// Receives counter increments
pub trait MetricsCollector: Send + Sync {
    fn increment(&self, metric: LedgerMetric, by: u64);
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsCollector for NoopMetrics {
    fn increment(&self, _metric: LedgerMetric, _by: u64) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_prometheus_counters() {
        for metric in [
            LedgerMetric::EntriesPosted,
            LedgerMetric::EntriesApproved,
            LedgerMetric::BatchesRejected,
            LedgerMetric::PostingFailures,
        ] {
            let name = metric.name();
            assert!(name.starts_with("ledger_"));
            assert!(name.ends_with("_total"));
        }
    }
}
