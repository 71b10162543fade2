//! Counting metrics collector for tests

use std::collections::BTreeMap;
use std::sync::Mutex;

use domain_ledger::{LedgerMetric, MetricsCollector};

/// Keeps counters in memory so tests can assert on them
///
/// Each instance counts on its own; nothing is shared between tests.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    counters: Mutex<BTreeMap<LedgerMetric, u64>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a counter
    pub fn get(&self, metric: LedgerMetric) -> u64 {
        self.counters
            .lock()
            .map(|counters| counters.get(&metric).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Every counter keyed by its exported name
    pub fn snapshot(&self) -> BTreeMap<&'static str, u64> {
        self.counters
            .lock()
            .map(|counters| {
                counters
                    .iter()
                    .map(|(metric, value)| (metric.name(), *value))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl MetricsCollector for InMemoryMetrics {
    fn increment(&self, metric: LedgerMetric, by: u64) {
        if let Ok(mut counters) = self.counters.lock() {
            *counters.entry(metric).or_insert(0) += by;
        }
    }
}
