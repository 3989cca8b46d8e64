//! Metrics collection for service monitoring.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ratewatch_fx::FxError;

/// Service metrics.
pub struct Metrics {
    /// Quote fetches attempted.
    pub fetches_total: AtomicU64,
    /// Fetches that failed at the network level.
    pub fetch_failures: AtomicU64,
    /// Fetches whose payload could not be parsed.
    pub parse_failures: AtomicU64,
    /// Cycles that changed the rate table.
    pub rate_updates: AtomicU64,
    /// Cycles with unchanged rates.
    pub rates_unchanged: AtomicU64,
    /// Successful recomputations of derived metrics.
    pub recomputations: AtomicU64,
    /// Recomputations skipped for incomplete data.
    pub recompute_failures: AtomicU64,
    /// Snapshots rendered by the reporter.
    pub renders: AtomicU64,
    /// Holdings keys accepted.
    pub mutations_accepted: AtomicU64,
    /// Holdings keys rejected.
    pub mutations_rejected: AtomicU64,
}

impl Metrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self {
            fetches_total: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
            parse_failures: AtomicU64::new(0),
            rate_updates: AtomicU64::new(0),
            rates_unchanged: AtomicU64::new(0),
            recomputations: AtomicU64::new(0),
            recompute_failures: AtomicU64::new(0),
            renders: AtomicU64::new(0),
            mutations_accepted: AtomicU64::new(0),
            mutations_rejected: AtomicU64::new(0),
        }
    }

    /// Increment fetches attempted.
    pub fn fetch_started(&self) {
        self.fetches_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed fetch, split by failure kind.
    pub fn fetch_failed(&self, error: &FxError) {
        match error {
            FxError::ParseFailure(_) => self.parse_failures.fetch_add(1, Ordering::Relaxed),
            _ => self.fetch_failures.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn rates_updated(&self) {
        self.rate_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rates_unchanged(&self) {
        self.rates_unchanged.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of a recomputation.
    pub fn recomputed(&self, success: bool) {
        if success {
            self.recomputations.fetch_add(1, Ordering::Relaxed);
        } else {
            self.recompute_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn rendered(&self) {
        self.renders.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a batch of holdings changes.
    pub fn mutations(&self, accepted: usize, rejected: usize) {
        self.mutations_accepted
            .fetch_add(accepted as u64, Ordering::Relaxed);
        self.mutations_rejected
            .fetch_add(rejected as u64, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            fetches_total: self.fetches_total.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            rate_updates: self.rate_updates.load(Ordering::Relaxed),
            rates_unchanged: self.rates_unchanged.load(Ordering::Relaxed),
            recomputations: self.recomputations.load(Ordering::Relaxed),
            recompute_failures: self.recompute_failures.load(Ordering::Relaxed),
            renders: self.renders.load(Ordering::Relaxed),
            mutations_accepted: self.mutations_accepted.load(Ordering::Relaxed),
            mutations_rejected: self.mutations_rejected.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        let series = [
            ("fetches_total", "counter", "Quote fetches attempted", snapshot.fetches_total),
            ("fetch_failures", "counter", "Quote fetches that failed", snapshot.fetch_failures),
            ("parse_failures", "counter", "Quote payloads that failed to parse", snapshot.parse_failures),
            ("rate_updates", "counter", "Refresh cycles that changed rates", snapshot.rate_updates),
            ("rates_unchanged", "counter", "Refresh cycles with unchanged rates", snapshot.rates_unchanged),
            ("recomputations", "counter", "Successful derived metric recomputations", snapshot.recomputations),
            ("recompute_failures", "counter", "Recomputations skipped for incomplete data", snapshot.recompute_failures),
            ("renders", "counter", "Snapshots rendered by the reporter", snapshot.renders),
            ("mutations_accepted", "counter", "Holdings changes accepted", snapshot.mutations_accepted),
            ("mutations_rejected", "counter", "Holdings changes rejected", snapshot.mutations_rejected),
        ];

        let mut out = String::new();
        for (name, kind, help, value) in series {
            out.push_str(&format!(
                "# HELP ratewatch_{name} {help}\n# TYPE ratewatch_{name} {kind}\nratewatch_{name} {value}\n\n"
            ));
        }
        out
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub fetches_total: u64,
    pub fetch_failures: u64,
    pub parse_failures: u64,
    pub rate_updates: u64,
    pub rates_unchanged: u64,
    pub recomputations: u64,
    pub recompute_failures: u64,
    pub renders: u64,
    pub mutations_accepted: u64,
    pub mutations_rejected: u64,
}

/// Shared metrics instance.
pub type SharedMetrics = Arc<Metrics>;
