//! Metrics for keeper operations.

use metrics::{Counter, Histogram};
use metrics_derive::Metrics;

/// Metrics for the `Keeper`.
#[derive(Metrics, Clone)]
#[metrics(scope = "rust.eth.keeper")]
pub(crate) struct KeeperMetrics {
    /// Counter of transactions whose state changes were applied
    pub(crate) txs_applied: Counter,
    /// Counter of transactions that failed in the VM and only paid gas
    pub(crate) txs_reverted: Counter,
    /// Counter of transactions rejected before or during dispatch
    pub(crate) dispatch_failures: Counter,

    /// Histogram of dispatch durations (in seconds)
    pub(crate) dispatch_histogram: Histogram,
    /// Histogram of gas estimation durations (in seconds)
    pub(crate) estimate_histogram: Histogram,
}

impl KeeperMetrics {
    pub(crate) fn record_dispatch_duration(&self, duration: f64) {
        self.dispatch_histogram.record(duration);
    }

    pub(crate) fn record_estimate_duration(&self, duration: f64) {
        self.estimate_histogram.record(duration);
    }

    pub(crate) fn increment_applied(&self) {
        self.txs_applied.increment(1);
    }

    pub(crate) fn increment_reverted(&self) {
        self.txs_reverted.increment(1);
    }

    pub(crate) fn increment_dispatch_failures(&self) {
        self.dispatch_failures.increment(1);
    }
}
