//! Snapshot sinks and the change baseline used by the reporter loop.

use parking_lot::Mutex;
use ratewatch_fx::{CurrencyState, HoldingsLedger, RateTable, Snapshot};

/// Destination for rendered snapshots.
pub trait SnapshotSink: Send + Sync {
    fn render(&self, snapshot: &Snapshot);
}

/// Prints snapshots to standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl SnapshotSink for ConsoleSink {
    fn render(&self, snapshot: &Snapshot) {
        println!("{snapshot}\n");
    }
}

/// Keeps rendered snapshots in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    rendered: Mutex<Vec<Snapshot>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All snapshots rendered so far.
    pub fn rendered(&self) -> Vec<Snapshot> {
        self.rendered.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.rendered.lock().len()
    }
}

impl SnapshotSink for MemorySink {
    fn render(&self, snapshot: &Snapshot) {
        self.rendered.lock().push(snapshot.clone());
    }
}

/// Rates and holdings as of the last render.
///
/// The reporter renders only when the live state differs from this.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportBaseline {
    rates: RateTable,
    holdings: HoldingsLedger,
}

impl ReportBaseline {
    pub fn capture(state: &CurrencyState) -> Self {
        Self {
            rates: state.rates().clone(),
            holdings: state.holdings().clone(),
        }
    }

    pub fn matches(&self, state: &CurrencyState) -> bool {
        &self.rates == state.rates() && &self.holdings == state.holdings()
    }
}
