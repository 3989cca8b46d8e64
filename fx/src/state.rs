//! The rate table, holdings ledger and derived metrics as one unit.
//!
//! Every method runs to completion synchronously, so a caller holding the
//! surrounding lock never exposes a half-applied mutation.

use ratewatch_common::{CurrencyCode, CurrencySet};
use tracing::{info, warn};

use crate::derived::DerivedMetrics;
use crate::error::{FxError, FxResult};
use crate::holdings::{HoldingsLedger, HoldingsMode};
use crate::provider::RateQuotes;
use crate::rates::{RateTable, RateUpdate};
use crate::snapshot::Snapshot;

/// What a refresh cycle did to the state.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// Quotes matched the table; nothing was recomputed.
    Unchanged { missing: Vec<CurrencyCode> },
    /// Rates changed and derived metrics were recomputed.
    Updated {
        update: RateUpdate,
        recompute: FxResult<()>,
    },
}

impl RefreshOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, RefreshOutcome::Updated { .. })
    }
}

/// What a batch of holdings mutations did to the state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationOutcome {
    /// Accepted keys with their new amounts.
    pub applied: Vec<(CurrencyCode, f64)>,
    /// Rejected keys.
    pub rejected: Vec<FxError>,
    /// Result of the single recomputation, if any key was accepted.
    pub recompute: Option<FxResult<()>>,
}

impl MutationOutcome {
    pub fn has_changes(&self) -> bool {
        !self.applied.is_empty()
    }
}

/// Shared currency model.
#[derive(Debug, Clone)]
pub struct CurrencyState {
    currencies: CurrencySet,
    rates: RateTable,
    holdings: HoldingsLedger,
    derived: DerivedMetrics,
}

impl CurrencyState {
    /// Create the state with starting holdings and no rates yet.
    pub fn new(currencies: CurrencySet, initial_holdings: &[(CurrencyCode, f64)]) -> Self {
        Self {
            rates: RateTable::new(&currencies),
            holdings: HoldingsLedger::with_amounts(&currencies, initial_holdings),
            derived: DerivedMetrics::new(),
            currencies,
        }
    }

    pub fn currencies(&self) -> &CurrencySet {
        &self.currencies
    }

    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    pub fn holdings(&self) -> &HoldingsLedger {
        &self.holdings
    }

    pub fn derived(&self) -> &DerivedMetrics {
        &self.derived
    }

    /// Current rate for a configured code.
    pub fn rate(&self, code: &CurrencyCode) -> Option<f64> {
        self.rates.get(code)
    }

    /// Apply fetched quotes; recompute ratios then totals only if a rate changed.
    pub fn apply_rates(&mut self, quotes: &RateQuotes) -> RefreshOutcome {
        let update = self.rates.update(quotes);

        if !update.is_changed() {
            info!("The exchange rate has not changed");
            return RefreshOutcome::Unchanged {
                missing: update.missing,
            };
        }

        let recompute = self.derived.recompute(&self.rates, &self.holdings);
        RefreshOutcome::Updated { update, recompute }
    }

    /// Apply each `(code, raw amount)` pair independently, then recompute once.
    pub fn apply_holdings(
        &mut self,
        entries: &[(String, String)],
        mode: HoldingsMode,
    ) -> MutationOutcome {
        let mut outcome = MutationOutcome::default();

        for (code, raw) in entries {
            let result = CurrencyCode::parse(code)
                .map_err(FxError::from)
                .and_then(|parsed| {
                    let amount = self.holdings.apply(parsed.as_str(), raw, mode)?;
                    Ok((parsed, amount))
                });

            match result {
                Ok(applied) => outcome.applied.push(applied),
                Err(e) => {
                    warn!(currency = %code, error = %e, %mode, "Holding change rejected");
                    outcome.rejected.push(e);
                }
            }
        }

        if outcome.has_changes() {
            outcome.recompute = Some(self.derived.recompute(&self.rates, &self.holdings));
        }

        outcome
    }

    /// Capture a snapshot of holdings, ratios and totals.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.currencies, &self.holdings, &self.derived)
    }
}
