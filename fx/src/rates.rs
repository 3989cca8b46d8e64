//! Exchange-rate table with the base currency pinned to 1.

use ratewatch_common::{CurrencyCode, CurrencySet};
use tracing::{debug, warn};

use crate::provider::RateQuotes;

/// Result of applying a set of quotes to the table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateUpdate {
    /// Codes whose value changed.
    pub changed: Vec<CurrencyCode>,
    /// Codes skipped because the quotes lacked a usable value.
    pub missing: Vec<CurrencyCode>,
}

impl RateUpdate {
    pub fn is_changed(&self) -> bool {
        !self.changed.is_empty()
    }
}

/// Value of one unit of each currency in base-currency units.
///
/// Every configured code has an entry. Foreign entries stay `None` until the
/// first quote for them arrives.
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    base: CurrencyCode,
    entries: Vec<(CurrencyCode, Option<f64>)>,
}

impl RateTable {
    /// Create a table with only the base rate known.
    pub fn new(currencies: &CurrencySet) -> Self {
        let entries = currencies
            .codes()
            .iter()
            .map(|code| {
                let rate = currencies.is_base(code).then_some(1.0);
                (code.clone(), rate)
            })
            .collect();

        Self {
            base: currencies.base().clone(),
            entries,
        }
    }

    /// Get the rate for a code, `None` if unknown or not fetched yet.
    pub fn get(&self, code: &CurrencyCode) -> Option<f64> {
        self.entries
            .iter()
            .find(|(c, _)| c == code)
            .and_then(|(_, rate)| *rate)
    }

    /// Iterate entries in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&CurrencyCode, Option<f64>)> {
        self.entries.iter().map(|(code, rate)| (code, *rate))
    }

    /// Whether every code has a rate.
    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(|(_, rate)| rate.is_some())
    }

    /// Replace foreign rates with the quoted values.
    ///
    /// The base entry is never touched. Codes without a positive, finite
    /// quote keep their previous value and are reported as missing.
    pub fn update(&mut self, quotes: &RateQuotes) -> RateUpdate {
        let mut outcome = RateUpdate::default();

        for (code, current) in self.entries.iter_mut() {
            if *code == self.base {
                continue;
            }

            match usable_quote(quotes, code) {
                Some(next) => {
                    let previous = *current;
                    if previous != Some(next) {
                        debug!(currency = %code, ?previous, rate = next, "Rate changed");
                        *current = Some(next);
                        outcome.changed.push(code.clone());
                    }
                }
                None => {
                    warn!(currency = %code, "Quote missing or unusable, keeping previous rate");
                    outcome.missing.push(code.clone());
                }
            }
        }

        outcome
    }
}

fn usable_quote(quotes: &RateQuotes, code: &CurrencyCode) -> Option<f64> {
    quotes
        .get(code)
        .filter(|value| value.is_finite() && *value > 0.0)
}
