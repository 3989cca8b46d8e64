//! Point-in-time rendering of holdings, ratios and totals.

use chrono::{DateTime, Utc};
use ratewatch_common::{CurrencyCode, CurrencySet, RatioKey};
use std::fmt;

use crate::derived::DerivedMetrics;
use crate::holdings::HoldingsLedger;

/// Placeholder printed for values not computed yet.
const UNDEFINED: &str = "n/a";

/// Immutable copy of the reportable state.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,
    pub holdings: Vec<(CurrencyCode, Option<f64>)>,
    pub ratios: Vec<(RatioKey, Option<f64>)>,
    pub totals: Vec<(CurrencyCode, Option<f64>)>,
}

impl Snapshot {
    /// Capture the current holdings and derived tables.
    ///
    /// Every configured code and pair appears even before the first
    /// successful recomputation.
    pub fn capture(
        currencies: &CurrencySet,
        holdings: &HoldingsLedger,
        derived: &DerivedMetrics,
    ) -> Self {
        let holdings = holdings
            .iter()
            .map(|(code, amount)| (code.clone(), amount))
            .collect();

        let ratios = currencies
            .pairs()
            .into_iter()
            .map(|key| {
                let ratio = derived.ratios().and_then(|table| table.get(&key));
                (key, ratio)
            })
            .collect();

        let totals = currencies
            .codes()
            .iter()
            .map(|code| {
                let total = derived.totals().and_then(|table| table.get(code));
                (code.clone(), total)
            })
            .collect();

        Self {
            taken_at: Utc::now(),
            holdings,
            ratios,
            totals,
        }
    }
}

fn write_table<K: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    rows: &[(K, Option<f64>)],
) -> fmt::Result {
    for (idx, (key, value)) in rows.iter().enumerate() {
        if idx > 0 {
            writeln!(f)?;
        }
        let key = key.to_string().to_ascii_lowercase();
        match value {
            Some(value) => write!(f, "{key}: {value}")?,
            None => write!(f, "{key}: {UNDEFINED}")?,
        }
    }
    Ok(())
}

/// Three `code: value` tables separated by a blank line.
impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_table(f, &self.holdings)?;
        write!(f, "\n\n")?;
        write_table(f, &self.ratios)?;
        write!(f, "\n\n")?;
        write_table(f, &self.totals)
    }
}
