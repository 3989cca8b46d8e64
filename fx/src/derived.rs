//! Ratios and totals derived from the rate table and holdings.
//!
//! Recomputation is always explicit: callers invoke it after a rate update
//! or a holdings mutation. A failed recomputation keeps the previous table.

use ratewatch_common::{CurrencyCode, RatioKey};
use tracing::{info, instrument, warn};

use crate::error::{FxError, FxResult};
use crate::holdings::HoldingsLedger;
use crate::rates::RateTable;

/// `ratio[a-b] = rate[b] / rate[a]` for every canonical pair.
#[derive(Debug, Clone, PartialEq)]
pub struct RatioTable {
    entries: Vec<(RatioKey, f64)>,
}

impl RatioTable {
    /// Ratio stored under the canonical key.
    pub fn get(&self, key: &RatioKey) -> Option<f64> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, ratio)| *ratio)
    }

    /// Ratio of `b` to `a` regardless of declaration order.
    pub fn between(&self, a: &CurrencyCode, b: &CurrencyCode) -> Option<f64> {
        let (key, ratio) = self.entries.iter().find(|(k, _)| k.matches(a, b))?;
        if &key.left == a {
            Some(*ratio)
        } else {
            Some(1.0 / *ratio)
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RatioKey, f64)> {
        self.entries.iter().map(|(key, ratio)| (key, *ratio))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Combined holdings expressed in each currency.
#[derive(Debug, Clone, PartialEq)]
pub struct TotalsTable {
    entries: Vec<(CurrencyCode, f64)>,
}

impl TotalsTable {
    pub fn get(&self, code: &CurrencyCode) -> Option<f64> {
        self.entries
            .iter()
            .find(|(c, _)| c == code)
            .map(|(_, total)| *total)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CurrencyCode, f64)> {
        self.entries.iter().map(|(code, total)| (code, *total))
    }
}

fn divisor(code: &CurrencyCode, rate: f64) -> FxResult<f64> {
    if rate == 0.0 || !rate.is_finite() {
        return Err(FxError::ZeroRate(code.clone()));
    }
    Ok(rate)
}

/// Compute the ratio table from a fully populated rate table.
pub fn recompute_ratios(rates: &RateTable) -> FxResult<RatioTable> {
    let mut known = Vec::new();
    for (code, rate) in rates.iter() {
        let rate = rate.ok_or_else(|| FxError::IncompleteRates(code.clone()))?;
        known.push((code, rate));
    }

    let mut entries = Vec::with_capacity(known.len() * known.len().saturating_sub(1) / 2);
    for (idx, (left, left_rate)) in known.iter().enumerate() {
        let left_rate = divisor(left, *left_rate)?;
        for (right, right_rate) in &known[idx + 1..] {
            let key = RatioKey::new((*left).clone(), (*right).clone());
            entries.push((key, right_rate / left_rate));
        }
    }

    Ok(RatioTable { entries })
}

/// Compute what the combined holdings are worth in each currency.
pub fn recompute_totals(rates: &RateTable, holdings: &HoldingsLedger) -> FxResult<TotalsTable> {
    let mut known = Vec::new();
    for (code, rate) in rates.iter() {
        let rate = rate.ok_or_else(|| FxError::IncompleteData(code.clone()))?;
        let amount = holdings
            .get(code)
            .ok_or_else(|| FxError::IncompleteData(code.clone()))?;
        known.push((code, rate, amount));
    }

    let base_value: f64 = known.iter().map(|(_, rate, amount)| amount * rate).sum();

    let mut entries = Vec::with_capacity(known.len());
    for (code, rate, _) in known {
        let rate = divisor(code, rate)?;
        entries.push((code.clone(), base_value / rate));
    }

    Ok(TotalsTable { entries })
}

/// Last successfully computed ratio and totals tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedMetrics {
    ratios: Option<RatioTable>,
    totals: Option<TotalsTable>,
}

impl DerivedMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ratios(&self) -> Option<&RatioTable> {
        self.ratios.as_ref()
    }

    pub fn totals(&self) -> Option<&TotalsTable> {
        self.totals.as_ref()
    }

    /// Recompute the ratio table, keeping the previous one on failure.
    pub fn refresh_ratios(&mut self, rates: &RateTable) -> FxResult<()> {
        match recompute_ratios(rates) {
            Ok(table) => {
                self.ratios = Some(table);
                info!("Currency ratio successfully recounted");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "Unable to get currency ratio");
                Err(e)
            }
        }
    }

    /// Recompute the totals table, keeping the previous one on failure.
    pub fn refresh_totals(&mut self, rates: &RateTable, holdings: &HoldingsLedger) -> FxResult<()> {
        match recompute_totals(rates, holdings) {
            Ok(table) => {
                self.totals = Some(table);
                info!("Total amount successfully recounted");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "Unable to get total amount");
                Err(e)
            }
        }
    }

    /// Ratios first, then totals. Both are attempted; the first error is returned.
    #[instrument(skip_all)]
    pub fn recompute(&mut self, rates: &RateTable, holdings: &HoldingsLedger) -> FxResult<()> {
        let ratios = self.refresh_ratios(rates);
        let totals = self.refresh_totals(rates, holdings);
        ratios.and(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::RateQuotes;
    use proptest::prelude::*;
    use ratewatch_common::CurrencySet;

    fn rates(usd: f64, eur: f64) -> RateTable {
        let mut table = RateTable::new(&CurrencySet::default());
        let quotes: RateQuotes = [(CurrencyCode::usd(), usd), (CurrencyCode::eur(), eur)]
            .into_iter()
            .collect();
        table.update(&quotes);
        table
    }

    fn holdings(rub: f64, usd: f64, eur: f64) -> HoldingsLedger {
        HoldingsLedger::with_amounts(
            &CurrencySet::default(),
            &[
                (CurrencyCode::rub(), rub),
                (CurrencyCode::usd(), usd),
                (CurrencyCode::eur(), eur),
            ],
        )
    }

    #[test]
    fn test_worked_example() {
        let rates = rates(75.0, 90.0);
        let holdings = holdings(0.0, 10.0, 5.0);

        let totals = recompute_totals(&rates, &holdings).unwrap();
        assert_eq!(totals.get(&CurrencyCode::rub()), Some(1200.0));
        assert_eq!(totals.get(&CurrencyCode::usd()), Some(16.0));

        let ratios = recompute_ratios(&rates).unwrap();
        let usd_eur = RatioKey::new(CurrencyCode::usd(), CurrencyCode::eur());
        assert_eq!(ratios.get(&usd_eur), Some(90.0 / 75.0));
        let eur_usd = ratios
            .between(&CurrencyCode::eur(), &CurrencyCode::usd())
            .unwrap();
        assert!((eur_usd - 75.0 / 90.0).abs() < 1e-12);
        assert_eq!(
            ratios.between(&CurrencyCode::rub(), &CurrencyCode::usd()),
            Some(75.0)
        );
        assert_eq!(ratios.len(), 3);
    }

    #[test]
    fn test_incomplete_rates() {
        let table = RateTable::new(&CurrencySet::default());
        assert_eq!(
            recompute_ratios(&table),
            Err(FxError::IncompleteRates(CurrencyCode::usd()))
        );
        assert_eq!(
            recompute_totals(&table, &holdings(0.0, 1.0, 1.0)),
            Err(FxError::IncompleteData(CurrencyCode::usd()))
        );
    }

    #[test]
    fn test_incomplete_holdings() {
        let ledger = HoldingsLedger::new(&CurrencySet::default());
        assert_eq!(
            recompute_totals(&rates(75.0, 90.0), &ledger),
            Err(FxError::IncompleteData(CurrencyCode::rub()))
        );
    }

    #[test]
    fn test_failed_recompute_keeps_previous_tables() {
        let mut metrics = DerivedMetrics::new();
        let full = rates(75.0, 90.0);
        let ledger = holdings(0.0, 10.0, 5.0);
        metrics.recompute(&full, &ledger).unwrap();
        let before = metrics.clone();

        let empty = RateTable::new(&CurrencySet::default());
        assert!(metrics.recompute(&empty, &ledger).is_err());
        assert_eq!(metrics, before);
    }

    #[test]
    fn test_recompute_before_first_fetch_leaves_tables_empty() {
        let mut metrics = DerivedMetrics::new();
        let empty = RateTable::new(&CurrencySet::default());
        assert!(metrics.recompute(&empty, &holdings(0.0, 0.0, 0.0)).is_err());
        assert!(metrics.ratios().is_none());
        assert!(metrics.totals().is_none());
    }

    proptest! {
        #[test]
        fn prop_ratio_times_left_rate_is_right_rate(usd in 0.01f64..10_000.0, eur in 0.01f64..10_000.0) {
            let table = rates(usd, eur);
            let ratios = recompute_ratios(&table).unwrap();
            for (key, ratio) in ratios.iter() {
                let left = table.get(&key.left).unwrap();
                let right = table.get(&key.right).unwrap();
                prop_assert!((ratio * left - right).abs() <= 1e-9 * right.abs().max(1.0));
            }
        }

        #[test]
        fn prop_totals_are_one_aggregate(
            usd in 0.01f64..10_000.0,
            eur in 0.01f64..10_000.0,
            h_rub in 0.0f64..1e6,
            h_usd in 0.0f64..1e6,
            h_eur in 0.0f64..1e6,
        ) {
            let table = rates(usd, eur);
            let totals = recompute_totals(&table, &holdings(h_rub, h_usd, h_eur)).unwrap();
            let aggregate = h_rub + h_usd * usd + h_eur * eur;
            for (code, total) in totals.iter() {
                let in_base = total * table.get(code).unwrap();
                prop_assert!((in_base - aggregate).abs() <= 1e-9 * aggregate.max(1.0));
            }
        }

        #[test]
        fn prop_recompute_is_bit_identical(usd in 0.01f64..10_000.0, eur in 0.01f64..10_000.0, h in 0.0f64..1e6) {
            let table = rates(usd, eur);
            let ledger = holdings(h, h, h);
            let first = recompute_totals(&table, &ledger).unwrap();
            let second = recompute_totals(&table, &ledger).unwrap();
            for ((_, a), (_, b)) in first.iter().zip(second.iter()) {
                prop_assert_eq!(a.to_bits(), b.to_bits());
            }
            let r1 = recompute_ratios(&table).unwrap();
            let r2 = recompute_ratios(&table).unwrap();
            for ((_, a), (_, b)) in r1.iter().zip(r2.iter()) {
                prop_assert_eq!(a.to_bits(), b.to_bits());
            }
        }
    }
}
