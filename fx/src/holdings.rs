//! Amounts the user holds in each tracked currency.

use ratewatch_common::{CurrencyCode, CurrencySet};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::error::{FxError, FxResult};

/// How a mutation combines with the current amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HoldingsMode {
    /// Add the value to the current amount.
    Add,
    /// Replace the current amount.
    Set,
}

impl fmt::Display for HoldingsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HoldingsMode::Add => write!(f, "add"),
            HoldingsMode::Set => write!(f, "set"),
        }
    }
}

/// Per-currency holdings in canonical order.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldingsLedger {
    entries: Vec<(CurrencyCode, Option<f64>)>,
}

impl HoldingsLedger {
    /// Create a ledger with no amounts recorded yet.
    pub fn new(currencies: &CurrencySet) -> Self {
        Self {
            entries: currencies
                .codes()
                .iter()
                .map(|code| (code.clone(), None))
                .collect(),
        }
    }

    /// Create a ledger seeded with starting amounts; codes not listed start at zero.
    pub fn with_amounts(currencies: &CurrencySet, amounts: &[(CurrencyCode, f64)]) -> Self {
        let entries = currencies
            .codes()
            .iter()
            .map(|code| {
                let amount = amounts
                    .iter()
                    .find(|(c, _)| c == code)
                    .map(|(_, amount)| *amount)
                    .unwrap_or(0.0);
                (code.clone(), Some(amount))
            })
            .collect();

        Self { entries }
    }

    /// Amount held in `code`, `None` if unknown or never set.
    pub fn get(&self, code: &CurrencyCode) -> Option<f64> {
        self.entries
            .iter()
            .find(|(c, _)| c == code)
            .and_then(|(_, amount)| *amount)
    }

    /// Iterate entries in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&CurrencyCode, Option<f64>)> {
        self.entries.iter().map(|(code, amount)| (code, *amount))
    }

    /// Apply a single mutation and return the new amount.
    ///
    /// `code` is matched case-insensitively. Nothing changes unless the code
    /// is tracked, `raw` parses to a finite number and the resulting amount
    /// is not negative. Adding to a never-set holding starts from zero.
    pub fn apply(&mut self, code: &str, raw: &str, mode: HoldingsMode) -> FxResult<f64> {
        let parsed = CurrencyCode::parse(code)?;
        let entry = self
            .entries
            .iter_mut()
            .find(|(c, _)| *c == parsed)
            .ok_or_else(|| FxError::UnknownCurrency(code.to_string()))?;

        let invalid = || FxError::InvalidAmount {
            code: parsed.clone(),
            input: raw.to_string(),
        };

        let value: f64 = raw.trim().parse().map_err(|_| invalid())?;
        if !value.is_finite() {
            return Err(invalid());
        }

        let next = match mode {
            HoldingsMode::Add => entry.1.unwrap_or(0.0) + value,
            HoldingsMode::Set => value,
        };
        if !next.is_finite() || next < 0.0 {
            return Err(invalid());
        }

        debug!(currency = %parsed, %mode, value, amount = next, "Holding updated");
        entry.1 = Some(next);
        Ok(next)
    }
}
