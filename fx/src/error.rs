//! FX engine error types.

use ratewatch_common::{CurrencyCode, CurrencyError};
use thiserror::Error;

/// Errors that can occur in the FX state engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FxError {
    /// Quote source could not be reached, timed out or answered non-2xx.
    #[error("Failed to fetch quotes: {0}")]
    FetchFailure(String),

    /// Quote payload is not the expected JSON shape.
    #[error("Failed to parse quotes: {0}")]
    ParseFailure(String),

    /// Ratio recomputation found a currency without a rate.
    #[error("Rates incomplete: no rate for {0}")]
    IncompleteRates(CurrencyCode),

    /// Totals recomputation found a currency without a rate or holding.
    #[error("Data incomplete: missing value for {0}")]
    IncompleteData(CurrencyCode),

    /// A rate used as a divisor is zero or not finite.
    #[error("Rate for {0} cannot be used as a divisor")]
    ZeroRate(CurrencyCode),

    /// Code is not part of the configured currency set.
    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    /// Amount is not a finite number, or would leave a negative holding.
    #[error("Invalid amount for {code}: {input}")]
    InvalidAmount { code: CurrencyCode, input: String },
}

impl FxError {
    /// Whether the next refresh cycle may succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FxError::FetchFailure(_) | FxError::ParseFailure(_))
    }

    /// Stable error code for logs and metrics labels.
    pub fn error_code(&self) -> &'static str {
        match self {
            FxError::FetchFailure(_) => "FETCH_FAILURE",
            FxError::ParseFailure(_) => "PARSE_FAILURE",
            FxError::IncompleteRates(_) => "INCOMPLETE_RATES",
            FxError::IncompleteData(_) => "INCOMPLETE_DATA",
            FxError::ZeroRate(_) => "ZERO_RATE",
            FxError::UnknownCurrency(_) => "UNKNOWN_CURRENCY",
            FxError::InvalidAmount { .. } => "INVALID_AMOUNT",
        }
    }
}

impl From<CurrencyError> for FxError {
    fn from(err: CurrencyError) -> Self {
        match err {
            CurrencyError::UnknownCurrency(code) | CurrencyError::InvalidCode(code) => {
                FxError::UnknownCurrency(code)
            }
            other => FxError::UnknownCurrency(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for FxError {
    fn from(err: reqwest::Error) -> Self {
        FxError::FetchFailure(err.to_string())
    }
}

impl From<serde_json::Error> for FxError {
    fn from(err: serde_json::Error) -> Self {
        FxError::ParseFailure(err.to_string())
    }
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(FxError::FetchFailure("timeout".into()).is_retryable());
        assert!(FxError::ParseFailure("eof".into()).is_retryable());
        assert!(!FxError::IncompleteRates(CurrencyCode::usd()).is_retryable());
        assert!(!FxError::UnknownCurrency("GBP".into()).is_retryable());
    }

    #[test]
    fn test_unknown_currency_from_currency_error() {
        let err: FxError = CurrencyError::UnknownCurrency("gbp".into()).into();
        assert_eq!(err, FxError::UnknownCurrency("gbp".into()));
        assert_eq!(err.error_code(), "UNKNOWN_CURRENCY");
    }
}
