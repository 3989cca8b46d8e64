//! Error types for currency handling.

use crate::CurrencyCode;
use thiserror::Error;

/// Errors raised while parsing codes or building the currency set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CurrencyError {
    /// Input is not a well-formed three-letter code.
    #[error("Invalid currency code: {0}")]
    InvalidCode(String),

    /// Well-formed or not, the code is not in the configured set.
    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    /// The currency set has no codes.
    #[error("Currency set is empty")]
    EmptySet,

    /// A code is declared twice.
    #[error("Duplicate currency code: {0}")]
    DuplicateCode(CurrencyCode),

    /// The base code is not part of the declared codes.
    #[error("Base currency {0} is not in the currency set")]
    BaseNotInSet(CurrencyCode),
}
