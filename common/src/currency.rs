//! Currency codes and the configured currency set.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CurrencyError;

/// Three-letter currency code, stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parse a code, ignoring case.
    pub fn parse(code: &str) -> Result<Self, CurrencyError> {
        let trimmed = code.trim();
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CurrencyError::InvalidCode(code.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Get the code as an upper-case string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower-case form used in console and HTTP output.
    pub fn to_lowercase(&self) -> String {
        self.0.to_ascii_lowercase()
    }

    pub fn rub() -> Self {
        Self("RUB".to_string())
    }

    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    pub fn eur() -> Self {
        Self("EUR".to_string())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = CurrencyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

/// Key of the ratio table: an unordered pair written in canonical order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RatioKey {
    /// Currency declared first in the set.
    pub left: CurrencyCode,
    /// Currency declared later in the set.
    pub right: CurrencyCode,
}

impl RatioKey {
    pub fn new(left: CurrencyCode, right: CurrencyCode) -> Self {
        Self { left, right }
    }

    /// Whether this key covers the given pair in either order.
    pub fn matches(&self, a: &CurrencyCode, b: &CurrencyCode) -> bool {
        (&self.left == a && &self.right == b) || (&self.left == b && &self.right == a)
    }
}

impl fmt::Display for RatioKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.left, self.right)
    }
}

/// The fixed, ordered list of tracked currencies.
///
/// Declaration order is the canonical order: it drives the ratio keys and
/// the order of every rendered table. The base currency is part of the set
/// and its rate is pinned to 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencySet {
    base: CurrencyCode,
    codes: Vec<CurrencyCode>,
}

impl CurrencySet {
    /// Create a set from a base code and the full ordered code list.
    pub fn new(base: CurrencyCode, codes: Vec<CurrencyCode>) -> Result<Self, CurrencyError> {
        if codes.is_empty() {
            return Err(CurrencyError::EmptySet);
        }

        for (idx, code) in codes.iter().enumerate() {
            if codes[..idx].contains(code) {
                return Err(CurrencyError::DuplicateCode(code.clone()));
            }
        }

        if !codes.contains(&base) {
            return Err(CurrencyError::BaseNotInSet(base));
        }

        Ok(Self { base, codes })
    }

    /// The base currency.
    pub fn base(&self) -> &CurrencyCode {
        &self.base
    }

    /// All codes in canonical order, base included.
    pub fn codes(&self) -> &[CurrencyCode] {
        &self.codes
    }

    /// Codes other than the base, in canonical order.
    pub fn foreign(&self) -> impl Iterator<Item = &CurrencyCode> {
        self.codes.iter().filter(move |c| *c != &self.base)
    }

    pub fn is_base(&self, code: &CurrencyCode) -> bool {
        &self.base == code
    }

    pub fn contains(&self, code: &CurrencyCode) -> bool {
        self.codes.contains(code)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Resolve user input to a configured code.
    pub fn resolve(&self, input: &str) -> Result<CurrencyCode, CurrencyError> {
        let code = CurrencyCode::parse(input)
            .map_err(|_| CurrencyError::UnknownCurrency(input.to_string()))?;
        if self.contains(&code) {
            Ok(code)
        } else {
            Err(CurrencyError::UnknownCurrency(input.to_string()))
        }
    }

    /// Every unordered pair, `a` declared before `b`.
    pub fn pairs(&self) -> Vec<RatioKey> {
        let mut pairs = Vec::with_capacity(self.codes.len() * (self.codes.len().saturating_sub(1)) / 2);
        for (idx, left) in self.codes.iter().enumerate() {
            for right in &self.codes[idx + 1..] {
                pairs.push(RatioKey::new(left.clone(), right.clone()));
            }
        }
        pairs
    }
}

impl Default for CurrencySet {
    fn default() -> Self {
        Self {
            base: CurrencyCode::rub(),
            codes: vec![CurrencyCode::rub(), CurrencyCode::usd(), CurrencyCode::eur()],
        }
    }
}
