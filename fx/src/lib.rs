//! RateWatch FX State Engine
//!
//! Exchange-rate table, holdings ledger and the metrics derived from them.
//!
//! # Features
//!
//! - Rate table with the base currency pinned to 1
//! - Holdings ledger with add/set mutations and per-key validation
//! - Explicit recomputation of pairwise ratios and holdings totals
//! - Quote source trait with a CBR daily JSON implementation
//!
//! # Example
//!
//! ```rust,ignore
//! use ratewatch_common::{CurrencyCode, CurrencySet};
//! use ratewatch_fx::{CurrencyState, HoldingsMode};
//!
//! let mut state = CurrencyState::new(CurrencySet::default(), &[(CurrencyCode::usd(), 10.0)]);
//! state.apply_rates(&quotes);
//! state.apply_holdings(&[("usd".into(), "10".into())], HoldingsMode::Add);
//! println!("{}", state.snapshot());
//! ```

pub mod derived;
pub mod error;
pub mod holdings;
pub mod provider;
pub mod rates;
pub mod snapshot;
pub mod state;

pub use derived::{recompute_ratios, recompute_totals, DerivedMetrics, RatioTable, TotalsTable};
pub use error::{FxError, FxResult};
pub use holdings::{HoldingsLedger, HoldingsMode};
pub use provider::{CbrQuoteSource, QuoteSource, RateQuotes};
pub use rates::{RateTable, RateUpdate};
pub use snapshot::Snapshot;
pub use state::{CurrencyState, MutationOutcome, RefreshOutcome};

#[cfg(any(test, feature = "test-utils"))]
pub use provider::MockQuoteSource;
