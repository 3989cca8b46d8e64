//! RateWatch Common Types
//!
//! Currency codes, the configured currency set and the pair keys used by the
//! ratio table. Shared by the FX state engine and the service crate.

pub mod currency;
pub mod error;

pub use currency::*;
pub use error::*;
