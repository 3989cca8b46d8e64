//! RateWatch Service
//!
//! Keeps exchange rates fresh in the background, prints a report when rates
//! or holdings change, and serves rate queries and holdings updates over HTTP.

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod reporter;
pub mod service;
pub mod state;

pub use api::router;
pub use config::ServiceConfig;
pub use error::{ServiceError, ServiceResult};
pub use reporter::{ConsoleSink, MemorySink, SnapshotSink};
pub use service::{CurrencyService, CurrencyTracker};
pub use state::{RefresherState, ServiceState};
