//! Service configuration.

use std::time::Duration;

use ratewatch_common::{CurrencyCode, CurrencySet};
use ratewatch_fx::provider::CBR_DAILY_URL;

/// Values of `--debug` that turn debug mode on.
pub const DEBUG_TRUE_VALUES: [&str; 5] = ["1", "True", "true", "y", "Y"];

/// Whether a `--debug` argument enables debug mode.
pub fn parse_debug_flag(value: &str) -> bool {
    DEBUG_TRUE_VALUES.contains(&value)
}

/// Main service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Tracked currencies; the base is pinned to rate 1.
    pub currencies: CurrencySet,
    /// Starting holdings per currency.
    pub initial_holdings: Vec<(CurrencyCode, f64)>,
    /// Interval between quote fetches.
    pub refresh_period: Duration,
    /// Interval between reporter ticks.
    pub report_interval: Duration,
    /// Quote source URL.
    pub quote_url: String,
    /// Timeout for a single quote fetch.
    pub fetch_timeout: Duration,
    /// Listen address.
    pub listen_addr: String,
    /// Listen port.
    pub listen_port: u16,
    /// Serve the HTTP interface; console reporting runs either way.
    pub http_enabled: bool,
    /// Debug mode.
    pub debug: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let currencies = CurrencySet::default();
        let initial_holdings = currencies.codes().iter().map(|c| (c.clone(), 0.0)).collect();

        Self {
            currencies,
            initial_holdings,
            refresh_period: Duration::from_secs(5 * 60),
            report_interval: Duration::from_secs(60),
            quote_url: CBR_DAILY_URL.to_string(),
            fetch_timeout: Duration::from_secs(10),
            listen_addr: "0.0.0.0".to_string(),
            listen_port: 8080,
            http_enabled: true,
            debug: false,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("RATEWATCH_LISTEN_ADDR") {
            config.listen_addr = addr;
        }

        if let Ok(port) = std::env::var("RATEWATCH_LISTEN_PORT") {
            if let Ok(port) = port.parse() {
                config.listen_port = port;
            }
        }

        if let Ok(url) = std::env::var("RATEWATCH_QUOTE_URL") {
            config.quote_url = url;
        }

        if let Ok(secs) = std::env::var("RATEWATCH_FETCH_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                config.fetch_timeout = Duration::from_secs(secs);
            }
        }

        if let Ok(secs) = std::env::var("RATEWATCH_REPORT_INTERVAL_SECS") {
            if let Ok(secs) = secs.parse() {
                config.report_interval = Duration::from_secs(secs);
            }
        }

        config
    }

    /// Set the starting holding for one code.
    pub fn set_initial_holding(&mut self, code: CurrencyCode, amount: f64) {
        match self.initial_holdings.iter_mut().find(|(c, _)| *c == code) {
            Some(entry) => entry.1 = amount,
            None => self.initial_holdings.push((code, amount)),
        }
    }

    /// `addr:port` for the HTTP listener.
    pub fn listen_socket(&self) -> String {
        format!("{}:{}", self.listen_addr, self.listen_port)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.refresh_period.is_zero() {
            return Err("Refresh period cannot be 0".to_string());
        }

        if self.report_interval.is_zero() {
            return Err("Report interval cannot be 0".to_string());
        }

        if self.fetch_timeout.is_zero() {
            return Err("Fetch timeout cannot be 0".to_string());
        }

        if self.quote_url.is_empty() {
            return Err("Quote URL cannot be empty".to_string());
        }

        if self.http_enabled && self.listen_port == 0 {
            return Err("Listen port cannot be 0".to_string());
        }

        for (code, amount) in &self.initial_holdings {
            if !self.currencies.contains(code) {
                return Err(format!("Holding given for untracked currency {code}"));
            }
            if !amount.is_finite() || *amount < 0.0 {
                return Err(format!("Starting amount for {code} must be a non-negative number"));
            }
        }

        Ok(())
    }
}
