//! Quote source trait and implementations.

use async_trait::async_trait;
use ratewatch_common::CurrencyCode;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::{FxError, FxResult};

/// Daily quotes published by the Central Bank of Russia.
pub const CBR_DAILY_URL: &str = "https://www.cbr-xml-daily.ru/daily_json.js";

/// Rates parsed from one quote document, keyed by currency code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateQuotes(HashMap<CurrencyCode, f64>);

impl RateQuotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, code: CurrencyCode, value: f64) {
        self.0.insert(code, value);
    }

    pub fn get(&self, code: &CurrencyCode) -> Option<f64> {
        self.0.get(code).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse a daily quote document: a `Valute` object mapping codes to
    /// entries with a numeric `Value`.
    ///
    /// Entries whose key is not a three-letter code are ignored; any other
    /// deviation from the shape is a parse failure.
    pub fn from_json(body: &[u8]) -> FxResult<Self> {
        let document: DailyQuotes = serde_json::from_slice(body)?;

        let quotes = document
            .valute
            .into_iter()
            .filter_map(|(key, entry)| {
                CurrencyCode::parse(&key)
                    .ok()
                    .map(|code| (code, entry.value))
            })
            .collect();

        Ok(quotes)
    }
}

impl FromIterator<(CurrencyCode, f64)> for RateQuotes {
    fn from_iter<I: IntoIterator<Item = (CurrencyCode, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Deserialize)]
struct DailyQuotes {
    #[serde(rename = "Valute")]
    valute: HashMap<String, ValuteEntry>,
}

#[derive(Debug, Deserialize)]
struct ValuteEntry {
    #[serde(rename = "Value")]
    value: f64,
}

/// Trait for exchange-rate sources.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Get the source name.
    fn name(&self) -> &str;

    /// Fetch and parse the current quotes.
    async fn fetch_quotes(&self) -> FxResult<RateQuotes>;
}

/// Quote source backed by the CBR daily JSON feed.
#[derive(Clone)]
pub struct CbrQuoteSource {
    client: Client,
    url: String,
}

impl CbrQuoteSource {
    /// Create a source for `url` whose requests time out after `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> FxResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl QuoteSource for CbrQuoteSource {
    fn name(&self) -> &str {
        "CBR"
    }

    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch_quotes(&self) -> FxResult<RateQuotes> {
        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(FxError::FetchFailure(format!(
                "quote request failed: {}",
                response.status()
            )));
        }

        let body = response.bytes().await?;
        debug!(bytes = body.len(), "Currency data successfully received");

        RateQuotes::from_json(&body)
    }
}

/// Scripted quote source for tests.
///
/// Returns queued results in order; once the queue is empty the last
/// result is repeated.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockQuoteSource {
    name: String,
    queue: parking_lot::Mutex<std::collections::VecDeque<FxResult<RateQuotes>>>,
    last: parking_lot::Mutex<Option<FxResult<RateQuotes>>>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockQuoteSource {
    /// Create a new mock source.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queue: parking_lot::Mutex::new(std::collections::VecDeque::new()),
            last: parking_lot::Mutex::new(None),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Queue a successful fetch.
    pub fn push_quotes(&self, quotes: &[(&str, f64)]) {
        let quotes = quotes
            .iter()
            .filter_map(|(code, value)| CurrencyCode::parse(code).ok().map(|c| (c, *value)))
            .collect();
        self.queue.lock().push_back(Ok(quotes));
    }

    /// Queue a failed fetch.
    pub fn push_error(&self, error: FxError) {
        self.queue.lock().push_back(Err(error));
    }

    /// Number of fetches served.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl QuoteSource for MockQuoteSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_quotes(&self) -> FxResult<RateQuotes> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        let mut last = self.last.lock();
        if let Some(next) = self.queue.lock().pop_front() {
            *last = Some(next);
        }

        last.clone()
            .unwrap_or_else(|| Err(FxError::FetchFailure("no quotes queued".to_string())))
    }
}
