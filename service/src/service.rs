//! Currency tracking service: the refresh loop, the report loop and the
//! request-facing accessors over one shared [`CurrencyState`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use ratewatch_fx::{
    CurrencyState, FxResult, HoldingsMode, MutationOutcome, QuoteSource,
    RefreshOutcome, Snapshot,
};

use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::metrics::{Metrics, SharedMetrics};
use crate::reporter::{ReportBaseline, SnapshotSink};
use crate::state::{RefresherState, ServiceState};

/// Operations of a periodically refreshed currency tracker.
#[async_trait]
pub trait CurrencyTracker: Send + Sync {
    /// Run one fetch cycle and fold the result into the shared state.
    async fn refresh(&self) -> FxResult<RefreshOutcome>;

    /// Render a snapshot if rates or holdings changed since the last render.
    async fn report(&self) -> Option<Snapshot>;

    /// Drive both loops until shutdown is requested.
    async fn run(self: Arc<Self>) -> ServiceResult<()>;
}

/// The single owner of the shared currency state.
///
/// Locks are `parking_lot` guards taken for one synchronous step at a time
/// and never held across an await.
pub struct CurrencyService {
    config: ServiceConfig,
    state: RwLock<CurrencyState>,
    lifecycle: RwLock<ServiceState>,
    refresher: RwLock<RefresherState>,
    quotes: Arc<dyn QuoteSource>,
    sink: Arc<dyn SnapshotSink>,
    metrics: SharedMetrics,
    baseline: Mutex<ReportBaseline>,
    shutdown_tx: watch::Sender<bool>,
}

impl CurrencyService {
    /// Create a service with the configured starting holdings and no rates.
    pub fn new(
        config: ServiceConfig,
        quotes: Arc<dyn QuoteSource>,
        sink: Arc<dyn SnapshotSink>,
    ) -> Self {
        let state = CurrencyState::new(config.currencies.clone(), &config.initial_holdings);
        let baseline = ReportBaseline::capture(&state);
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            config,
            state: RwLock::new(state),
            lifecycle: RwLock::new(ServiceState::Starting),
            refresher: RwLock::new(RefresherState::Idle),
            quotes,
            sink,
            metrics: Arc::new(Metrics::new()),
            baseline: Mutex::new(baseline),
            shutdown_tx,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn metrics(&self) -> SharedMetrics {
        self.metrics.clone()
    }

    pub fn lifecycle(&self) -> ServiceState {
        *self.lifecycle.read()
    }

    pub fn refresher_state(&self) -> RefresherState {
        *self.refresher.read()
    }

    /// Read the shared state under the lock.
    pub fn with_state<R>(&self, f: impl FnOnce(&CurrencyState) -> R) -> R {
        f(&self.state.read())
    }

    /// `"{code}: {rate}"` for a configured code, matched case-insensitively.
    pub fn rate_text(&self, code: &str) -> FxResult<String> {
        let state = self.state.read();
        let code = state.currencies().resolve(code)?;

        Ok(match state.rate(&code) {
            Some(rate) => format!("{}: {}", code.to_lowercase(), rate),
            None => format!("{}: n/a", code.to_lowercase()),
        })
    }

    /// Current holdings, ratios and totals.
    pub fn snapshot(&self) -> Snapshot {
        self.state.read().snapshot()
    }

    /// Apply a batch of holdings changes and recompute once if any applied.
    #[instrument(skip(self, entries), fields(keys = entries.len()))]
    pub fn modify_holdings(&self, entries: &[(String, String)], mode: HoldingsMode) -> MutationOutcome {
        let outcome = self.state.write().apply_holdings(entries, mode);

        self.metrics
            .mutations(outcome.applied.len(), outcome.rejected.len());
        if let Some(recompute) = &outcome.recompute {
            self.metrics.recomputed(recompute.is_ok());
        }

        outcome
    }

    /// Request shutdown of both loops.
    pub fn stop(&self) {
        {
            let mut lifecycle = self.lifecycle.write();
            if lifecycle.is_terminal() {
                return;
            }
            *lifecycle = ServiceState::ShuttingDown;
        }

        info!("Stopping currency service");
        self.shutdown_tx.send_replace(true);
    }

    /// Future that resolves once shutdown has been requested.
    pub fn shutdown_signal(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.shutdown_tx.subscribe();
        async move {
            loop {
                let stopped = *rx.borrow_and_update();
                if stopped || rx.changed().await.is_err() {
                    break;
                }
            }
        }
    }

    fn set_refresher(&self, state: RefresherState) {
        debug!(refresher = %state, "Refresher state changed");
        *self.refresher.write() = state;
    }

    async fn refresh_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let period = self.config.refresh_period;
        loop {
            if *shutdown.borrow() {
                break;
            }

            // Failures are logged and counted inside refresh.
            let _ = self.refresh().await;

            if !wait_or_shutdown(period, &mut shutdown).await {
                break;
            }
        }
        debug!("Refresh loop exited");
    }

    async fn report_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let interval = self.config.report_interval;
        loop {
            if *shutdown.borrow() {
                break;
            }

            self.report().await;

            if !wait_or_shutdown(interval, &mut shutdown).await {
                break;
            }
        }
        debug!("Report loop exited");
    }
}

/// Sleep for `period`; false if shutdown was requested meanwhile.
async fn wait_or_shutdown(period: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(period) => true,
        changed = shutdown.changed() => changed.is_ok() && !*shutdown.borrow(),
    }
}

#[async_trait]
impl CurrencyTracker for CurrencyService {
    #[instrument(skip(self), fields(source = %self.quotes.name()))]
    async fn refresh(&self) -> FxResult<RefreshOutcome> {
        self.set_refresher(RefresherState::Fetching);
        self.metrics.fetch_started();

        let quotes = match self.quotes.fetch_quotes().await {
            Ok(quotes) => quotes,
            Err(e) => {
                self.metrics.fetch_failed(&e);
                warn!(
                    error = %e,
                    code = e.error_code(),
                    retryable = e.is_retryable(),
                    "Quote fetch failed, keeping current rates"
                );
                self.set_refresher(RefresherState::Idle);
                return Err(e);
            }
        };

        let outcome = self.state.write().apply_rates(&quotes);

        match &outcome {
            RefreshOutcome::Unchanged { .. } => {
                self.set_refresher(RefresherState::Skipping);
                self.metrics.rates_unchanged();
            }
            RefreshOutcome::Updated { recompute, .. } => {
                self.set_refresher(RefresherState::Updating);
                self.metrics.rates_updated();
                self.metrics.recomputed(recompute.is_ok());
            }
        }

        self.set_refresher(RefresherState::Idle);
        Ok(outcome)
    }

    async fn report(&self) -> Option<Snapshot> {
        let snapshot = {
            let state = self.state.read();
            let mut baseline = self.baseline.lock();
            if baseline.matches(&state) {
                return None;
            }
            *baseline = ReportBaseline::capture(&state);
            state.snapshot()
        };

        self.sink.render(&snapshot);
        self.metrics.rendered();
        Some(snapshot)
    }

    async fn run(self: Arc<Self>) -> ServiceResult<()> {
        {
            let mut lifecycle = self.lifecycle.write();
            if *lifecycle != ServiceState::Starting {
                return Err(ServiceError::InvalidState(*lifecycle));
            }
            *lifecycle = ServiceState::Running;
        }

        info!(
            source = %self.quotes.name(),
            period_secs = self.config.refresh_period.as_secs(),
            report_secs = self.config.report_interval.as_secs(),
            "Currency service running"
        );

        let refresh = tokio::spawn(self.clone().refresh_loop(self.shutdown_tx.subscribe()));
        let report = tokio::spawn(self.clone().report_loop(self.shutdown_tx.subscribe()));

        let (refresh, report) = tokio::join!(refresh, report);
        *self.lifecycle.write() = ServiceState::Stopped;

        for result in [refresh, report] {
            if let Err(e) = result {
                error!(error = %e, "Background loop terminated abnormally");
                return Err(ServiceError::Task(e.to_string()));
            }
        }

        info!("Currency service stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::MemorySink;
    use ratewatch_common::CurrencyCode;
    use ratewatch_fx::{FxError, MockQuoteSource};

    fn config() -> ServiceConfig {
        let mut config = ServiceConfig::default();
        config.set_initial_holding(CurrencyCode::usd(), 10.0);
        config.set_initial_holding(CurrencyCode::eur(), 5.0);
        config.refresh_period = Duration::from_millis(10);
        config.report_interval = Duration::from_millis(10);
        config.http_enabled = false;
        config
    }

    fn service(source: Arc<MockQuoteSource>, sink: Arc<MemorySink>) -> Arc<CurrencyService> {
        Arc::new(CurrencyService::new(config(), source, sink))
    }

    #[tokio::test]
    async fn test_refresh_then_report() {
        let source = Arc::new(MockQuoteSource::new("mock"));
        source.push_quotes(&[("USD", 75.0), ("EUR", 90.0)]);
        let sink = Arc::new(MemorySink::new());
        let service = service(source, sink.clone());

        assert!(service.report().await.is_none());

        let outcome = service.refresh().await.unwrap();
        assert!(outcome.is_updated());

        let snapshot = service.report().await.unwrap();
        assert!(snapshot.to_string().ends_with("rub: 1200\nusd: 16\neur: 13.333333333333334"));
        assert_eq!(sink.count(), 1);
        assert_eq!(service.refresher_state(), RefresherState::Idle);
    }

    #[tokio::test]
    async fn test_unchanged_rates_do_not_render() {
        let source = Arc::new(MockQuoteSource::new("mock"));
        source.push_quotes(&[("USD", 75.0), ("EUR", 90.0)]);
        let sink = Arc::new(MemorySink::new());
        let service = service(source, sink.clone());

        service.refresh().await.unwrap();
        service.report().await.unwrap();

        let outcome = service.refresh().await.unwrap();
        assert!(!outcome.is_updated());
        assert!(service.report().await.is_none());
        assert_eq!(sink.count(), 1);
        assert_eq!(service.metrics().snapshot().rates_unchanged, 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_rates() {
        let source = Arc::new(MockQuoteSource::new("mock"));
        source.push_quotes(&[("USD", 75.0), ("EUR", 90.0)]);
        source.push_error(FxError::FetchFailure("timeout".into()));
        source.push_error(FxError::ParseFailure("missing Valute".into()));
        let service = service(source, Arc::new(MemorySink::new()));

        service.refresh().await.unwrap();
        assert!(service.refresh().await.is_err());
        assert!(service.refresh().await.is_err());

        assert_eq!(service.rate_text("usd").unwrap(), "usd: 75");
        let metrics = service.metrics().snapshot();
        assert_eq!(metrics.fetch_failures, 1);
        assert_eq!(metrics.parse_failures, 1);
    }

    #[tokio::test]
    async fn test_rate_text() {
        let source = Arc::new(MockQuoteSource::new("mock"));
        let service = service(source, Arc::new(MemorySink::new()));

        assert_eq!(service.rate_text("RUB").unwrap(), "rub: 1");
        assert_eq!(service.rate_text("usd").unwrap(), "usd: n/a");
        assert!(service.rate_text("xyz").is_err());
    }

    #[tokio::test]
    async fn test_modify_holdings_counts_mutations() {
        let source = Arc::new(MockQuoteSource::new("mock"));
        source.push_quotes(&[("USD", 75.0), ("EUR", 90.0)]);
        let service = service(source, Arc::new(MemorySink::new()));
        service.refresh().await.unwrap();

        let outcome = service.modify_holdings(
            &[("usd".into(), "5".into()), ("gbp".into(), "1".into())],
            HoldingsMode::Add,
        );

        assert!(outcome.has_changes());
        let metrics = service.metrics().snapshot();
        assert_eq!(metrics.mutations_accepted, 1);
        assert_eq!(metrics.mutations_rejected, 1);
        assert_eq!(
            service.with_state(|s| s.holdings().get(&CurrencyCode::usd())),
            Some(15.0)
        );
    }

    #[tokio::test]
    async fn test_run_until_stopped() {
        let source = Arc::new(MockQuoteSource::new("mock"));
        source.push_quotes(&[("USD", 75.0), ("EUR", 90.0)]);
        let sink = Arc::new(MemorySink::new());
        let service = service(source.clone(), sink.clone());

        let handle = tokio::spawn(service.clone().run());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(service.lifecycle().is_running());
        service.stop();

        handle.await.unwrap().unwrap();
        assert_eq!(service.lifecycle(), ServiceState::Stopped);
        assert!(source.calls() >= 2);
        assert_eq!(sink.count(), 1);
    }

    #[tokio::test]
    async fn test_run_twice_is_rejected() {
        let source = Arc::new(MockQuoteSource::new("mock"));
        let service = service(source, Arc::new(MemorySink::new()));

        service.stop();
        let result = service.clone().run().await;
        assert!(matches!(result, Err(ServiceError::InvalidState(ServiceState::ShuttingDown))));
    }
}
