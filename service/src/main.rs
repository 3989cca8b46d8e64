//! RateWatch Binary
//!
//! Tracks RUB/USD/EUR rates and the value of configured holdings.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ratewatch_common::CurrencyCode;
use ratewatch_fx::CbrQuoteSource;
use ratewatch_service::{
    config::parse_debug_flag, router, ConsoleSink, CurrencyService, CurrencyTracker,
    ServiceConfig,
};

/// RateWatch CLI
#[derive(Parser, Debug)]
#[command(name = "ratewatch")]
#[command(about = "Currency rate tracker with holdings totals")]
struct Args {
    /// Minutes between rate refreshes
    #[arg(long, default_value = "5")]
    period: u64,

    /// Debug logging (1, True, true, y or Y)
    #[arg(long, default_value = "False")]
    debug: String,

    /// Starting RUB holdings
    #[arg(long, default_value = "0")]
    rub: f64,

    /// Starting USD holdings
    #[arg(long, default_value = "0")]
    usd: f64,

    /// Starting EUR holdings
    #[arg(long, default_value = "0")]
    eur: f64,

    /// HTTP listen address
    #[arg(long)]
    listen_addr: Option<String>,

    /// HTTP listen port
    #[arg(long)]
    port: Option<u16>,

    /// Quote source URL
    #[arg(long)]
    quote_url: Option<String>,

    /// Only print reports; do not serve HTTP
    #[arg(long)]
    console_only: bool,
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    let log_format = std::env::var("RATEWATCH_LOG_FORMAT").unwrap_or_default();
    if log_format.eq_ignore_ascii_case("json") {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}

fn build_config(args: &Args) -> ServiceConfig {
    let mut config = ServiceConfig::from_env();

    config.refresh_period = Duration::from_secs(args.period * 60);
    config.debug = parse_debug_flag(&args.debug);
    config.http_enabled = !args.console_only;
    config.set_initial_holding(CurrencyCode::rub(), args.rub);
    config.set_initial_holding(CurrencyCode::usd(), args.usd);
    config.set_initial_holding(CurrencyCode::eur(), args.eur);

    if let Some(addr) = &args.listen_addr {
        config.listen_addr = addr.clone();
    }
    if let Some(port) = args.port {
        config.listen_port = port;
    }
    if let Some(url) = &args.quote_url {
        config.quote_url = url.clone();
    }

    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = build_config(&args);
    init_tracing(config.debug);

    info!("Starting RateWatch");

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let quotes = Arc::new(CbrQuoteSource::new(&config.quote_url, config.fetch_timeout)?);
    let service = Arc::new(CurrencyService::new(
        config.clone(),
        quotes,
        Arc::new(ConsoleSink),
    ));

    // Set up graceful shutdown
    let service_clone = service.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received");
                service_clone.stop();
            }
            Err(e) => error!(error = %e, "Failed to listen for Ctrl+C"),
        }
    });

    let server = if config.http_enabled {
        let listener = tokio::net::TcpListener::bind(config.listen_socket()).await?;
        info!(addr = %listener.local_addr()?, "HTTP interface listening");

        let app = router(service.clone());
        let shutdown = service.shutdown_signal();
        Some(tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
        }))
    } else {
        None
    };

    service.clone().run().await?;

    if let Some(server) = server {
        server.await??;
    }

    info!("RateWatch shutdown complete");
    Ok(())
}
