//! HTTP surface over the currency service.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use ratewatch_fx::{FxError, HoldingsMode};

use crate::service::CurrencyService;

/// Path segment that selects the full snapshot instead of a single rate.
const SNAPSHOT_SEGMENT: &str = "amount";

pub const CHANGES_ACCEPTED: &str = "Changes successfully accepted";
pub const NO_CHANGES: &str = "No changes applied";

/// Errors surfaced to HTTP clients.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
}

impl From<FxError> for ApiError {
    fn from(e: FxError) -> Self {
        ApiError::NotFound(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message).into_response(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Build the router.
pub fn router(service: Arc<CurrencyService>) -> Router {
    Router::new()
        .route("/amount/get", get(get_snapshot))
        .route("/{code}/get", get(get_currency))
        .route("/modify", post(add_holdings))
        .route("/amount/set", post(set_holdings))
        .route("/metrics", get(get_metrics))
        .with_state(service)
}

async fn get_snapshot(State(service): State<Arc<CurrencyService>>) -> String {
    service.snapshot().to_string()
}

/// Rate for one code, or the snapshot when the segment is `amount` in any case.
async fn get_currency(
    State(service): State<Arc<CurrencyService>>,
    Path(code): Path<String>,
) -> ApiResult<String> {
    if code.eq_ignore_ascii_case(SNAPSHOT_SEGMENT) {
        return Ok(service.snapshot().to_string());
    }
    Ok(service.rate_text(&code)?)
}

async fn add_holdings(
    State(service): State<Arc<CurrencyService>>,
    Form(entries): Form<Vec<(String, String)>>,
) -> &'static str {
    modify(&service, &entries, HoldingsMode::Add)
}

async fn set_holdings(
    State(service): State<Arc<CurrencyService>>,
    Form(entries): Form<Vec<(String, String)>>,
) -> &'static str {
    modify(&service, &entries, HoldingsMode::Set)
}

fn modify(service: &CurrencyService, entries: &[(String, String)], mode: HoldingsMode) -> &'static str {
    if service.modify_holdings(entries, mode).has_changes() {
        CHANGES_ACCEPTED
    } else {
        NO_CHANGES
    }
}

async fn get_metrics(State(service): State<Arc<CurrencyService>>) -> String {
    service.metrics().to_prometheus()
}
