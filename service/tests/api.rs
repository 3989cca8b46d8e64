use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use ratewatch_common::CurrencyCode;
use ratewatch_fx::MockQuoteSource;
use ratewatch_service::{router, CurrencyService, CurrencyTracker, MemorySink, ServiceConfig};
use tower::ServiceExt;

async fn build_service() -> Arc<CurrencyService> {
    let mut config = ServiceConfig::default();
    config.set_initial_holding(CurrencyCode::usd(), 10.0);
    config.set_initial_holding(CurrencyCode::eur(), 5.0);

    let source = Arc::new(MockQuoteSource::new("mock"));
    source.push_quotes(&[("USD", 75.0), ("EUR", 90.0)]);

    let service = Arc::new(CurrencyService::new(
        config,
        source,
        Arc::new(MemorySink::new()),
    ));
    service.refresh().await.unwrap();
    service
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn get_rate_for_known_code() {
    let app = router(build_service().await);

    let (status, body) = send(&app, get("/usd/get")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "usd: 75");

    let (status, body) = send(&app, get("/RUB/get")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "rub: 1");
}

#[tokio::test]
async fn get_amount_returns_snapshot() {
    let app = router(build_service().await);

    let (status, lower) = send(&app, get("/amount/get")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(lower.starts_with("rub: 0\nusd: 10\neur: 5\n\nrub-usd: 75\n"));
    assert!(lower.ends_with("rub: 1200\nusd: 16\neur: 13.333333333333334"));

    let (status, upper) = send(&app, get("/AMOUNT/get")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(upper, lower);
}

#[tokio::test]
async fn unknown_code_and_missing_segment_are_not_found() {
    let app = router(build_service().await);

    let (status, _) = send(&app, get("/xyz/get")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, get("/get")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn modify_adds_to_holdings_and_recomputes() {
    let service = build_service().await;
    let app = router(service.clone());

    let (status, body) = send(&app, post_form("/modify", "usd=5")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Changes successfully accepted");

    let (_, snapshot) = send(&app, get("/amount/get")).await;
    assert!(snapshot.starts_with("rub: 0\nusd: 15\neur: 5"));
    assert!(snapshot.contains("\n\nrub: 1575\nusd: 21\n"));
}

#[tokio::test]
async fn set_overwrites_holdings() {
    let service = build_service().await;
    let app = router(service.clone());

    let (_, body) = send(&app, post_form("/amount/set", "usd=1&EUR=2&rub=3")).await;
    assert_eq!(body, "Changes successfully accepted");

    service.with_state(|state| {
        assert_eq!(state.holdings().get(&CurrencyCode::usd()), Some(1.0));
        assert_eq!(state.holdings().get(&CurrencyCode::eur()), Some(2.0));
        assert_eq!(state.holdings().get(&CurrencyCode::rub()), Some(3.0));
        let totals = state.derived().totals().unwrap();
        assert_eq!(totals.get(&CurrencyCode::rub()), Some(3.0 + 75.0 + 180.0));
    });
}

#[tokio::test]
async fn partial_body_applies_valid_keys() {
    let service = build_service().await;
    let app = router(service.clone());

    let (_, body) = send(&app, post_form("/modify", "usd=5&gbp=1&eur=abc")).await;
    assert_eq!(body, "Changes successfully accepted");

    service.with_state(|state| {
        assert_eq!(state.holdings().get(&CurrencyCode::usd()), Some(15.0));
        assert_eq!(state.holdings().get(&CurrencyCode::eur()), Some(5.0));
    });
}

#[tokio::test]
async fn rejected_body_reports_no_changes() {
    let service = build_service().await;
    let app = router(service.clone());

    let (status, body) = send(&app, post_form("/modify", "xyz=1&usd=nan")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "No changes applied");

    let (_, body) = send(&app, post_form("/amount/set", "")).await;
    assert_eq!(body, "No changes applied");

    assert_eq!(
        service.with_state(|state| state.holdings().get(&CurrencyCode::usd())),
        Some(10.0)
    );
}

#[tokio::test]
async fn metrics_are_exported() {
    let service = build_service().await;
    let app = router(service.clone());

    send(&app, post_form("/modify", "usd=5&gbp=1")).await;

    let (status, body) = send(&app, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("ratewatch_fetches_total 1"));
    assert!(body.contains("ratewatch_mutations_accepted 1"));
    assert!(body.contains("ratewatch_mutations_rejected 1"));
}

#[test]
fn snapshot_without_rates_marks_values_undefined() {
    let service = Arc::new(CurrencyService::new(
        ServiceConfig::default(),
        Arc::new(MockQuoteSource::new("mock")),
        Arc::new(MemorySink::new()),
    ));
    let app = router(service);

    let (status, body) = tokio_test::block_on(send(&app, get("/usd/get")));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "usd: n/a");
}
