mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use bccr_datahub::api::{app_router, AppState};
use bccr_datahub::IndicatorService;
use common::{d, fixed_today, MockScraper};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

fn app(scraper: MockScraper) -> Router {
    let service: AppState = Arc::new(IndicatorService::new(Arc::new(scraper)).with_today(fixed_today));
    app_router(service, &["libertadfinanciera".to_string()])
}

async fn call(app: Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_check() {
    let (status, body) = call(app(MockScraper::new()), Method::GET, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn ranged_query_returns_sorted_data() {
    let (status, body) = call(
        app(MockScraper::new()),
        Method::GET,
        "/api/exchange_rates?date_from=2020/01/01&date_to=2020/03/15",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.get("error").is_none());
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 3);
    assert_eq!(data[0]["date"], "2020-03-01");
    assert_eq!(data[0]["buy"], 1.0);
    assert_eq!(data[0]["sale"], 6.0);
}

#[tokio::test]
async fn routes_are_served_without_prefix_too() {
    let (status, body) = call(
        app(MockScraper::new()),
        Method::GET,
        "/prime_rates?date_from=2020/01/01&date_to=2020/03/15",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn default_range_is_last_thirty_days() {
    let scraper = Arc::new(MockScraper::new());
    let service: AppState = Arc::new(IndicatorService::new(scraper.clone()).with_today(fixed_today));
    let app = app_router(service, &[]);

    let (status, _) = call(app, Method::GET, "/treasury_rates/usa").await;

    assert_eq!(status, StatusCode::OK);
    let calls = scraper.calls("treasury_rates_usa");
    assert_eq!(calls.first().unwrap().from, d(2024, 2, 9));
    assert_eq!(calls.last().unwrap().to, fixed_today());
}

#[tokio::test]
async fn malformed_dates_are_bad_requests() {
    let (status, body) = call(
        app(MockScraper::new()),
        Method::GET,
        "/basic_passive_rates?date_from=2020-01-01&date_to=2020-03-15",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"].is_null());
    assert_eq!(body["error"], "invalid date format. Should be in format: YYYY/MM/DD");
}

#[tokio::test]
async fn future_dates_are_bad_requests() {
    let (status, body) = call(
        app(MockScraper::new()),
        Method::GET,
        "/monetary_policy_rates?date_from=2024/01/01&date_to=2024/12/31",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid date range");
}

#[tokio::test]
async fn unsupported_periodicity_is_a_bad_request() {
    let (status, body) = call(
        app(MockScraper::new()),
        Method::GET,
        "/inflation_rates/costa_rica/filter?periocity=monthly",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("periodicity not supported"));
}

#[tokio::test]
async fn annual_filter_is_served() {
    let (status, body) = call(
        app(MockScraper::new()),
        Method::GET,
        "/api/exchange_rates/filter?periocity=annual",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 42);
}

#[tokio::test]
async fn exhausted_probe_is_not_found() {
    let (status, body) = call(app(MockScraper::new()), Method::GET, "/prime_rates/today").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["data"].is_null());
    assert_eq!(body["error"], "no results found");
}

#[tokio::test]
async fn today_value_is_wrapped_in_envelope() {
    let scraper = MockScraper::new().publishing(d(2024, 3, 9), 0.55);
    let (status, body) = call(app(scraper), Method::GET, "/treasury_rates/usa/today").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["value"], 0.55);
    assert_eq!(body["data"]["date"], "2024-03-09");
}

#[tokio::test]
async fn saving_without_repository_is_a_server_error() {
    let scraper = MockScraper::new().publishing(d(2024, 3, 10), 515.5);
    let (status, body) = call(app(scraper), Method::POST, "/exchange_rates/today").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("no repository configured"));
}

#[tokio::test]
async fn cors_echoes_allowed_origins_only() {
    let request = |origin: &str| {
        Request::builder()
            .uri("/health")
            .header("Origin", origin)
            .body(Body::empty())
            .unwrap()
    };

    let response = app(MockScraper::new())
        .oneshot(request("https://www.libertadfinanciera.com"))
        .await
        .unwrap();
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "https://www.libertadfinanciera.com"
    );

    let response = app(MockScraper::new())
        .oneshot(request("https://evil.example"))
        .await
        .unwrap();
    assert!(response.headers().get("access-control-allow-origin").is_none());
}
