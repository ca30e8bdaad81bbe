use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, Request, State};
use axum::http::header::{
    ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, ORIGIN, REFERER,
};
use axum::http::{request::Parts, HeaderName, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::errors::{IndicatorError, Result};
use crate::models::indicator::{IndicatorResponse, PeriodicityRequest, RangeRequest};
use crate::services::IndicatorServiceTrait;
use crate::util;

pub type AppState = Arc<dyn IndicatorServiceTrait>;

/// Query string accepted by the ranged and periodicity endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct IndicatorQuery {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub periocity: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Dates are only read when both bounds are given; otherwise the last 30 days are served.
pub fn decode_range(query: &IndicatorQuery, today: NaiveDate) -> Result<RangeRequest> {
    match (present(&query.date_from), present(&query.date_to)) {
        (Some(from), Some(to)) => {
            let from = util::parse_request_date(from)?;
            let to = util::parse_request_date(to)?;
            util::validate_range(from, to, today)
        }
        _ => Ok(util::default_range(today, util::DEFAULT_DAYS_TO_GO_BACK)),
    }
}

/// Reads the `periocity` parameter; a missing value is an unsupported periodicity.
pub fn decode_periodicity(query: &IndicatorQuery) -> Result<PeriodicityRequest> {
    let periodicity = present(&query.periocity)
        .ok_or_else(|| IndicatorError::UnsupportedPeriodicity(String::new()))?
        .parse()?;
    Ok(PeriodicityRequest { periodicity })
}

fn respond<T: Serialize>(result: Result<T>) -> Response {
    let body: IndicatorResponse<T> = result.into();
    let status = StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(body)).into_response()
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn exchange_rates(State(service): State<AppState>, Query(query): Query<IndicatorQuery>) -> Response {
    match decode_range(&query, service.today()) {
        Ok(request) => respond(service.exchange_rates(request).await),
        Err(e) => respond::<()>(Err(e)),
    }
}

async fn exchange_rates_filter(State(service): State<AppState>, Query(query): Query<IndicatorQuery>) -> Response {
    match decode_periodicity(&query) {
        Ok(request) => respond(service.exchange_rates_by_periodicity(request).await),
        Err(e) => respond::<()>(Err(e)),
    }
}

async fn today_exchange_rate(State(service): State<AppState>) -> Response {
    respond(service.today_exchange_rate().await)
}

async fn save_today_exchange_rate(State(service): State<AppState>) -> Response {
    respond(service.save_today_exchange_rate().await)
}

async fn stored_exchange_rates(State(service): State<AppState>) -> Response {
    respond(service.stored_exchange_rates().await)
}

async fn basic_passive_rates(State(service): State<AppState>, Query(query): Query<IndicatorQuery>) -> Response {
    match decode_range(&query, service.today()) {
        Ok(request) => respond(service.basic_passive_rates(request).await),
        Err(e) => respond::<()>(Err(e)),
    }
}

async fn today_basic_passive_rate(State(service): State<AppState>) -> Response {
    respond(service.today_basic_passive_rate().await)
}

async fn monetary_policy_rates(State(service): State<AppState>, Query(query): Query<IndicatorQuery>) -> Response {
    match decode_range(&query, service.today()) {
        Ok(request) => respond(service.monetary_policy_rates(request).await),
        Err(e) => respond::<()>(Err(e)),
    }
}

async fn today_monetary_policy_rate(State(service): State<AppState>) -> Response {
    respond(service.today_monetary_policy_rate().await)
}

async fn prime_rates(State(service): State<AppState>, Query(query): Query<IndicatorQuery>) -> Response {
    match decode_range(&query, service.today()) {
        Ok(request) => respond(service.prime_rates(request).await),
        Err(e) => respond::<()>(Err(e)),
    }
}

async fn today_prime_rate(State(service): State<AppState>) -> Response {
    respond(service.today_prime_rate().await)
}

async fn costa_rica_inflation_rates(
    State(service): State<AppState>,
    Query(query): Query<IndicatorQuery>,
) -> Response {
    match decode_range(&query, service.today()) {
        Ok(request) => respond(service.costa_rica_inflation_rates(request).await),
        Err(e) => respond::<()>(Err(e)),
    }
}

async fn costa_rica_inflation_rates_filter(
    State(service): State<AppState>,
    Query(query): Query<IndicatorQuery>,
) -> Response {
    match decode_periodicity(&query) {
        Ok(request) => respond(service.costa_rica_inflation_rates_by_periodicity(request).await),
        Err(e) => respond::<()>(Err(e)),
    }
}

async fn today_costa_rica_inflation_rate(State(service): State<AppState>) -> Response {
    respond(service.today_costa_rica_inflation_rate().await)
}

async fn usa_inflation_rates(State(service): State<AppState>, Query(query): Query<IndicatorQuery>) -> Response {
    match decode_range(&query, service.today()) {
        Ok(request) => respond(service.usa_inflation_rates(request).await),
        Err(e) => respond::<()>(Err(e)),
    }
}

async fn today_usa_inflation_rate(State(service): State<AppState>) -> Response {
    respond(service.today_usa_inflation_rate().await)
}

async fn treasury_rates_usa(State(service): State<AppState>, Query(query): Query<IndicatorQuery>) -> Response {
    match decode_range(&query, service.today()) {
        Ok(request) => respond(service.treasury_rates_usa(request).await),
        Err(e) => respond::<()>(Err(e)),
    }
}

async fn today_treasury_rate_usa(State(service): State<AppState>) -> Response {
    respond(service.today_treasury_rate_usa().await)
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;
    info!("{} {} {} {:?}", method, path, response.status().as_u16(), started.elapsed());
    response
}

/// Echoes the request origin when it contains one of `allowed_origins`.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allowed = allowed_origins.to_vec();
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _: &Parts| {
            origin
                .to_str()
                .map(|origin| allowed.iter().any(|candidate| origin.contains(candidate.as_str())))
                .unwrap_or(false)
        }))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            ORIGIN,
            REFERER,
            ACCEPT,
            ACCEPT_ENCODING,
            ACCEPT_LANGUAGE,
            HeaderName::from_static("x-requested-with"),
            CONTENT_TYPE,
            CONTENT_LENGTH,
            AUTHORIZATION,
        ])
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/exchange_rates", get(exchange_rates))
        .route("/exchange_rates/filter", get(exchange_rates_filter))
        .route("/exchange_rates/today", get(today_exchange_rate).post(save_today_exchange_rate))
        .route("/exchange_rates/stored", get(stored_exchange_rates))
        .route("/basic_passive_rates", get(basic_passive_rates))
        .route("/basic_passive_rates/today", get(today_basic_passive_rate))
        .route("/monetary_policy_rates", get(monetary_policy_rates))
        .route("/monetary_policy_rates/today", get(today_monetary_policy_rate))
        .route("/prime_rates", get(prime_rates))
        .route("/prime_rates/today", get(today_prime_rate))
        .route("/inflation_rates/costa_rica", get(costa_rica_inflation_rates))
        .route("/inflation_rates/costa_rica/filter", get(costa_rica_inflation_rates_filter))
        .route("/inflation_rates/costa_rica/today", get(today_costa_rica_inflation_rate))
        .route("/inflation_rates/usa", get(usa_inflation_rates))
        .route("/inflation_rates/usa/today", get(today_usa_inflation_rate))
        .route("/treasury_rates/usa", get(treasury_rates_usa))
        .route("/treasury_rates/usa/today", get(today_treasury_rate_usa))
}

/// Every endpoint is served at the root and again under `/api`.
pub fn app_router(service: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .merge(routes())
        .nest("/api", routes())
        .with_state(service)
        .layer(middleware::from_fn(log_request))
        .layer(cors_layer(allowed_origins))
}
