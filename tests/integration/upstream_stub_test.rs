//! End-to-end tests against a stub pricing source.
//!
//! Each test starts a fake upstream (`/auth`, `/stocks`, `/stocks/{ticker}`)
//! on an ephemeral port, wires the real reqwest clients to it, serves the
//! gateway router on a second port, and talks to it over HTTP.
//! Run with: `cargo test --test upstream_stub_test`

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stockstats_gateway::api::routes::create_router;
use stockstats_gateway::api::state::AppState;
use stockstats_gateway::application::{AggregationService, TokenCache};
use stockstats_gateway::config::ServiceCredentials;
use stockstats_gateway::infrastructure::{build_http_client, AuthClient, PricingClient};

#[derive(Default)]
struct StubUpstream {
    auth_calls: AtomicUsize,
    stock_calls: AtomicUsize,
    fail_auth: bool,
    reject_first_token: bool,
}

async fn stub_auth(State(stub): State<Arc<StubUpstream>>, Json(body): Json<Value>) -> Response {
    if stub.fail_auth {
        return (StatusCode::UNAUTHORIZED, "invalid client credentials").into_response();
    }
    if body["clientID"] != "client-id" || body["clientSecret"] != "client-secret" {
        return (StatusCode::BAD_REQUEST, "unexpected credential payload").into_response();
    }
    let n = stub.auth_calls.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({
        "token_type": "Bearer",
        "access_token": format!("stub-token-{}", n),
        "expires_in": 300
    }))
    .into_response()
}

fn authorized(stub: &StubUpstream, headers: &HeaderMap) -> bool {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    header.starts_with("Bearer stub-token-")
        && !(stub.reject_first_token && header == "Bearer stub-token-1")
}

async fn stub_stock(
    State(stub): State<Arc<StubUpstream>>,
    Path(ticker): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&stub, &headers) {
        return (StatusCode::UNAUTHORIZED, "invalid token").into_response();
    }
    if !query.contains_key("minutes") {
        return (StatusCode::BAD_REQUEST, "minutes required").into_response();
    }
    stub.stock_calls.fetch_add(1, Ordering::SeqCst);

    match ticker.as_str() {
        "AAPL" => Json(json!([
            {"price": 100.0, "lastUpdatedAt": "2025-05-08T10:00:05.1234567Z"},
            {"price": 200.0, "lastUpdatedAt": "2025-05-08T10:01:10Z"},
            {"price": 300.0, "lastUpdatedAt": "2025-05-08T10:02:10Z"}
        ]))
        .into_response(),
        "MSFT" => Json(json!([
            {"price": 410.0, "lastUpdatedAt": "2025-05-08T10:01:50Z"},
            {"price": 400.0, "lastUpdatedAt": "2025-05-08T10:00:40Z"},
            {"price": 999.0, "lastUpdatedAt": "2025-05-08T10:09:00Z"}
        ]))
        .into_response(),
        "NVDA" => Json(json!({
            "stock": {"price": 875.5, "lastUpdatedAt": "2025-05-08T10:00:00Z"}
        }))
        .into_response(),
        _ => (StatusCode::NOT_FOUND, "unknown ticker").into_response(),
    }
}

async fn stub_listing(State(stub): State<Arc<StubUpstream>>, headers: HeaderMap) -> Response {
    if !authorized(&stub, &headers) {
        return (StatusCode::UNAUTHORIZED, "invalid token").into_response();
    }
    Json(json!({"stocks": {"Apple Inc.": "AAPL", "Microsoft Corporation": "MSFT", "Nvidia Corporation": "NVDA"}}))
        .into_response()
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Start a stub upstream and a gateway pointed at it; returns the gateway URL.
async fn start(stub: Arc<StubUpstream>) -> String {
    let upstream = Router::new()
        .route("/auth", post(stub_auth))
        .route("/stocks", get(stub_listing))
        .route("/stocks/{ticker}", get(stub_stock))
        .with_state(stub);
    let upstream_url = serve(upstream).await;

    let credentials = ServiceCredentials {
        email: "dev@example.com".to_string(),
        name: "dev".to_string(),
        roll_no: "42".to_string(),
        access_code: "access".to_string(),
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
    };
    let http = build_http_client(Duration::from_secs(5)).unwrap();
    let auth = Arc::new(AuthClient::new(http.clone(), &upstream_url, credentials));
    let pricing = Arc::new(PricingClient::new(http, &upstream_url));
    let tokens = Arc::new(TokenCache::new(auth, Duration::from_secs(300)));

    let state = AppState {
        aggregation_service: Arc::new(AggregationService::new(tokens, pricing)),
        metrics: PrometheusBuilder::new().build_recorder().handle(),
        upstream_base_url: upstream_url,
    };
    serve(create_router(state, "*")).await
}

async fn get_json(url: &str) -> (u16, Value) {
    let response = reqwest::get(url).await.unwrap();
    let status = response.status().as_u16();
    let body = response.json::<Value>().await.unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_average_price() {
    let gateway = start(Arc::new(StubUpstream::default())).await;

    let (status, body) = get_json(&format!(
        "{}/stocks/aapl?minutes=60&aggregation=average",
        gateway
    ))
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["averageStockPrice"], 200.0);
    assert_eq!(body["priceHistory"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_single_tick_envelope_is_normalized() {
    let gateway = start(Arc::new(StubUpstream::default())).await;

    let (status, body) = get_json(&format!(
        "{}/stocks/NVDA?minutes=60&aggregation=average",
        gateway
    ))
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["averageStockPrice"], 875.5);
    let history = body["priceHistory"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["price"], 875.5);
}

#[tokio::test]
async fn test_correlation_and_token_reuse() {
    let stub = Arc::new(StubUpstream::default());
    let gateway = start(stub.clone()).await;

    let (status, body) = get_json(&format!(
        "{}/stockcorrelation?minutes=60&ticker=AAPL&ticker=MSFT",
        gateway
    ))
    .await;

    assert_eq!(status, 200);
    // Common buckets 10:00 and 10:01: (100, 400) and (200, 410)
    assert_eq!(body["correlation"], 1.0);
    assert_eq!(body["stocks"]["AAPL"]["averagePrice"], 200.0);
    assert_eq!(body["stocks"]["MSFT"]["priceHistory"].as_array().unwrap().len(), 3);
    assert!(body["stocks"]["MSFT"]["stdDev"].as_f64().unwrap() > 0.0);

    let (status, _) = get_json(&format!(
        "{}/stocks/MSFT?minutes=30&aggregation=average",
        gateway
    ))
    .await;
    assert_eq!(status, 200);

    // Three price fetches, one login
    assert_eq!(stub.stock_calls.load(Ordering::SeqCst), 3);
    assert_eq!(stub.auth_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_rejected_token_is_refreshed() {
    let stub = Arc::new(StubUpstream {
        reject_first_token: true,
        ..Default::default()
    });
    let gateway = start(stub.clone()).await;

    let (status, body) = get_json(&format!(
        "{}/stocks/AAPL?minutes=60&aggregation=average",
        gateway
    ))
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["averageStockPrice"], 200.0);
    assert_eq!(stub.auth_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unknown_ticker_is_server_error() {
    let gateway = start(Arc::new(StubUpstream::default())).await;

    let (status, body) = get_json(&format!(
        "{}/stockcorrelation?minutes=60&ticker=AAPL&ticker=ZZZZ",
        gateway
    ))
    .await;

    assert_eq!(status, 500);
    assert_eq!(body["error"], "Failed to fetch prices for ZZZZ");
}

#[tokio::test]
async fn test_auth_failure_keeps_serving() {
    let gateway = start(Arc::new(StubUpstream {
        fail_auth: true,
        ..Default::default()
    }))
    .await;

    let (status, body) = get_json(&format!(
        "{}/stocks/AAPL?minutes=60&aggregation=average",
        gateway
    ))
    .await;
    assert_eq!(status, 500);
    assert!(body["error"].is_string());

    let (status, body) = get_json(&format!("{}/health", gateway)).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert!(body["upstream"].as_str().unwrap().starts_with("http://127.0.0.1:"));
}

#[tokio::test]
async fn test_validation_never_reaches_upstream() {
    let stub = Arc::new(StubUpstream::default());
    let gateway = start(stub.clone()).await;

    let (status, body) = get_json(&format!("{}/stockcorrelation?ticker=AAPL&minutes=60", gateway)).await;
    assert_eq!(status, 400);
    assert_eq!(body, json!({"error": "Exactly two tickers are required"}));

    assert_eq!(stub.auth_calls.load(Ordering::SeqCst), 0);
    assert_eq!(stub.stock_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_ticker_listing() {
    let gateway = start(Arc::new(StubUpstream::default())).await;

    let (status, body) = get_json(&format!("{}/stocks", gateway)).await;
    assert_eq!(status, 200);
    assert_eq!(body["stocks"]["Apple Inc."], "AAPL");
    assert_eq!(body["stocks"].as_object().unwrap().len(), 3);
}

#[tokio::test]
async fn test_ticker_cannot_redirect_upstream_request() {
    let stub = Arc::new(StubUpstream::default());
    let gateway = start(stub.clone()).await;

    for path in [
        "/stocks/ZZZ%2F..%2FAAPL?minutes=60&aggregation=average",
        "/stocks/AAPL%3Fx%3D?minutes=60&aggregation=average",
    ] {
        let (status, body) = get_json(&format!("{}{}", gateway, path)).await;
        assert_eq!(status, 400, "{}", path);
        assert_eq!(body["error"], "Invalid ticker symbol");
    }
    assert_eq!(stub.stock_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_large_window_is_clamped_not_rejected() {
    let gateway = start(Arc::new(StubUpstream::default())).await;

    let (status, body) = get_json(&format!(
        "{}/stocks/AAPL?minutes=20000&aggregation=average",
        gateway
    ))
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["averageStockPrice"], 200.0);
}
