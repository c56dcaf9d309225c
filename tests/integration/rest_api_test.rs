//! Integration tests for REST API endpoints
//!
//! These tests verify that REST API endpoints work correctly end-to-end.
//! Run with: `cargo test --test rest_api_test -- --ignored`
//!
//! Note: These tests require a running gateway with working credentials for the
//! pricing source. Set TEST_BASE_URL to point to it, or use the default
//! http://localhost:3001

use serde_json::Value;
use std::time::Duration;

/// Helper function to get base URL from environment or use default
fn get_base_url() -> String {
    std::env::var("TEST_BASE_URL").unwrap_or_else(|_| "http://localhost:3001".to_string())
}

/// Helper function to make a GET request
async fn get_request(path: &str) -> Result<reqwest::Response, reqwest::Error> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;
    let url = format!("{}{}", get_base_url(), path);
    client.get(&url).send().await
}

#[tokio::test]
#[ignore] // Ignore by default - requires running server
async fn test_health_endpoint() {
    let response = get_request("/health").await.unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body.get("version").is_some());
}

#[tokio::test]
#[ignore]
async fn test_metrics_endpoint() {
    // Generate at least one counted request first
    let _ = get_request("/health").await.unwrap();

    let response = get_request("/metrics").await.unwrap();
    assert_eq!(response.status(), 200);

    let body = response.text().await.unwrap();
    assert!(body.contains("http_requests_total") || body.contains("# TYPE"));
}

#[tokio::test]
#[ignore]
async fn test_list_stocks_endpoint() {
    let response = get_request("/stocks").await.unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    let stocks = body["stocks"].as_object().unwrap();
    assert!(!stocks.is_empty());
}

#[tokio::test]
#[ignore]
async fn test_average_endpoint() {
    let response = get_request("/stocks/NVDA?minutes=50&aggregation=average")
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert!(body["averageStockPrice"].is_number());
    let history = body["priceHistory"].as_array().unwrap();
    for tick in history {
        assert!(tick["price"].is_number());
        assert!(tick["lastUpdatedAt"].is_string());
    }
}

#[tokio::test]
#[ignore]
async fn test_correlation_endpoint() {
    let response = get_request("/stockcorrelation?minutes=50&ticker=NVDA&ticker=PYPL")
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    let correlation = body["correlation"].as_f64().unwrap();
    assert!((-1.0..=1.0).contains(&correlation));
    assert!(body["stocks"]["NVDA"]["averagePrice"].is_number());
    assert!(body["stocks"]["PYPL"]["stdDev"].is_number());
}

#[tokio::test]
#[ignore]
async fn test_invalid_minutes() {
    let response = get_request("/stocks/NVDA?minutes=abc&aggregation=average")
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid minutes parameter");
}

#[tokio::test]
#[ignore]
async fn test_invalid_aggregation() {
    let response = get_request("/stocks/NVDA?minutes=50&aggregation=max")
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid aggregation type");
}

#[tokio::test]
#[ignore]
async fn test_correlation_single_ticker() {
    let response = get_request("/stockcorrelation?minutes=50&ticker=NVDA")
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Exactly two tickers are required");
}

#[tokio::test]
#[ignore]
async fn test_unknown_route() {
    let response = get_request("/v1/nonexistent").await.unwrap();
    assert_eq!(response.status(), 404);
}
