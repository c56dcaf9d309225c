//! HTTP handlers for the stock statistics endpoints.
//!
//! Query validation happens here; the aggregation service only ever sees a
//! well-formed ticker and window.

use crate::api::error::{
    ApiError, ErrorResponse, INVALID_AGGREGATION, INVALID_MINUTES, INVALID_TICKER,
    TWO_TICKERS_REQUIRED,
};
use crate::api::state::AppState;
use crate::application::{AverageResult, CorrelationResult, TickerListResult};
use axum::{
    extract::{Path, RawQuery, State},
    Json,
};
use std::collections::HashMap;
use tracing::instrument;
use utoipa::IntoParams;
use validator::Validate;

#[allow(unused_imports)]
use serde_json::json; // Used in utoipa::path examples

/// Only aggregation mode the average endpoint supports
const AVERAGE_AGGREGATION: &str = "average";

/// Longest lookback forwarded upstream; larger windows are clamped to it
pub const MAX_WINDOW_MINUTES: u32 = 10_080;

// ============================================================================
// Query Parameters
// ============================================================================

/// Query string decoded into every value of each key, in order of appearance.
#[derive(Debug, Default)]
struct QueryParams(HashMap<String, Vec<String>>);

impl QueryParams {
    fn parse(raw: Option<&str>) -> Self {
        let mut params: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
            params
                .entry(key.into_owned())
                .or_default()
                .push(value.into_owned());
        }
        Self(params)
    }

    /// Value of `key` when it appears exactly once; a repeated key is unusable.
    fn single(&self, key: &str) -> Option<String> {
        match self.0.get(key).map(Vec::as_slice) {
            Some([value]) => Some(value.clone()),
            _ => None,
        }
    }

    fn all(&self, key: &str) -> Vec<String> {
        self.0.get(key).cloned().unwrap_or_default()
    }
}

/// Query parameters for the average price endpoint
#[derive(Debug, Clone, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AverageQuery {
    /// Lookback window in minutes; any number, clamped to 1-10080
    #[param(example = "60")]
    pub minutes: Option<String>,
    /// Aggregation mode; must be "average"
    #[param(example = "average")]
    pub aggregation: Option<String>,
}

impl AverageQuery {
    /// Decode from the raw query string. Repeated keys count as absent.
    pub fn from_raw(raw: Option<&str>) -> Self {
        let params = QueryParams::parse(raw);
        Self {
            minutes: params.single("minutes"),
            aggregation: params.single("aggregation"),
        }
    }
}

/// Query parameters for the correlation endpoint
#[derive(Debug, Clone, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CorrelationQuery {
    /// Lookback window in minutes; any number, clamped to 1-10080
    #[param(example = "60")]
    pub minutes: Option<String>,
    /// Ticker symbol; pass exactly twice
    #[param(example = json!(["AAPL", "MSFT"]))]
    pub ticker: Vec<String>,
}

impl CorrelationQuery {
    /// Decode from the raw query string, keeping every `ticker` value.
    pub fn from_raw(raw: Option<&str>) -> Self {
        let params = QueryParams::parse(raw);
        Self {
            minutes: params.single("minutes"),
            ticker: params.all("ticker"),
        }
    }
}

/// Lookback window forwarded to the pricing source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub minutes: u32,
}

impl Window {
    /// Parse a raw `minutes` value.
    ///
    /// Any number is accepted. Fractions round up and the result is clamped
    /// to `1..=MAX_WINDOW_MINUTES`; only a missing or non-numeric value fails.
    pub fn parse(raw: Option<&str>) -> Result<Self, ApiError> {
        let value = raw
            .map(str::trim)
            .and_then(|m| m.parse::<f64>().ok())
            .filter(|m| !m.is_nan())
            .ok_or_else(|| ApiError::Validation(INVALID_MINUTES.to_string()))?;

        let minutes = value.ceil().clamp(1.0, f64::from(MAX_WINDOW_MINUTES)) as u32;
        Ok(Self { minutes })
    }
}

/// Ticker symbol as given by the caller, checked before it goes upstream
#[derive(Debug, Clone, Validate)]
pub struct TickerSymbol {
    #[validate(length(min = 1, max = 16))]
    pub symbol: String,
}

impl TickerSymbol {
    /// Accept ASCII letters, digits, `.` and `-`, starting with a letter or digit.
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        let invalid = || ApiError::Validation(INVALID_TICKER.to_string());
        let ticker = Self {
            symbol: raw.trim().to_string(),
        };
        ticker.validate().map_err(|_| invalid())?;

        let mut chars = ticker.symbol.chars();
        let leading_ok = chars.next().is_some_and(|c| c.is_ascii_alphanumeric());
        if !leading_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-') {
            return Err(invalid());
        }
        Ok(ticker)
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Get the average price of a stock over a lookback window
#[utoipa::path(
    get,
    path = "/stocks/{ticker}",
    params(
        ("ticker" = String, Path, description = "Ticker symbol: letters, digits, `.` and `-`", example = "AAPL"),
        AverageQuery
    ),
    responses(
        (status = 200, description = "Average price and raw history", body = AverageResult,
            example = json!({
                "averageStockPrice": 200.0,
                "priceHistory": [
                    {"price": 100.0, "lastUpdatedAt": "2025-05-08T04:26:27Z"},
                    {"price": 300.0, "lastUpdatedAt": "2025-05-08T04:27:12Z"}
                ]
            })
        ),
        (status = 400, description = "Invalid minutes, aggregation or ticker", body = ErrorResponse,
            example = json!({"error": "Invalid minutes parameter"})
        ),
        (status = 500, description = "Pricing source failure", body = ErrorResponse)
    ),
    tag = "stocks"
)]
#[instrument(skip(state))]
pub async fn average_price_handler(
    Path(ticker): Path<String>,
    RawQuery(raw): RawQuery,
    State(state): State<AppState>,
) -> Result<Json<AverageResult>, ApiError> {
    metrics::counter!("api_requests_total", "endpoint" => "average").increment(1);

    let query = AverageQuery::from_raw(raw.as_deref());
    if query.aggregation.as_deref() != Some(AVERAGE_AGGREGATION) {
        return Err(ApiError::Validation(INVALID_AGGREGATION.to_string()));
    }
    let window = Window::parse(query.minutes.as_deref())?;
    let ticker = TickerSymbol::parse(&ticker)?;

    let result = state
        .aggregation_service
        .get_average(&ticker.symbol, window.minutes)
        .await?;
    Ok(Json(result))
}

/// Get the correlation between two stocks over a lookback window
#[utoipa::path(
    get,
    path = "/stockcorrelation",
    params(CorrelationQuery),
    responses(
        (status = 200, description = "Correlation and per-ticker statistics", body = CorrelationResult,
            example = json!({
                "correlation": 0.8123,
                "stocks": {
                    "AAPL": {"averagePrice": 204.1, "stdDev": 1.7, "priceHistory": []},
                    "MSFT": {"averagePrice": 431.9, "stdDev": 2.2, "priceHistory": []}
                }
            })
        ),
        (status = 400, description = "Invalid minutes or wrong number of tickers", body = ErrorResponse,
            example = json!({"error": "Exactly two tickers are required"})
        ),
        (status = 500, description = "Pricing source failure", body = ErrorResponse)
    ),
    description = "Per-ticker average and standard deviation use each full series; the correlation coefficient uses only the minute buckets both series share.",
    tag = "stocks"
)]
#[instrument(skip(state))]
pub async fn correlation_handler(
    RawQuery(raw): RawQuery,
    State(state): State<AppState>,
) -> Result<Json<CorrelationResult>, ApiError> {
    metrics::counter!("api_requests_total", "endpoint" => "correlation").increment(1);

    let query = CorrelationQuery::from_raw(raw.as_deref());
    let window = Window::parse(query.minutes.as_deref())?;

    let [ticker_a, ticker_b] = <[String; 2]>::try_from(query.ticker)
        .map_err(|_| ApiError::Validation(TWO_TICKERS_REQUIRED.to_string()))?;
    if ticker_a.trim().is_empty() || ticker_b.trim().is_empty() {
        return Err(ApiError::Validation(TWO_TICKERS_REQUIRED.to_string()));
    }
    let ticker_a = TickerSymbol::parse(&ticker_a)?;
    let ticker_b = TickerSymbol::parse(&ticker_b)?;

    let result = state
        .aggregation_service
        .get_correlation(&ticker_a.symbol, &ticker_b.symbol, window.minutes)
        .await?;
    Ok(Json(result))
}

/// List the tickers offered by the pricing source
#[utoipa::path(
    get,
    path = "/stocks",
    responses(
        (status = 200, description = "Company name to ticker symbol", body = TickerListResult,
            example = json!({"stocks": {"Apple Inc.": "AAPL", "Microsoft Corporation": "MSFT"}})
        ),
        (status = 500, description = "Pricing source failure", body = ErrorResponse)
    ),
    tag = "stocks"
)]
#[instrument(skip(state))]
pub async fn list_stocks_handler(
    State(state): State<AppState>,
) -> Result<Json<TickerListResult>, ApiError> {
    metrics::counter!("api_requests_total", "endpoint" => "list").increment(1);
    Ok(Json(state.aggregation_service.list_tickers().await?))
}
