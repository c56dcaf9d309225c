use crate::domain::AggregationError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

pub const INVALID_MINUTES: &str = "Invalid minutes parameter";
pub const INVALID_AGGREGATION: &str = "Invalid aggregation type";
pub const TWO_TICKERS_REQUIRED: &str = "Exactly two tickers are required";
pub const INVALID_TICKER: &str = "Invalid ticker symbol";
const AUTH_FAILED: &str = "Failed to authenticate with pricing source";

/// Error body returned by every endpoint
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Unified error type for API responses.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request parameters; never reaches the aggregation service
    Validation(String),
    Aggregation(AggregationError),
}

impl From<AggregationError> for ApiError {
    fn from(e: AggregationError) -> Self {
        Self::Aggregation(e)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "validation_error: {msg}"),
            Self::Aggregation(e) => write!(f, "aggregation_error: {e}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            // Upstream auth details stay in the logs
            Self::Aggregation(AggregationError::Auth(e)) => {
                tracing::error!("Credential acquisition failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, AUTH_FAILED.to_string())
            }
            Self::Aggregation(AggregationError::Fetch(e)) => {
                tracing::error!("Price fetch failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to fetch prices for {}", e.ticker()),
                )
            }
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}
