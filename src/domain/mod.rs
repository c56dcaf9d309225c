//! Domain layer - Core entities and upstream collaborator traits.
//!
//! This module defines the domain model for the stock statistics gateway,
//! following clean architecture principles. It contains:
//! - Price entities (`Tick`, `PriceSeries`) and the upstream response shape
//! - The bearer credential handed out by the pricing source
//! - Traits describing the pricing source (`TokenProvider`, `PriceFetcher`)
//! - The error taxonomy shared by the application and API layers

pub mod error;
pub use error::{AggregationError, AuthError, FetchError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use utoipa::ToSchema;

/// A single timestamped price observation.
///
/// Serialized the same way the pricing source emits it, so a `priceHistory`
/// returned to the dashboard is byte-compatible with upstream data.
///
/// # Examples
///
/// ```
/// use stockstats_gateway::domain::Tick;
///
/// let tick: Tick = serde_json::from_str(
///     r#"{"price": 231.95, "lastUpdatedAt": "2025-05-08T04:26:27.465Z"}"#,
/// ).unwrap();
/// assert_eq!(tick.price, 231.95);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Tick {
    /// Observed price
    pub price: f64,
    /// Observation time (ISO-8601, UTC)
    #[serde(rename = "lastUpdatedAt")]
    pub timestamp: DateTime<Utc>,
}

impl Tick {
    pub fn new(price: f64, timestamp: DateTime<Utc>) -> Self {
        Self { price, timestamp }
    }
}

/// Ticks for one ticker, in the order the pricing source returned them.
///
/// No sorting is applied; consumers that need chronological order (the
/// aligner) derive it themselves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct PriceSeries(pub Vec<Tick>);

impl PriceSeries {
    pub fn new(ticks: Vec<Tick>) -> Self {
        Self(ticks)
    }

    pub fn ticks(&self) -> &[Tick] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Prices in upstream order.
    pub fn prices(&self) -> Vec<f64> {
        self.0.iter().map(|tick| tick.price).collect()
    }
}

impl From<Vec<Tick>> for PriceSeries {
    fn from(ticks: Vec<Tick>) -> Self {
        Self(ticks)
    }
}

/// Raw body of `GET /stocks/{ticker}?minutes=N`.
///
/// The pricing source answers with either a list of ticks (when `minutes` is
/// honoured) or a single tick wrapped in a `stock` envelope. The shape is
/// resolved here, once, and converted straight into [`PriceSeries`].
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PriceResponse {
    Series(Vec<Tick>),
    Single { stock: Tick },
}

impl From<PriceResponse> for PriceSeries {
    fn from(response: PriceResponse) -> Self {
        match response {
            PriceResponse::Series(ticks) => PriceSeries(ticks),
            PriceResponse::Single { stock } => PriceSeries(vec![stock]),
        }
    }
}

/// Raw body of `GET /stocks`: company name to ticker symbol.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerListing {
    pub stocks: BTreeMap<String, String>,
}

/// Bearer credential issued by the pricing source's auth endpoint.
///
/// The secret never shows up in `Debug` output so it cannot leak through
/// tracing fields.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    value: String,
    lifetime: Option<Duration>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            lifetime: None,
        }
    }

    /// Attach the lifetime reported by the auth endpoint.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    pub fn secret(&self) -> &str {
        &self.value
    }

    pub fn lifetime(&self) -> Option<Duration> {
        self.lifetime
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

/// Source of bearer credentials for the pricing source.
///
/// Implementations perform one upstream call per invocation; caching lives in
/// `application::TokenCache`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Acquire a fresh bearer credential.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] on network failure, a non-2xx answer, or a body
    /// without an `access_token`.
    async fn get_token(&self) -> Result<AccessToken, AuthError>;
}

/// Read access to tick histories on the pricing source.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceFetcher: Send + Sync {
    /// Fetch the ticks for `ticker` over the last `window_minutes` minutes.
    ///
    /// The upstream shape ambiguity is resolved before returning; callers
    /// always get a canonical [`PriceSeries`].
    ///
    /// # Errors
    ///
    /// - [`FetchError::Unauthorized`] if the credential was rejected
    /// - [`FetchError::Upstream`] on network failure or any other non-2xx status
    /// - [`FetchError::Decode`] if the body matches neither known shape
    async fn fetch(
        &self,
        ticker: &str,
        window_minutes: u32,
        token: &AccessToken,
    ) -> Result<PriceSeries, FetchError>;

    /// List the tickers offered by the pricing source, keyed by company name.
    async fn list_tickers(&self, token: &AccessToken)
        -> Result<BTreeMap<String, String>, FetchError>;
}
