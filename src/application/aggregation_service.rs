//! Price aggregation service.
//!
//! Answers "average price" and "correlation" requests by fetching tick
//! histories from the pricing source, aligning them where needed, and running
//! the statistics over the result. Credentials come from an injected
//! [`TokenCache`]; a rejected credential is refreshed and the call retried once.

use crate::application::aligner::align;
use crate::application::stats::{average, correlation, round_to, std_dev};
use crate::application::token_cache::TokenCache;
use crate::domain::{AccessToken, AggregationError, FetchError, PriceFetcher, PriceSeries};
use crate::infrastructure::PricingClient;
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;

/// Decimal places the correlation coefficient is exposed with.
const CORRELATION_PLACES: u32 = 4;

/// Response for the average price endpoint
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AverageResult {
    /// Mean over every tick in the window
    pub average_stock_price: f64,
    /// Ticks as returned by the pricing source
    pub price_history: PriceSeries,
}

/// Descriptive statistics for one ticker, over its full (unaligned) series
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TickerStats {
    pub average_price: f64,
    /// Sample standard deviation
    pub std_dev: f64,
    pub price_history: PriceSeries,
}

impl TickerStats {
    fn from_series(series: PriceSeries) -> Self {
        let prices = series.prices();
        let average_price = average(&prices);
        Self {
            std_dev: std_dev(&prices, average_price),
            average_price,
            price_history: series,
        }
    }
}

/// Response for the correlation endpoint
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CorrelationResult {
    /// Pearson coefficient over the shared minute buckets, 4 decimal places
    pub correlation: f64,
    /// Per-ticker statistics keyed by the ticker as requested
    pub stocks: BTreeMap<String, TickerStats>,
}

/// Response for the ticker listing endpoint
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TickerListResult {
    /// Company name to ticker symbol
    pub stocks: BTreeMap<String, String>,
}

pub struct AggregationService {
    tokens: Arc<TokenCache>,
    fetcher: Arc<dyn PriceFetcher>,
}

impl AggregationService {
    pub fn new(tokens: Arc<TokenCache>, fetcher: Arc<dyn PriceFetcher>) -> Self {
        Self { tokens, fetcher }
    }

    /// Run `call` with a cached credential, refreshing and retrying once if
    /// the pricing source rejects it.
    async fn with_token<T, F, Fut>(&self, call: F) -> Result<T, AggregationError>
    where
        F: Fn(AccessToken) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let token = self.tokens.get().await?;
        match call(token.clone()).await {
            Err(FetchError::Unauthorized { ticker }) => {
                warn!(ticker = %ticker, "Credential rejected, refreshing and retrying once");
                self.tokens.invalidate(&token).await;
                let token = self.tokens.get().await?;
                Ok(call(token).await?)
            }
            result => Ok(result?),
        }
    }

    async fn fetch_series(&self, ticker: &str, minutes: u32) -> Result<PriceSeries, AggregationError> {
        let fetcher = &self.fetcher;
        self.with_token(move |token| async move { fetcher.fetch(ticker, minutes, &token).await })
            .await
    }

    /// Average price of `ticker` over the last `minutes` minutes.
    ///
    /// An empty window averages to `0.0`.
    pub async fn get_average(&self, ticker: &str, minutes: u32) -> Result<AverageResult, AggregationError> {
        let ticker = PricingClient::normalize_ticker(ticker);
        let series = self.fetch_series(&ticker, minutes).await?;
        let average_stock_price = average(&series.prices());

        info!(ticker = %ticker, minutes, ticks = series.len(), average = average_stock_price, "Computed average price");
        Ok(AverageResult {
            average_stock_price,
            price_history: series,
        })
    }

    /// Correlation between two tickers over the last `minutes` minutes.
    ///
    /// Both series are fetched concurrently and the request fails as soon as
    /// either fetch does. Per-ticker stats use each full series; the
    /// coefficient uses only the minute buckets both series share.
    pub async fn get_correlation(
        &self,
        ticker_a: &str,
        ticker_b: &str,
        minutes: u32,
    ) -> Result<CorrelationResult, AggregationError> {
        let symbol_a = PricingClient::normalize_ticker(ticker_a);
        let symbol_b = PricingClient::normalize_ticker(ticker_b);

        let (series_a, series_b) = futures::future::try_join(
            self.fetch_series(&symbol_a, minutes),
            self.fetch_series(&symbol_b, minutes),
        )
        .await?;

        let aligned = align(&series_a, &series_b);
        let coefficient = round_to(correlation(&aligned.x, &aligned.y), CORRELATION_PLACES);
        info!(
            a = %ticker_a,
            b = %ticker_b,
            minutes,
            common_buckets = aligned.len(),
            correlation = coefficient,
            "Computed correlation"
        );

        // Keyed by the tickers as requested; only the upstream calls see the normalized form
        let mut stocks = BTreeMap::new();
        stocks.insert(ticker_a.to_string(), TickerStats::from_series(series_a));
        stocks.insert(ticker_b.to_string(), TickerStats::from_series(series_b));

        Ok(CorrelationResult {
            correlation: coefficient,
            stocks,
        })
    }

    /// Tickers offered by the pricing source.
    pub async fn list_tickers(&self) -> Result<TickerListResult, AggregationError> {
        let fetcher = &self.fetcher;
        let stocks = self
            .with_token(move |token| async move { fetcher.list_tickers(&token).await })
            .await?;
        Ok(TickerListResult { stocks })
    }
}
