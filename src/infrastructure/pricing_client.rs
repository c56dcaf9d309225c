//! HTTP client for the pricing source's stock endpoints.
//!
//! Handles ticker normalization (uppercase), bearer authentication, and
//! folding the two possible `/stocks/{ticker}` body shapes into a canonical
//! [`PriceSeries`].

use crate::domain::{
    AccessToken, FetchError, PriceFetcher, PriceResponse, PriceSeries, TickerListing,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Error subject used when the listing endpoint fails.
const LISTING_SUBJECT: &str = "ALL";

/// Build the shared reqwest client with a per-request timeout.
///
/// Every outbound call (auth and prices) goes through this client, so the
/// timeout bounds each network call individually.
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent("StockStatsGateway/1.0")
        .build()
        .context("Failed to create HTTP client")
}

/// Price history client for `GET {base_url}/stocks/...`.
#[derive(Clone)]
pub struct PricingClient {
    client: Client,
    base_url: String,
}

impl PricingClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Normalize ticker to uppercase for API compatibility.
    pub fn normalize_ticker(ticker: &str) -> String {
        ticker.trim().to_uppercase()
    }

    /// `{base_url}/stocks[/{ticker}]` with the ticker as one escaped path segment.
    ///
    /// `/`, `?`, `#` and `%` in a ticker are percent-encoded, so the request
    /// always targets that ticker's resource.
    fn endpoint(&self, ticker: Option<&str>, subject: &str) -> Result<Url, FetchError> {
        let invalid = |message: String| FetchError::Upstream {
            ticker: subject.to_string(),
            message,
        };
        if matches!(ticker, Some("" | "." | "..")) {
            return Err(invalid(format!("invalid ticker {:?}", subject)));
        }

        let mut url = Url::parse(&self.base_url)
            .map_err(|e| invalid(format!("invalid base URL {}: {}", self.base_url, e)))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| invalid(format!("base URL {} cannot take a path", self.base_url)))?;
            segments.pop_if_empty().push("stocks");
            if let Some(ticker) = ticker {
                segments.push(ticker);
            }
        }
        Ok(url)
    }

    /// GET `url` with the bearer credential and decode the body as `T`.
    ///
    /// `subject` is the ticker every resulting error is tagged with.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
        token: &AccessToken,
        subject: &str,
    ) -> Result<T, FetchError> {
        debug!("Fetching from pricing source: {}", url);

        let response = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(token.secret())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                metrics::counter!("upstream_requests_total", "call" => "stocks", "outcome" => "error")
                    .increment(1);
                FetchError::Upstream {
                    ticker: subject.to_string(),
                    message: e.to_string(),
                }
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!("Pricing source rejected credential for {} ({})", subject, status);
            metrics::counter!("upstream_requests_total", "call" => "stocks", "outcome" => "unauthorized")
                .increment(1);
            return Err(FetchError::Unauthorized {
                ticker: subject.to_string(),
            });
        }
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            metrics::counter!("upstream_requests_total", "call" => "stocks", "outcome" => "error")
                .increment(1);
            return Err(FetchError::Upstream {
                ticker: subject.to_string(),
                message: format!("status {}: {}", status, error_body),
            });
        }

        metrics::counter!("upstream_requests_total", "call" => "stocks", "outcome" => "ok")
            .increment(1);

        response.json::<T>().await.map_err(|e| FetchError::Decode {
            ticker: subject.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl PriceFetcher for PricingClient {
    async fn fetch(
        &self,
        ticker: &str,
        window_minutes: u32,
        token: &AccessToken,
    ) -> Result<PriceSeries, FetchError> {
        let ticker = Self::normalize_ticker(ticker);
        let url = self.endpoint(Some(&ticker), &ticker)?;
        let query = [("minutes", window_minutes.to_string())];

        let response: PriceResponse = self.get_json(url, &query, token, &ticker).await?;
        let series = PriceSeries::from(response);

        info!(ticker = %ticker, minutes = window_minutes, ticks = series.len(), "Fetched price history");
        Ok(series)
    }

    async fn list_tickers(
        &self,
        token: &AccessToken,
    ) -> Result<BTreeMap<String, String>, FetchError> {
        let url = self.endpoint(None, LISTING_SUBJECT)?;
        let listing: TickerListing = self.get_json(url, &[], token, LISTING_SUBJECT).await?;
        info!("Fetched {} tickers from pricing source", listing.stocks.len());
        Ok(listing.stocks)
    }
}
