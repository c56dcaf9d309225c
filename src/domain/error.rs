//! Error taxonomy for talking to the pricing source.
//!
//! Statistics never fail, so the only errors the core produces come from the
//! two upstream calls: acquiring a credential and fetching ticks.

use thiserror::Error;

/// Failure to acquire a bearer credential.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("auth request failed: {0}")]
    Transport(String),

    #[error("auth endpoint returned {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("auth response malformed: {0}")]
    Malformed(String),
}

/// Failure to fetch data for a specific ticker.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to fetch prices for {ticker}: {message}")]
    Upstream { ticker: String, message: String },

    #[error("pricing source rejected the credential for {ticker}")]
    Unauthorized { ticker: String },

    #[error("unexpected price payload for {ticker}: {message}")]
    Decode { ticker: String, message: String },
}

impl FetchError {
    /// Ticker the failed request was scoped to.
    pub fn ticker(&self) -> &str {
        match self {
            Self::Upstream { ticker, .. }
            | Self::Unauthorized { ticker }
            | Self::Decode { ticker, .. } => ticker,
        }
    }
}

/// Anything that can stop an aggregation request.
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}
