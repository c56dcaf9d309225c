//! Credential client for the pricing source's `/auth` endpoint.
//!
//! Exchanges the configured service credentials for a bearer token. One call
//! per invocation, no retry; caching is the job of `application::TokenCache`.

use crate::config::ServiceCredentials;
use crate::domain::{AccessToken, AuthError, TokenProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// `expires_in` values at or above this are absolute Unix timestamps.
const ABSOLUTE_EXPIRY_THRESHOLD: u64 = 1_000_000_000;

#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Token provider backed by `POST {base_url}/auth`.
#[derive(Clone)]
pub struct AuthClient {
    client: Client,
    base_url: String,
    credentials: ServiceCredentials,
}

impl AuthClient {
    /// Build a client sharing an existing reqwest connection pool.
    pub fn new(client: Client, base_url: &str, credentials: ServiceCredentials) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    /// Convert the upstream `expires_in` into a lifetime relative to `now_secs`.
    ///
    /// The pricing source reports an absolute expiry in Unix seconds; small
    /// values are taken as a relative number of seconds.
    pub fn token_lifetime(expires_in: u64, now_secs: u64) -> Duration {
        if expires_in >= ABSOLUTE_EXPIRY_THRESHOLD {
            Duration::from_secs(expires_in.saturating_sub(now_secs))
        } else {
            Duration::from_secs(expires_in)
        }
    }
}

#[async_trait]
impl TokenProvider for AuthClient {
    async fn get_token(&self) -> Result<AccessToken, AuthError> {
        let url = format!("{}/auth", self.base_url);
        debug!("Requesting access token from {}", url);

        let response = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .json(&self.credentials)
            .send()
            .await
            .map_err(|e| {
                metrics::counter!("upstream_requests_total", "call" => "auth", "outcome" => "error")
                    .increment(1);
                AuthError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!("Auth endpoint rejected credentials with status {}", status);
            metrics::counter!("upstream_requests_total", "call" => "auth", "outcome" => "rejected")
                .increment(1);
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: AuthResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Malformed(e.to_string()))?;

        let access_token = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::Malformed("missing access_token".to_string()))?;

        metrics::counter!("upstream_requests_total", "call" => "auth", "outcome" => "ok")
            .increment(1);

        let mut token = AccessToken::new(access_token);
        if let Some(expires_in) = body.expires_in {
            let now_secs = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();
            token = token.with_lifetime(Self::token_lifetime(expires_in, now_secs));
        }

        info!(lifetime = ?token.lifetime(), "Acquired access token");
        Ok(token)
    }
}
