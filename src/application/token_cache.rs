//! Shared bearer-token cache with single-flight refresh.
//!
//! Reads take a shared lock on the cached token. A miss or an expired token
//! goes through a refresh gate so concurrent callers collapse into a single
//! upstream auth call.

use crate::domain::{AccessToken, AuthError, TokenProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info};

/// Tokens are considered expired this long before their reported expiry.
pub const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(5);

#[derive(Clone)]
struct CachedToken {
    token: AccessToken,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Process-wide credential cache, injected into the aggregation service.
pub struct TokenCache {
    provider: Arc<dyn TokenProvider>,
    default_ttl: Duration,
    slot: RwLock<Option<CachedToken>>,
    refresh_gate: Mutex<()>,
}

impl TokenCache {
    /// `default_ttl` applies when the provider does not report a lifetime.
    pub fn new(provider: Arc<dyn TokenProvider>, default_ttl: Duration) -> Self {
        Self {
            provider,
            default_ttl,
            slot: RwLock::new(None),
            refresh_gate: Mutex::new(()),
        }
    }

    async fn cached(&self) -> Option<AccessToken> {
        let slot = self.slot.read().await;
        slot.as_ref()
            .filter(|c| c.is_fresh(Instant::now()))
            .map(|c| c.token.clone())
    }

    /// Return a valid token, acquiring one from the provider if needed.
    pub async fn get(&self) -> Result<AccessToken, AuthError> {
        if let Some(token) = self.cached().await {
            return Ok(token);
        }

        let _gate = self.refresh_gate.lock().await;

        // Another task may have refreshed while we waited on the gate
        if let Some(token) = self.cached().await {
            debug!("Token refreshed by a concurrent request");
            return Ok(token);
        }

        let token = self.provider.get_token().await?;
        let lifetime = token.lifetime().unwrap_or(self.default_ttl);
        let expires_at = Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN);

        *self.slot.write().await = Some(CachedToken {
            token: token.clone(),
            expires_at,
        });
        metrics::counter!("token_refresh_total").increment(1);
        info!(lifetime = ?lifetime, "Cached new access token");

        Ok(token)
    }

    /// Drop `rejected` from the cache.
    ///
    /// No-op if the cache already holds a different token, so a late
    /// rejection cannot evict a token another request just refreshed.
    pub async fn invalidate(&self, rejected: &AccessToken) {
        let mut slot = self.slot.write().await;
        if slot.as_ref().is_some_and(|c| &c.token == rejected) {
            info!("Invalidating rejected access token");
            *slot = None;
        }
    }
}
