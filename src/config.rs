//! Application configuration.
//!
//! Non-secret settings come from `config.yaml`; service credentials come only
//! from the environment (optionally seeded by a `.env` file).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level application configuration loaded from `config.yaml`.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct AppConfig {
    /// Server configuration (host, port, CORS origins)
    #[serde(default)]
    pub server: ServerConfig,
    /// Pricing source location and client tuning
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

/// Server configuration settings.
///
/// Defines how the HTTP server should bind and what CORS origins to allow.
#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on (default: 3001)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Comma-separated list of allowed CORS origins (default: "*")
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

/// Pricing source settings.
#[derive(Deserialize, Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL that `/auth` and `/stocks` hang off
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Timeout applied to every outbound call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Token lifetime when the auth endpoint does not report one
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            token_ttl_secs: default_token_ttl_secs(),
        }
    }
}

impl UpstreamConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3001
}
fn default_allowed_origins() -> String {
    "*".to_string()
}
fn default_base_url() -> String {
    "http://localhost:9000".to_string()
}
fn default_request_timeout_secs() -> u64 {
    10
}
fn default_token_ttl_secs() -> u64 {
    300
}

impl AppConfig {
    /// Read and parse a YAML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).with_context(|| {
            format!(
                "Failed to read {} - ensure file exists in working directory",
                path.display()
            )
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .context("Failed to parse config - check YAML syntax and structure")
    }

    /// Apply `PORT` and `UPSTREAM_BASE_URL` overrides.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT").and_then(|p| p.parse::<u16>().ok()) {
            self.server.port = port;
        }
        if let Some(base_url) = lookup("UPSTREAM_BASE_URL").filter(|u| !u.is_empty()) {
            self.upstream.base_url = base_url;
        }
    }
}

/// Credentials posted to the pricing source's `/auth` endpoint.
///
/// Serialized with the field names the auth endpoint expects. `Debug` hides
/// the access code and client secret.
#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCredentials {
    pub email: String,
    pub name: String,
    pub roll_no: String,
    pub access_code: String,
    #[serde(rename = "clientID")]
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for ServiceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceCredentials")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("roll_no", &self.roll_no)
            .field("access_code", &"<redacted>")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl ServiceCredentials {
    /// Read credentials from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through `lookup`, failing on the first missing variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .with_context(|| format!("{} not set - add it to the environment or .env", key))
        };

        Ok(Self {
            email: require("EMAIL")?,
            name: require("NAME")?,
            roll_no: require("ROLL_NO")?,
            access_code: require("ACCESS_CODE")?,
            client_id: require("CLIENT_ID")?,
            client_secret: require("CLIENT_SECRET")?,
        })
    }
}
