//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. The
//! backend base URL may be overridden by an environment variable named in
//! the config; it is resolved once, when the poller registry is built.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::poller::POLL_INTERVAL;
use crate::registry::DEFAULT_IDLE_TTL;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Where the backend runs, selecting which configured URL is used.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Local,
    Deployed,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub environment: Environment,
    #[serde(default)]
    pub local_url: String,
    #[serde(default)]
    pub deployed_url: String,
    /// Environment variable that, when set and non-empty, overrides both URLs.
    #[serde(default)]
    pub base_url_env: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollerConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Upper bound on concurrently polled bankroll ids.
    #[serde(default = "default_max_pollers")]
    pub max_pollers: usize,
    /// Pollers not requested for this long are stopped.
    #[serde(default = "default_idle_ttl_secs")]
    pub idle_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_interval_ms() -> u64 {
    POLL_INTERVAL.as_millis() as u64
}

fn default_max_pollers() -> usize {
    64
}

fn default_idle_ttl_secs() -> u64 {
    DEFAULT_IDLE_TTL.as_secs()
}

fn default_true() -> bool {
    true
}

fn default_port() -> u16 {
    8080
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_pollers: default_max_pollers(),
            idle_ttl_secs: default_idle_ttl_secs(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_port(),
        }
    }
}

impl BackendConfig {
    /// Resolve the backend base URL: env override first, then the URL for
    /// the configured environment. Empty means no endpoint.
    pub fn resolve_base_url(&self) -> String {
        let from_env = self
            .base_url_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok());
        self.select_base_url(from_env)
    }

    fn select_base_url(&self, from_env: Option<String>) -> String {
        let url = match from_env.filter(|v| !v.trim().is_empty()) {
            Some(v) => v,
            None => match self.environment {
                Environment::Local => self.local_url.clone(),
                Environment::Deployed => self.deployed_url.clone(),
            },
        };
        url.trim().trim_end_matches('/').to_string()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        if config.poller.interval_ms == 0 {
            anyhow::bail!("poller.interval_ms must be greater than zero");
        }
        if config.poller.idle_ttl_secs == 0 {
            anyhow::bail!("poller.idle_ttl_secs must be greater than zero");
        }
        Ok(config)
    }
}
