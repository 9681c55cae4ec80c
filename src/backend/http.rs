//! HTTP backend client.
//!
//! Endpoints (base URL injected at construction):
//! - `GET {base}/api/obs/bankroll/{id}`
//! - `GET {base}/api/obs/session/{id}/active`
//!
//! Both answer with an envelope `{ success, data }`. A response only
//! counts as a success when the status is 2xx, `success` is true and
//! `data` is present and decodable.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use super::{FetchError, OverlayBackend, Resource};
use crate::types::{BankrollSnapshot, SessionSnapshot, DEFAULT_CURRENCY};

/// Fallback session name when the backend sends none.
const DEFAULT_SESSION_NAME: &str = "Active Session";

// ---------------------------------------------------------------------------
// API response types (backend JSON → Rust)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BankrollPayload {
    name: String,
    #[serde(deserialize_with = "required_amount")]
    current_amount: Decimal,
    #[serde(deserialize_with = "required_amount")]
    starting_amount: Decimal,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionPayload {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    total_buyins: Decimal,
    #[serde(default, deserialize_with = "lenient_amount")]
    total_cashes: Decimal,
    #[serde(default, deserialize_with = "lenient_count")]
    cash_count: u32,
    #[serde(default, deserialize_with = "optional_amount")]
    profit: Option<Decimal>,
}

/// Numeric fields arrive as JSON numbers or, from some databases, as
/// decimal strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Number(serde_json::Number),
    Text(String),
}

impl RawNumber {
    fn to_decimal(&self) -> Option<Decimal> {
        let text = match self {
            RawNumber::Number(n) => n.to_string(),
            RawNumber::Text(s) => s.trim().to_string(),
        };
        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .ok()
    }
}

fn optional_amount<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Decimal>, D::Error> {
    match Option::<RawNumber>::deserialize(d)? {
        None => Ok(None),
        Some(raw) => raw
            .to_decimal()
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid amount: {raw:?}"))),
    }
}

fn required_amount<'de, D: Deserializer<'de>>(d: D) -> Result<Decimal, D::Error> {
    optional_amount(d)?.ok_or_else(|| D::Error::custom("amount is null"))
}

/// Missing or null amounts count as zero.
fn lenient_amount<'de, D: Deserializer<'de>>(d: D) -> Result<Decimal, D::Error> {
    Ok(optional_amount(d)?.unwrap_or(Decimal::ZERO))
}

fn lenient_count<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    match optional_amount(d)? {
        None => Ok(0),
        Some(v) if v.fract().is_zero() => v
            .to_u32()
            .ok_or_else(|| D::Error::custom(format!("count out of range: {v}"))),
        Some(v) => Err(D::Error::custom(format!("count is not an integer: {v}"))),
    }
}

// ---------------------------------------------------------------------------
// Payload decoding
// ---------------------------------------------------------------------------

/// Unwrap the `{ success, data }` envelope into a typed payload.
fn decode_envelope<T: DeserializeOwned>(resource: Resource, body: &str) -> Result<T, FetchError> {
    let envelope: Envelope = serde_json::from_str(body).map_err(|e| FetchError::Malformed {
        resource,
        reason: e.to_string(),
    })?;

    if !envelope.success {
        let reason = envelope
            .error
            .or(envelope.message)
            .unwrap_or_else(|| "success flag not set".to_string());
        return Err(FetchError::Rejected { resource, reason });
    }

    let data = match envelope.data {
        Some(serde_json::Value::Null) | None => {
            return Err(FetchError::Rejected {
                resource,
                reason: "response has no data".to_string(),
            })
        }
        Some(data) => data,
    };

    serde_json::from_value(data).map_err(|e| FetchError::Malformed {
        resource,
        reason: e.to_string(),
    })
}

fn parse_bankroll(body: &str) -> Result<BankrollSnapshot, FetchError> {
    let p: BankrollPayload = decode_envelope(Resource::Bankroll, body)?;
    let currency = p
        .currency
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

    let bankroll = BankrollSnapshot {
        name: p.name,
        current_amount: p.current_amount,
        starting_amount: p.starting_amount,
        currency,
    };
    if bankroll.checked_profit().is_none() {
        return Err(FetchError::Malformed {
            resource: Resource::Bankroll,
            reason: "bankroll profit overflows".to_string(),
        });
    }
    Ok(bankroll)
}

fn parse_session(body: &str) -> Result<SessionSnapshot, FetchError> {
    let p: SessionPayload = decode_envelope(Resource::Session, body)?;
    let name = p
        .name
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION_NAME.to_string());

    SessionSnapshot::try_new(name, p.total_buyins, p.total_cashes, p.cash_count, p.profit)
        .ok_or_else(|| FetchError::Malformed {
            resource: Resource::Session,
            reason: "session profit overflows".to_string(),
        })
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// reqwest-backed `OverlayBackend`.
pub struct HttpBackend {
    http: Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a client for `base_url` (trailing slashes are ignored).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("bankroll-overlay/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client for overlay backend")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn bankroll_url(&self, bankroll_id: &str) -> String {
        format!(
            "{}/api/obs/bankroll/{}",
            self.base_url,
            urlencoding::encode(bankroll_id)
        )
    }

    fn session_url(&self, bankroll_id: &str) -> String {
        format!(
            "{}/api/obs/session/{}/active",
            self.base_url,
            urlencoding::encode(bankroll_id)
        )
    }

    /// GET `url` and return the body of a 2xx response.
    async fn get_body(&self, resource: Resource, url: &str) -> Result<String, FetchError> {
        debug!(url = %url, resource = %resource, "Fetching overlay resource");

        let resp = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| FetchError::Transport { resource, source })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status { resource, status });
        }

        resp.text()
            .await
            .map_err(|source| FetchError::Transport { resource, source })
    }
}

#[async_trait]
impl OverlayBackend for HttpBackend {
    async fn fetch_bankroll(&self, bankroll_id: &str) -> Result<BankrollSnapshot, FetchError> {
        let body = self
            .get_body(Resource::Bankroll, &self.bankroll_url(bankroll_id))
            .await?;
        parse_bankroll(&body)
    }

    async fn fetch_active_session(
        &self,
        bankroll_id: &str,
    ) -> Result<SessionSnapshot, FetchError> {
        let body = self
            .get_body(Resource::Session, &self.session_url(bankroll_id))
            .await?;
        parse_session(&body)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
