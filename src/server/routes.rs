//! Overlay API route handlers.
//!
//! All endpoints are read-only. The bankroll id comes from the widget's
//! own `?bankroll=` launch parameter.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::overlay::{OverlayInfo, OverlayKind, Readout, UnknownOverlay};
use crate::registry::{PollerRegistry, RegistryFull};
use crate::types::ViewModel;

pub type AppState = Arc<PollerRegistry>;

#[derive(Debug, Default, Deserialize)]
pub struct BankrollQuery {
    #[serde(default)]
    pub bankroll: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    UnknownOverlay(#[from] UnknownOverlay),
    #[error(transparent)]
    Busy(#[from] RegistryFull),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::UnknownOverlay(_) => StatusCode::NOT_FOUND,
            ApiError::Busy(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

/// GET /api/overlays
pub async fn get_overlays() -> Json<Vec<OverlayInfo>> {
    Json(OverlayKind::ALL.into_iter().map(OverlayInfo::from).collect())
}

/// GET /api/view?bankroll=ID
pub async fn get_view(
    State(registry): State<AppState>,
    Query(query): Query<BankrollQuery>,
) -> Result<Json<ViewModel>, ApiError> {
    let poller = registry.get_or_start(&query.bankroll).await?;
    Ok(Json(poller.current()))
}

/// GET /api/overlay/:kind?bankroll=ID
pub async fn get_overlay(
    State(registry): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<BankrollQuery>,
) -> Result<Json<Readout>, ApiError> {
    let kind: OverlayKind = kind.parse()?;
    let poller = registry.get_or_start(&query.bankroll).await?;
    Ok(Json(Readout::from_view(kind, &poller.current())))
}
