//! Backend integration.
//!
//! Defines the `OverlayBackend` trait for the two remote resources a
//! widget depends on (bankroll record, active session record) and the
//! `FetchError` taxonomy. `http` provides the reqwest implementation.

pub mod http;

use async_trait::async_trait;
use reqwest::StatusCode;
use std::fmt;

use crate::types::{BankrollSnapshot, SessionSnapshot};

/// The remote resource a fetch was aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Bankroll,
    Session,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Bankroll => write!(f, "bankroll"),
            Resource::Session => write!(f, "session"),
        }
    }
}

/// Coarse failure class, used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network unreachable, timeout, non-2xx status.
    Transport,
    /// 2xx response that reports failure or cannot be decoded.
    Semantic,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Transport => write!(f, "transport"),
            FailureKind::Semantic => write!(f, "semantic"),
        }
    }
}

/// Why a single resource fetch failed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("{resource} request failed: {source}")]
    Transport {
        resource: Resource,
        #[source]
        source: reqwest::Error,
    },

    #[error("{resource} request returned HTTP {status}")]
    Status { resource: Resource, status: StatusCode },

    #[error("{resource} rejected by backend: {reason}")]
    Rejected { resource: Resource, reason: String },

    #[error("{resource} payload malformed: {reason}")]
    Malformed { resource: Resource, reason: String },
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Transport { .. } | FetchError::Status { .. } => FailureKind::Transport,
            FetchError::Rejected { .. } | FetchError::Malformed { .. } => FailureKind::Semantic,
        }
    }

    pub fn resource(&self) -> Resource {
        match self {
            FetchError::Transport { resource, .. }
            | FetchError::Status { resource, .. }
            | FetchError::Rejected { resource, .. }
            | FetchError::Malformed { resource, .. } => *resource,
        }
    }
}

/// Source of bankroll and session records.
///
/// Implementations report success only when the backend both answered
/// and flagged the payload as successful; everything else is a
/// `FetchError`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OverlayBackend: Send + Sync {
    /// Fetch the bankroll record for `bankroll_id`.
    async fn fetch_bankroll(&self, bankroll_id: &str) -> Result<BankrollSnapshot, FetchError>;

    /// Fetch the active session played against `bankroll_id`.
    async fn fetch_active_session(&self, bankroll_id: &str)
        -> Result<SessionSnapshot, FetchError>;
}
