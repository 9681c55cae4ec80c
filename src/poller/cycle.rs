//! One reconciliation cycle: fetch both resources, merge, or fall back.
//!
//! A cycle never fails. Whatever happens, it yields a fully populated
//! `ViewModel` built from this cycle's inputs alone.

use chrono::Utc;
use tracing::{debug, warn};

use crate::backend::{FetchError, OverlayBackend};
use crate::types::{FallbackReason, ViewModel};

/// Run a single cycle for `bankroll_id`.
///
/// - no id, or no backend configured → demo snapshot, no requests issued
/// - both fetches succeed → live snapshot
/// - either fetch fails → offline snapshot (no mixing of live and
///   fallback fields)
pub async fn reconcile(backend: Option<&dyn OverlayBackend>, bankroll_id: &str) -> ViewModel {
    let bankroll_id = bankroll_id.trim();
    let backend = match backend {
        Some(b) if !bankroll_id.is_empty() => b,
        _ => {
            debug!(
                bankroll_id,
                has_backend = backend.is_some(),
                "No bankroll id or endpoint, using demo data"
            );
            return ViewModel::fallback(FallbackReason::Demo, bankroll_id, Utc::now());
        }
    };

    let (bankroll, session) = tokio::join!(
        backend.fetch_bankroll(bankroll_id),
        backend.fetch_active_session(bankroll_id),
    );

    match (bankroll, session) {
        (Ok(bankroll), Ok(session)) => {
            debug!(
                bankroll_id,
                bankroll = %bankroll.name,
                session = %session.name,
                buy_ins = %session.total_buy_ins,
                cash_outs = %session.total_cash_outs,
                "Live data reconciled"
            );
            ViewModel::live(bankroll_id, bankroll, session, Utc::now())
        }
        (bankroll, session) => {
            let partial = bankroll.is_ok() != session.is_ok();
            for err in [bankroll.err(), session.err()].into_iter().flatten() {
                log_failure(bankroll_id, &err, partial);
            }
            ViewModel::fallback(FallbackReason::Offline, bankroll_id, Utc::now())
        }
    }
}

fn log_failure(bankroll_id: &str, err: &FetchError, partial: bool) {
    warn!(
        bankroll_id,
        resource = %err.resource(),
        kind = %err.kind(),
        partial,
        error = %err,
        "Overlay fetch failed, showing offline data"
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
