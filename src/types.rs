//! Shared types for the overlay service.
//!
//! The `ViewModel` is the unit handed to display widgets: one bankroll,
//! its active session, and the loading/staleness metadata. Every
//! reconciliation cycle replaces it wholesale.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Currency used when the backend omits one.
pub const DEFAULT_CURRENCY: &str = "EUR";

// ---------------------------------------------------------------------------
// Bankroll
// ---------------------------------------------------------------------------

/// A tracked pool of funds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankrollSnapshot {
    pub name: String,
    pub current_amount: Decimal,
    pub starting_amount: Decimal,
    /// ISO 4217 code.
    pub currency: String,
}

impl BankrollSnapshot {
    /// Overall bankroll profit. Always recomputed, never stored.
    ///
    /// Saturates at `Decimal::MAX`/`Decimal::MIN` for amounts whose
    /// difference is not representable.
    pub fn profit(&self) -> Decimal {
        self.current_amount.saturating_sub(self.starting_amount)
    }

    /// Exact profit, or `None` when the difference overflows.
    pub fn checked_profit(&self) -> Option<Decimal> {
        self.current_amount.checked_sub(self.starting_amount)
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The active session played against a bankroll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub name: String,
    pub total_buy_ins: Decimal,
    pub total_cash_outs: Decimal,
    pub cash_out_count: u32,
    pub profit: Decimal,
}

impl SessionSnapshot {
    /// Build a session, deriving `profit` as cash-outs minus buy-ins when
    /// the backend did not supply one. A derived profit saturates.
    pub fn new(
        name: impl Into<String>,
        total_buy_ins: Decimal,
        total_cash_outs: Decimal,
        cash_out_count: u32,
        profit: Option<Decimal>,
    ) -> Self {
        Self {
            name: name.into(),
            total_buy_ins,
            total_cash_outs,
            cash_out_count,
            profit: profit.unwrap_or_else(|| total_cash_outs.saturating_sub(total_buy_ins)),
        }
    }

    /// Like [`SessionSnapshot::new`], but returns `None` when the derived
    /// profit overflows.
    pub fn try_new(
        name: impl Into<String>,
        total_buy_ins: Decimal,
        total_cash_outs: Decimal,
        cash_out_count: u32,
        profit: Option<Decimal>,
    ) -> Option<Self> {
        let profit = match profit {
            Some(p) => p,
            None => total_cash_outs.checked_sub(total_buy_ins)?,
        };
        Some(Self {
            name: name.into(),
            total_buy_ins,
            total_cash_outs,
            cash_out_count,
            profit,
        })
    }
}

// ---------------------------------------------------------------------------
// ViewModel
// ---------------------------------------------------------------------------

/// Which branch of the reconciliation cycle produced a ViewModel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewSource {
    /// Placeholder shown before the first cycle completes.
    Loading,
    /// Both resources fetched successfully.
    Live,
    /// No bankroll id or no endpoint configured.
    Demo,
    /// A fetch failed; financial fields are zeroed.
    Offline,
}

impl fmt::Display for ViewSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewSource::Loading => write!(f, "loading"),
            ViewSource::Live => write!(f, "live"),
            ViewSource::Demo => write!(f, "demo"),
            ViewSource::Offline => write!(f, "offline"),
        }
    }
}

/// Why a fallback snapshot is being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// No bankroll id, or no backend endpoint: show illustrative values.
    Demo,
    /// The cycle's fetches failed: show zeroes and flag the id.
    Offline,
}

/// Merged, display-ready snapshot of one bankroll and its active session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    pub bankroll: BankrollSnapshot,
    pub session: SessionSnapshot,
    pub is_loading: bool,
    /// Completion time of the last reconciliation. `None` while loading.
    pub last_update: Option<DateTime<Utc>>,
    pub source: ViewSource,
    /// The id this model was reconciled for (may be empty).
    pub bankroll_id: String,
}

impl ViewModel {
    /// Placeholder model published when a poller starts.
    pub fn loading(bankroll_id: &str) -> Self {
        Self {
            bankroll: BankrollSnapshot {
                name: "Loading...".to_string(),
                current_amount: Decimal::ZERO,
                starting_amount: Decimal::ZERO,
                currency: DEFAULT_CURRENCY.to_string(),
            },
            session: SessionSnapshot::new("Loading...", Decimal::ZERO, Decimal::ZERO, 0, None),
            is_loading: true,
            last_update: None,
            source: ViewSource::Loading,
            bankroll_id: bankroll_id.to_string(),
        }
    }

    /// Model built from two successful fetches.
    pub fn live(
        bankroll_id: &str,
        bankroll: BankrollSnapshot,
        session: SessionSnapshot,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            bankroll,
            session,
            is_loading: false,
            last_update: Some(at),
            source: ViewSource::Live,
            bankroll_id: bankroll_id.to_string(),
        }
    }

    /// Deterministic placeholder used whenever live data cannot be obtained.
    pub fn fallback(reason: FallbackReason, bankroll_id: &str, at: DateTime<Utc>) -> Self {
        let (bankroll, session, source) = match reason {
            FallbackReason::Demo => {
                let session_name = if bankroll_id.is_empty() {
                    "Demo Session".to_string()
                } else {
                    format!("Demo Session (ID: {bankroll_id})")
                };
                (
                    BankrollSnapshot {
                        name: "GGPoker Demo".to_string(),
                        current_amount: dec!(850.00),
                        starting_amount: dec!(700.00),
                        currency: DEFAULT_CURRENCY.to_string(),
                    },
                    SessionSnapshot::new(session_name, dec!(150.00), dec!(280.00), 3, None),
                    ViewSource::Demo,
                )
            }
            FallbackReason::Offline => (
                BankrollSnapshot {
                    name: format!("Offline (ID: {bankroll_id})"),
                    current_amount: Decimal::ZERO,
                    starting_amount: Decimal::ZERO,
                    currency: DEFAULT_CURRENCY.to_string(),
                },
                SessionSnapshot::new(
                    format!("API Offline (ID: {bankroll_id})"),
                    Decimal::ZERO,
                    Decimal::ZERO,
                    0,
                    None,
                ),
                ViewSource::Offline,
            ),
        };

        Self {
            bankroll,
            session,
            is_loading: false,
            last_update: Some(at),
            source,
            bankroll_id: bankroll_id.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
