//! Overlay readouts.
//!
//! Each widget kind displays one figure from the current `ViewModel`.
//! A `Readout` is the display-ready form of that figure.

pub mod currency;

use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::types::ViewModel;
use currency::{format_currency, format_signed};

/// The widget kinds offered to the streaming tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayKind {
    #[serde(rename = "buyins")]
    BuyIns,
    Cashes,
    Bankroll,
    CashCount,
    SessionProfit,
}

impl OverlayKind {
    pub const ALL: [OverlayKind; 5] = [
        OverlayKind::BuyIns,
        OverlayKind::Cashes,
        OverlayKind::Bankroll,
        OverlayKind::CashCount,
        OverlayKind::SessionProfit,
    ];

    /// URL slug, as used in `/api/overlay/{slug}`.
    pub fn slug(&self) -> &'static str {
        match self {
            OverlayKind::BuyIns => "buyins",
            OverlayKind::Cashes => "cashes",
            OverlayKind::Bankroll => "bankroll",
            OverlayKind::CashCount => "cash-count",
            OverlayKind::SessionProfit => "session-profit",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            OverlayKind::BuyIns => "Session Buy-Ins",
            OverlayKind::Cashes => "Session Cashes",
            OverlayKind::Bankroll => "Bankroll Balance",
            OverlayKind::CashCount => "Cash Count",
            OverlayKind::SessionProfit => "Session Profit/Loss",
        }
    }

    /// Suggested browser-source size in pixels (width, height).
    pub fn size(&self) -> (u32, u32) {
        match self {
            OverlayKind::BuyIns | OverlayKind::Cashes => (180, 80),
            OverlayKind::Bankroll => (200, 100),
            OverlayKind::CashCount => (120, 80),
            OverlayKind::SessionProfit => (160, 80),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            OverlayKind::BuyIns => "Total buy-ins of the active session",
            OverlayKind::Cashes => "Total cash-outs of the active session",
            OverlayKind::Bankroll => "Current bankroll with overall profit",
            OverlayKind::CashCount => "Number of cash-outs in the active session",
            OverlayKind::SessionProfit => "Profit or loss of the active session",
        }
    }
}

impl fmt::Display for OverlayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown overlay kind: {0}")]
pub struct UnknownOverlay(pub String);

impl FromStr for OverlayKind {
    type Err = UnknownOverlay;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OverlayKind::ALL
            .into_iter()
            .find(|k| k.slug() == s)
            .ok_or_else(|| UnknownOverlay(s.to_string()))
    }
}

/// Listing entry describing one overlay kind.
#[derive(Debug, Clone, Serialize)]
pub struct OverlayInfo {
    pub slug: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub width: u32,
    pub height: u32,
}

impl From<OverlayKind> for OverlayInfo {
    fn from(kind: OverlayKind) -> Self {
        let (width, height) = kind.size();
        Self {
            slug: kind.slug(),
            title: kind.title(),
            description: kind.description(),
            width,
            height,
        }
    }
}

/// One widget's display-ready figure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Readout {
    pub kind: OverlayKind,
    pub label: String,
    pub value: String,
    /// Extra line under the value (bankroll profit).
    pub secondary: Option<String>,
    /// Profit direction, for kinds that show one.
    pub positive: Option<bool>,
    pub bankroll_id: String,
    pub is_loading: bool,
}

impl Readout {
    /// All amounts, session ones included, are shown in the bankroll's
    /// currency.
    pub fn from_view(kind: OverlayKind, vm: &ViewModel) -> Self {
        let currency = vm.bankroll.currency.as_str();
        let non_negative = |d: Decimal| d >= Decimal::ZERO;

        let (label, value, secondary, positive) = match kind {
            OverlayKind::BuyIns => (
                "Buy-Ins".to_string(),
                format_currency(vm.session.total_buy_ins, currency),
                None,
                None,
            ),
            OverlayKind::Cashes => (
                "Cashes".to_string(),
                format_currency(vm.session.total_cash_outs, currency),
                None,
                None,
            ),
            OverlayKind::Bankroll => {
                let profit = vm.bankroll.profit();
                (
                    vm.bankroll.name.clone(),
                    format_currency(vm.bankroll.current_amount, currency),
                    Some(format_signed(profit, currency)),
                    Some(non_negative(profit)),
                )
            }
            OverlayKind::CashCount => (
                "Cashes".to_string(),
                vm.session.cash_out_count.to_string(),
                None,
                None,
            ),
            OverlayKind::SessionProfit => (
                "Session P/L".to_string(),
                format_signed(vm.session.profit, currency),
                None,
                Some(non_negative(vm.session.profit)),
            ),
        };

        Self {
            kind,
            label,
            value,
            secondary,
            positive,
            bankroll_id: vm.bankroll_id.clone(),
            is_loading: vm.is_loading,
        }
    }
}
