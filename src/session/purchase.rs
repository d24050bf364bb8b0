//! Simulated purchase confirmation

use super::StreamableUi;
use serde::Serialize;
use std::time::Duration;

/// Display states of a purchase in progress
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PurchaseDisplay {
    Purchasing { amount: i64, symbol: String },
    Working { amount: i64, symbol: String },
    Purchased { amount: i64, symbol: String, total: f64 },
}

impl PurchaseDisplay {
    /// Human readable line for the UI
    pub fn message(&self) -> String {
        match self {
            PurchaseDisplay::Purchasing { amount, symbol } => {
                format!("Purchasing {amount} ${symbol}...")
            }
            PurchaseDisplay::Working { amount, symbol } => {
                format!("Purchasing {amount} ${symbol}... working on it...")
            }
            PurchaseDisplay::Purchased {
                amount,
                symbol,
                total,
            } => format!("You have successfully purchased {amount} ${symbol}. Total cost: {total}"),
        }
    }
}

/// A requested purchase
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseOrder {
    pub symbol: String,
    pub price: f64,
    pub amount: i64,
}

impl PurchaseOrder {
    #[allow(clippy::cast_precision_loss)]
    pub fn total(&self) -> f64 {
        self.amount as f64 * self.price
    }

    /// System entry recorded once the purchase is filled
    pub fn note(&self) -> String {
        format!(
            "[User has purchased {} shares of {} at ${}. Total cost = {}.]",
            self.amount,
            self.symbol,
            self.price,
            self.total()
        )
    }
}

/// Walk the purchase through its display states, pausing `step` between
/// them. The final state is returned, not published, so the caller can
/// record the fill before completing the UI.
pub(super) async fn run(
    order: &PurchaseOrder,
    ui: &StreamableUi<PurchaseDisplay>,
    step: Duration,
) -> PurchaseDisplay {
    tokio::time::sleep(step).await;
    ui.update(PurchaseDisplay::Working {
        amount: order.amount,
        symbol: order.symbol.clone(),
    });

    tokio::time::sleep(step).await;
    PurchaseDisplay::Purchased {
        amount: order.amount,
        symbol: order.symbol.clone(),
        total: order.total(),
    }
}
