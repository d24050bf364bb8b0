//! Typed tool payloads

use serde::{Deserialize, Serialize};

/// A quoted stock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockQuote {
    pub symbol: String,
    pub price: f64,
    pub delta: f64,
}

/// Whether a purchase card can still be confirmed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    #[default]
    Normal,
    Expired,
}

/// A proposed stock purchase awaiting user confirmation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockPurchase {
    pub symbol: String,
    pub price: f64,
    pub number_of_shares: i64,
    #[serde(default)]
    pub status: PurchaseStatus,
}

/// A company event shown in the events card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockEvent {
    pub date: String,
    pub headline: String,
    pub description: String,
}

/// Validated output of one tool invocation.
///
/// Serialized as `{"toolName": ..., "result": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "toolName", content = "result", rename_all = "camelCase")]
pub enum ToolResult {
    ListStocks(Vec<StockQuote>),
    ShowStockPrice(StockQuote),
    ShowStockPurchase(StockPurchase),
    GetEvents(Vec<StockEvent>),
}

impl ToolResult {
    pub fn tool_name(&self) -> &'static str {
        match self {
            ToolResult::ListStocks(_) => LIST_STOCKS,
            ToolResult::ShowStockPrice(_) => SHOW_STOCK_PRICE,
            ToolResult::ShowStockPurchase(_) => SHOW_STOCK_PURCHASE,
            ToolResult::GetEvents(_) => GET_EVENTS,
        }
    }
}

pub const LIST_STOCKS: &str = "listStocks";
pub const SHOW_STOCK_PRICE: &str = "showStockPrice";
pub const SHOW_STOCK_PURCHASE: &str = "showStockPurchase";
pub const GET_EVENTS: &str = "getEvents";

// Argument shapes as sent by the assistant

#[derive(Debug, Deserialize)]
pub(super) struct ListStocksArgs {
    pub stocks: Vec<StockQuote>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PurchaseArgs {
    pub symbol: String,
    pub price: f64,
    #[serde(alias = "shares")]
    pub number_of_shares: i64,
}

#[derive(Debug, Deserialize)]
pub(super) struct GetEventsArgs {
    pub events: Vec<StockEvent>,
}
