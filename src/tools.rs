//! Stock widget tools
//!
//! The assistant decides which widgets to show; this module only validates
//! and normalizes the arguments it sends into `ToolResult` records.

mod types;

pub use types::{
    PurchaseStatus, StockEvent, StockPurchase, StockQuote, ToolResult, GET_EVENTS, LIST_STOCKS,
    SHOW_STOCK_PRICE, SHOW_STOCK_PURCHASE,
};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use types::{GetEventsArgs, ListStocksArgs, PurchaseArgs};

/// Largest share count a single purchase card accepts
pub const MAX_SHARES_PER_PURCHASE: i64 = 1000;

/// System note recorded next to an expired purchase card
pub const INVALID_AMOUNT_NOTE: &str = "[User has selected an invalid amount]";

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Invalid {tool} payload: {source}")]
    Payload {
        tool: &'static str,
        source: serde_json::Error,
    },
}

/// A validated tool result plus the system note that must accompany it
#[derive(Debug, Clone, PartialEq)]
pub struct Encoded {
    pub result: ToolResult,
    pub note: Option<String>,
}

impl Encoded {
    fn plain(result: ToolResult) -> Self {
        Self { result, note: None }
    }
}

/// Validate a tool call from the assistant and normalize it
pub fn encode(tool_name: &str, args: &Value) -> Result<Encoded, ToolError> {
    match tool_name {
        LIST_STOCKS => {
            let args: ListStocksArgs = parse(LIST_STOCKS, args)?;
            Ok(Encoded::plain(ToolResult::ListStocks(args.stocks)))
        }
        SHOW_STOCK_PRICE => {
            let quote: StockQuote = parse(SHOW_STOCK_PRICE, args)?;
            Ok(Encoded::plain(ToolResult::ShowStockPrice(quote)))
        }
        SHOW_STOCK_PURCHASE => {
            let args: PurchaseArgs = parse(SHOW_STOCK_PURCHASE, args)?;
            let status = purchase_status(args.number_of_shares);
            let note = (status == PurchaseStatus::Expired).then(|| INVALID_AMOUNT_NOTE.to_string());
            Ok(Encoded {
                result: ToolResult::ShowStockPurchase(StockPurchase {
                    symbol: args.symbol,
                    price: args.price,
                    number_of_shares: args.number_of_shares,
                    status,
                }),
                note,
            })
        }
        GET_EVENTS => {
            let args: GetEventsArgs = parse(GET_EVENTS, args)?;
            Ok(Encoded::plain(ToolResult::GetEvents(args.events)))
        }
        other => Err(ToolError::UnknownTool(other.to_string())),
    }
}

/// Purchases are only valid for 1..=1000 shares
pub fn purchase_status(number_of_shares: i64) -> PurchaseStatus {
    if number_of_shares <= 0 || number_of_shares > MAX_SHARES_PER_PURCHASE {
        PurchaseStatus::Expired
    } else {
        PurchaseStatus::Normal
    }
}

fn parse<T: DeserializeOwned>(tool: &'static str, args: &Value) -> Result<T, ToolError> {
    T::deserialize(args).map_err(|source| ToolError::Payload { tool, source })
}

/// Function definition advertised for a tool
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

fn quote_schema() -> Value {
    json!({
        "type": "object",
        "required": ["symbol", "price", "delta"],
        "properties": {
            "symbol": { "type": "string", "description": "The ticker symbol" },
            "price": { "type": "number", "description": "Current price" },
            "delta": { "type": "number", "description": "Change in price" }
        }
    })
}

/// Definitions of the four widget tools, as configured on the assistant
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: LIST_STOCKS,
            description: "List three imaginary stocks that are trending.",
            parameters: json!({
                "type": "object",
                "required": ["stocks"],
                "properties": {
                    "stocks": { "type": "array", "items": quote_schema() }
                }
            }),
        },
        ToolDefinition {
            name: SHOW_STOCK_PRICE,
            description: "Get the current stock price of a given stock or currency. Use this to show the price to the user.",
            parameters: quote_schema(),
        },
        ToolDefinition {
            name: SHOW_STOCK_PURCHASE,
            description: "Show price and the UI to purchase a stock or currency. Use this if the user wants to purchase a stock or currency.",
            parameters: json!({
                "type": "object",
                "required": ["symbol", "price", "numberOfShares"],
                "properties": {
                    "symbol": { "type": "string", "description": "The ticker symbol" },
                    "price": { "type": "number", "description": "Current price" },
                    "numberOfShares": {
                        "type": "integer",
                        "description": "The number of shares to purchase; defaults to 100"
                    }
                }
            }),
        },
        ToolDefinition {
            name: GET_EVENTS,
            description: "List funny imaginary events between user highlighted dates that describe stock activity.",
            parameters: json!({
                "type": "object",
                "required": ["events"],
                "properties": {
                    "events": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["date", "headline", "description"],
                            "properties": {
                                "date": { "type": "string", "description": "The date, in ISO-8601 format" },
                                "headline": { "type": "string" },
                                "description": { "type": "string" }
                            }
                        }
                    }
                }
            }),
        },
    ]
}
