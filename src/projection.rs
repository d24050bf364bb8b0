//! Transcript projection
//!
//! Derives what the UI renders from the transcript. Pure: the same entries
//! always project to the same render entries.

#[cfg(test)]
mod proptests;

use crate::tools::{StockEvent, StockPurchase, StockQuote, ToolResult};
use crate::transcript::{ConversationId, ConversationState, Entry, EntryContent, Role, ToolPart};
use serde::{Deserialize, Serialize};

/// One renderable row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderEntry {
    pub id: String,
    pub display: DisplayElement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayElement {
    UserMessage { text: String },
    BotMessage { text: String },
    /// One card per tool result, in payload order. `None` marks a result
    /// this build cannot render.
    ToolCards { cards: Vec<Option<Widget>> },
}

/// Client-rendered widget with its props
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "widget", content = "props", rename_all = "snake_case")]
pub enum Widget {
    Stocks(Vec<StockQuote>),
    Stock(StockQuote),
    Purchase(StockPurchase),
    Events(Vec<StockEvent>),
}

impl From<&ToolResult> for Widget {
    fn from(result: &ToolResult) -> Self {
        match result {
            ToolResult::ListStocks(stocks) => Widget::Stocks(stocks.clone()),
            ToolResult::ShowStockPrice(quote) => Widget::Stock(quote.clone()),
            ToolResult::ShowStockPurchase(purchase) => Widget::Purchase(purchase.clone()),
            ToolResult::GetEvents(events) => Widget::Events(events.clone()),
        }
    }
}

/// Project a conversation's entries into render entries.
///
/// System entries are skipped and do not consume an index. Assistant
/// entries without text content consume an index but render nothing.
pub fn project(conversation_id: &ConversationId, entries: &[Entry]) -> Vec<RenderEntry> {
    project_tail(conversation_id, entries, 0)
}

/// Render entries for `entries[from..]`, numbered exactly as they are in
/// the full projection
pub fn project_tail(
    conversation_id: &ConversationId,
    entries: &[Entry],
    from: usize,
) -> Vec<RenderEntry> {
    entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.role != Role::System)
        .enumerate()
        .filter(|(_, (position, _))| *position >= from)
        .filter_map(|(index, (_, entry))| {
            display(entry).map(|display| RenderEntry {
                id: format!("{conversation_id}-{index}"),
                display,
            })
        })
        .collect()
}

pub fn project_state(state: &ConversationState) -> Vec<RenderEntry> {
    project(state.conversation_id(), state.entries())
}

fn display(entry: &Entry) -> Option<DisplayElement> {
    match entry.role {
        Role::System => None,
        Role::User => entry.text().map(|text| DisplayElement::UserMessage {
            text: text.to_string(),
        }),
        Role::Assistant => entry.text().map(|text| DisplayElement::BotMessage {
            text: text.to_string(),
        }),
        Role::Tool => Some(DisplayElement::ToolCards {
            cards: tool_cards(&entry.content),
        }),
    }
}

fn tool_cards(content: &EntryContent) -> Vec<Option<Widget>> {
    match content {
        EntryContent::ToolResults(parts) => parts
            .iter()
            .map(|part| match part {
                ToolPart::Known(result) => Some(Widget::from(result)),
                ToolPart::Unrecognized(_) => None,
            })
            .collect(),
        EntryContent::Text(_) | EntryContent::Other(_) => Vec::new(),
    }
}
