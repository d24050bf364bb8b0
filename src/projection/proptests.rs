//! Property-based tests for projection

use super::*;
use crate::tools::PurchaseStatus;
use proptest::prelude::*;
use serde_json::json;
use std::collections::HashSet;

fn arb_quote() -> impl Strategy<Value = StockQuote> {
    ("[A-Z]{1,4}", 0.0f64..1000.0, -50.0f64..50.0).prop_map(|(symbol, price, delta)| StockQuote {
        symbol,
        price,
        delta,
    })
}

fn arb_tool_result() -> impl Strategy<Value = ToolResult> {
    prop_oneof![
        proptest::collection::vec(arb_quote(), 0..4).prop_map(ToolResult::ListStocks),
        arb_quote().prop_map(ToolResult::ShowStockPrice),
        (arb_quote(), 0i64..2000).prop_map(|(q, shares)| {
            ToolResult::ShowStockPurchase(StockPurchase {
                symbol: q.symbol,
                price: q.price,
                number_of_shares: shares,
                status: crate::tools::purchase_status(shares),
            })
        }),
        Just(ToolResult::GetEvents(Vec::new())),
    ]
}

fn malformed_assistant() -> Entry {
    Entry::new(Role::Assistant, EntryContent::Other(json!({ "legacy": true })))
}

fn arb_entry() -> impl Strategy<Value = Entry> {
    prop_oneof![
        "[a-z ]{0,12}".prop_map(Entry::user),
        "[a-z ]{0,12}".prop_map(Entry::assistant),
        "[a-z ]{0,12}".prop_map(Entry::system),
        proptest::collection::vec(arb_tool_result(), 0..3).prop_map(Entry::tool),
        Just(malformed_assistant()),
    ]
}

proptest! {
    #[test]
    fn prop_projection_is_idempotent(entries in proptest::collection::vec(arb_entry(), 0..25)) {
        let id = ConversationId::new();
        let first = serde_json::to_string(&project(&id, &entries)).unwrap();
        let second = serde_json::to_string(&project(&id, &entries)).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_system_entries_are_filtered(entries in proptest::collection::vec(arb_entry(), 0..25)) {
        let system = entries.iter().filter(|e| e.role == Role::System).count();
        let rendered = project(&ConversationId::new(), &entries);
        prop_assert!(rendered.len() <= entries.len() - system);
    }

    #[test]
    fn prop_render_ids_are_unique(entries in proptest::collection::vec(arb_entry(), 0..25)) {
        let rendered = project(&ConversationId::new(), &entries);
        let ids: HashSet<_> = rendered.iter().map(|r| r.id.as_str()).collect();
        prop_assert_eq!(ids.len(), rendered.len());
    }

    #[test]
    fn prop_tool_cards_match_payload(results in proptest::collection::vec(arb_tool_result(), 0..5)) {
        let rendered = project(&ConversationId::new(), &[Entry::tool(results.clone())]);
        match &rendered[0].display {
            DisplayElement::ToolCards { cards } => {
                prop_assert_eq!(cards.len(), results.len());
                for (card, result) in cards.iter().zip(&results) {
                    prop_assert_eq!(card.as_ref(), Some(&Widget::from(result)));
                }
            }
            other => prop_assert!(false, "unexpected display {:?}", other),
        }
    }

    #[test]
    fn prop_expired_purchase_projects_expired(shares in 1001i64..5000) {
        let purchase = StockPurchase {
            symbol: "AAPL".to_string(),
            price: 150.0,
            number_of_shares: shares,
            status: crate::tools::purchase_status(shares),
        };
        let rendered = project(&ConversationId::new(), &[Entry::tool([ToolResult::ShowStockPurchase(purchase)])]);
        match &rendered[0].display {
            DisplayElement::ToolCards { cards } => match &cards[0] {
                Some(Widget::Purchase(p)) => prop_assert_eq!(p.status, PurchaseStatus::Expired),
                other => prop_assert!(false, "unexpected card {:?}", other),
            },
            other => prop_assert!(false, "unexpected display {:?}", other),
        }
    }
}
