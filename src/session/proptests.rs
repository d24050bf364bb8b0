//! Property-based tests for the turn state machine

use super::*;
use crate::assistant::{AssistantTurn, ToolCallRequest};
use proptest::prelude::*;
use serde_json::json;

fn arb_tool_call() -> impl Strategy<Value = ToolCallRequest> {
    (
        prop_oneof![
            Just("listStocks"),
            Just("showStockPrice"),
            Just("showStockPurchase"),
            Just("getEvents"),
            Just("showWeather"),
        ],
        0i64..2000,
    )
        .prop_map(|(name, n)| ToolCallRequest::new(name, json!({ "n": n })))
}

fn arb_state() -> impl Strategy<Value = TurnState> {
    prop_oneof![
        Just(TurnState::Idle),
        Just(TurnState::AwaitingAssistant),
        (arb_tool_call(), proptest::collection::vec(arb_tool_call(), 0..3)).prop_map(
            |(current, remaining)| TurnState::ApplyingToolEffects { current, remaining }
        ),
    ]
}

fn applied_calls(effects: &[Effect]) -> Vec<ToolCallRequest> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::ApplyToolCall { call } => Some(call.clone()),
            _ => None,
        })
        .collect()
}

proptest! {
    // Every tool call is applied exactly once, in order, and the turn ends idle
    #[test]
    fn prop_tool_calls_applied_in_order(
        text in "[a-z]{0,10}",
        calls in proptest::collection::vec(arb_tool_call(), 0..6),
    ) {
        let turn = AssistantTurn { thread_id: "t".to_string(), text, tool_calls: calls.clone() };
        let mut result = transition(&TurnState::AwaitingAssistant, TurnEvent::AssistantReplied { turn }).unwrap();
        let mut applied = applied_calls(&result.effects);
        let mut steps = 0;

        while result.new_state != TurnState::Idle {
            prop_assert!(steps <= calls.len(), "turn did not terminate");
            result = transition(&result.new_state, TurnEvent::ToolCallApplied).unwrap();
            applied.extend(applied_calls(&result.effects));
            steps += 1;
        }

        prop_assert_eq!(applied, calls);
        prop_assert_eq!(result.effects.last(), Some(&Effect::TurnComplete));
    }

    // Busy states never accept new input
    #[test]
    fn prop_busy_rejects_input(state in arb_state(), text in "[a-z ]{1,10}") {
        let result = transition(&state, TurnEvent::UserMessage { text });
        if state.is_busy() {
            prop_assert_eq!(result.unwrap_err(), TransitionError::AgentBusy);
        } else {
            prop_assert!(result.is_ok() || matches!(result, Err(TransitionError::EmptyMessage)));
        }
    }

    // Failure appends nothing, whatever the message
    #[test]
    fn prop_failure_appends_nothing(message in ".{0,40}") {
        let result = transition(&TurnState::AwaitingAssistant, TurnEvent::AssistantFailed { message }).unwrap();
        prop_assert_eq!(result.new_state, TurnState::Idle);
        let appended = result
            .effects
            .iter()
            .any(|e| matches!(e, Effect::AppendEntry { .. } | Effect::TurnComplete));
        prop_assert!(!appended, "failed turn produced entries: {:?}", result.effects);
    }

    // Blank text is always rejected from idle
    #[test]
    fn prop_whitespace_rejected(text in "[ \t\n]{0,8}") {
        let result = transition(&TurnState::Idle, TurnEvent::UserMessage { text });
        prop_assert_eq!(result.unwrap_err(), TransitionError::EmptyMessage);
    }

    // The transition is a pure function of its inputs
    #[test]
    fn prop_transition_deterministic(state in arb_state(), text in "[a-z]{0,5}") {
        let a = transition(&state, TurnEvent::UserMessage { text: text.clone() });
        let b = transition(&state, TurnEvent::UserMessage { text });
        match (a, b) {
            (Ok(a), Ok(b)) => {
                prop_assert_eq!(a.new_state, b.new_state);
                prop_assert_eq!(a.effects, b.effects);
            }
            (Err(a), Err(b)) => prop_assert_eq!(a, b),
            _ => prop_assert!(false, "results diverged"),
        }
    }
}
