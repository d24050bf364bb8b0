//! Pure state transition function

use super::{Effect, TurnEvent, TurnState};
use crate::assistant::ToolCallRequest;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: TurnState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: TurnState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq)]
pub enum TransitionError {
    #[error("Message is empty")]
    EmptyMessage,
    #[error("A turn is already in progress for this conversation")]
    AgentBusy,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function.
///
/// Given the same state and event it always returns the same state and
/// effects; all I/O happens in the executor.
pub fn transition(state: &TurnState, event: TurnEvent) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // Idle + UserMessage -> AwaitingAssistant
        (TurnState::Idle, TurnEvent::UserMessage { text }) => {
            if text.trim().is_empty() {
                return Err(TransitionError::EmptyMessage);
            }
            Ok(TransitionResult::new(TurnState::AwaitingAssistant)
                .with_effect(Effect::append_user(text.clone()))
                .with_effect(Effect::RequestAssistant { text }))
        }

        (TurnState::AwaitingAssistant | TurnState::ApplyingToolEffects { .. }, TurnEvent::UserMessage { .. }) => {
            Err(TransitionError::AgentBusy)
        }

        // AwaitingAssistant + reply: text first, then tool calls in order
        (TurnState::AwaitingAssistant, TurnEvent::AssistantReplied { turn }) => {
            let reply = TransitionResult::new(TurnState::Idle)
                .with_effect(Effect::RememberThread {
                    thread_id: turn.thread_id,
                })
                .with_effect(Effect::append_assistant(turn.text));

            match next_call(turn.tool_calls) {
                None => Ok(reply.with_effects(finish_turn())),
                Some((current, remaining)) => Ok(TransitionResult {
                    new_state: TurnState::ApplyingToolEffects {
                        current: current.clone(),
                        remaining,
                    },
                    effects: reply.effects,
                }
                .with_effect(Effect::ApplyToolCall { call: current })),
            }
        }

        // Assistant failure: the user entry stays, nothing else is appended
        (TurnState::AwaitingAssistant, TurnEvent::AssistantFailed { message }) => {
            Ok(TransitionResult::new(TurnState::Idle)
                .with_effect(Effect::SaveChat)
                .with_effect(Effect::NotifyError { message }))
        }

        (TurnState::ApplyingToolEffects { remaining, .. }, TurnEvent::ToolCallApplied) => {
            match next_call(remaining.clone()) {
                None => Ok(TransitionResult::new(TurnState::Idle).with_effects(finish_turn())),
                Some((current, remaining)) => Ok(TransitionResult::new(
                    TurnState::ApplyingToolEffects {
                        current: current.clone(),
                        remaining,
                    },
                )
                .with_effect(Effect::ApplyToolCall { call: current })),
            }
        }

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {} on {event:?}",
            state.name()
        ))),
    }
}

fn next_call(calls: Vec<ToolCallRequest>) -> Option<(ToolCallRequest, Vec<ToolCallRequest>)> {
    let mut calls = calls.into_iter();
    let current = calls.next()?;
    Some((current, calls.collect()))
}

fn finish_turn() -> [Effect; 2] {
    [Effect::SaveChat, Effect::TurnComplete]
}
