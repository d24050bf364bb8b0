//! Per-conversation turn executor

use super::purchase;
use super::{
    streamable, transition, ChatSaver, Effect, PurchaseDisplay, PurchaseOrder, SessionEvent,
    SessionSettings, TransitionError, TransitionResult, TurnContext, TurnEvent, TurnState,
    UiStream,
};
use crate::assistant::{AssistantBridge, ToolCallRequest};
use crate::projection::{project_state, project_tail, RenderEntry};
use crate::tools::{self, ToolError};
use crate::transcript::{ConversationId, ConversationState, Entry, SharedTranscript};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// What a completed turn produced, as render entries
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub entries: Vec<RenderEntry>,
}

/// Owns one live conversation: its transcript, its assistant thread and
/// the turn state machine.
pub struct SessionController {
    transcript: SharedTranscript,
    bridge: Arc<dyn AssistantBridge>,
    saver: ChatSaver,
    settings: SessionSettings,
    turn: tokio::sync::Mutex<TurnContext>,
    cancel: Mutex<CancellationToken>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
    last_active: Mutex<Instant>,
}

impl SessionController {
    pub fn new(
        state: ConversationState,
        bridge: Arc<dyn AssistantBridge>,
        saver: ChatSaver,
        settings: SessionSettings,
    ) -> Self {
        let (broadcast_tx, _) = broadcast::channel(128);
        Self {
            transcript: SharedTranscript::new(state),
            bridge,
            saver,
            settings,
            turn: tokio::sync::Mutex::new(TurnContext::default()),
            cancel: Mutex::new(CancellationToken::new()),
            broadcast_tx,
            last_active: Mutex::new(Instant::now()),
        }
    }

    pub fn conversation_id(&self) -> ConversationId {
        self.transcript.conversation_id()
    }

    pub fn owner(&self) -> Option<&str> {
        self.saver.user_id()
    }

    pub fn snapshot(&self) -> Arc<ConversationState> {
        self.transcript.snapshot()
    }

    /// Current projection of the whole transcript
    pub fn render(&self) -> Vec<RenderEntry> {
        project_state(&self.snapshot())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Number of live clients following this session
    pub fn subscriber_count(&self) -> usize {
        self.broadcast_tx.receiver_count()
    }

    /// Time since the last turn, append or purchase
    pub fn idle_for(&self) -> Duration {
        self.last_active.lock().unwrap().elapsed()
    }

    fn touch(&self) {
        *self.last_active.lock().unwrap() = Instant::now();
    }

    /// Whether a turn currently holds the turn lock
    pub fn is_busy(&self) -> bool {
        self.turn.try_lock().is_err()
    }

    /// Cancel the in-flight assistant wait, if any
    pub fn cancel(&self) {
        self.cancel.lock().unwrap().cancel();
    }

    /// Run one turn for `text`.
    ///
    /// Blank input is rejected before anything is appended. A failed
    /// assistant call yields `Ok(None)`; the user entry is kept.
    /// Concurrent calls wait for the running turn to finish.
    pub async fn submit_user_message(
        &self,
        text: &str,
    ) -> Result<Option<TurnOutcome>, TransitionError> {
        let mut turn = self.turn.lock().await;
        self.touch();
        self.recover_abandoned_turn(&mut turn);
        let cancel = CancellationToken::new();
        *self.cancel.lock().unwrap() = cancel.clone();

        let baseline = self.snapshot().entries().len();
        let conv_id = self.conversation_id();

        // First transition runs here so rejections surface to the caller
        let first = transition(
            &turn.state,
            TurnEvent::UserMessage {
                text: text.to_string(),
            },
        )?;

        tracing::info!(conv_id = %conv_id, "Turn started");
        let completed = self.run_effects(&mut turn, first, &cancel).await;

        if completed {
            let entries = project_tail(&conv_id, self.snapshot().entries(), baseline);
            tracing::info!(conv_id = %conv_id, rendered = entries.len(), "Turn completed");
            Ok(Some(TurnOutcome { entries }))
        } else {
            Ok(None)
        }
    }

    /// Holding the turn lock means no turn is running, so a busy state here
    /// was left by a turn whose future was dropped mid-flight. Whatever it
    /// appended stays; the machine goes back to idle.
    fn recover_abandoned_turn(&self, turn: &mut TurnContext) {
        if !turn.state.is_busy() {
            return;
        }
        tracing::warn!(
            conv_id = %self.conversation_id(),
            state = turn.state.name(),
            "Recovering abandoned turn"
        );
        turn.state = TurnState::Idle;
        self.saver.save(self.snapshot());
    }

    /// Drive the machine until no effect produces a further event.
    /// Returns whether the turn completed with an assistant reply.
    async fn run_effects(
        &self,
        turn: &mut TurnContext,
        first: TransitionResult,
        cancel: &CancellationToken,
    ) -> bool {
        let mut completed = false;
        let mut pending = Some(first);

        while let Some(result) = pending.take() {
            tracing::debug!(from = turn.state.name(), to = result.new_state.name(), "Turn transition");
            turn.state = result.new_state;

            let mut next_event = None;
            for effect in result.effects {
                if matches!(effect, Effect::TurnComplete) {
                    completed = true;
                    continue;
                }
                if let Some(event) = self.execute_effect(turn, effect, cancel).await {
                    next_event = Some(event);
                }
            }

            if let Some(event) = next_event {
                match transition(&turn.state, event) {
                    Ok(result) => pending = Some(result),
                    Err(e) => {
                        tracing::error!(error = %e, state = turn.state.name(), "Turn aborted");
                        turn.state = TurnState::Idle;
                        let _ = self.broadcast_tx.send(SessionEvent::Error {
                            message: e.to_string(),
                        });
                        return false;
                    }
                }
            }
        }

        completed
    }

    async fn execute_effect(
        &self,
        turn: &mut TurnContext,
        effect: Effect,
        cancel: &CancellationToken,
    ) -> Option<TurnEvent> {
        match effect {
            Effect::AppendEntry { role, content } => {
                self.append(Entry::new(role, content));
                None
            }

            Effect::RequestAssistant { text } => {
                let result = self
                    .bridge
                    .send(turn.thread_id.as_deref(), &text, cancel.clone())
                    .await;
                Some(match result {
                    Ok(reply) => TurnEvent::AssistantReplied { turn: reply },
                    Err(e) => {
                        tracing::warn!(
                            conv_id = %self.conversation_id(),
                            error = %e,
                            "Assistant call failed, turn discarded"
                        );
                        TurnEvent::AssistantFailed {
                            message: e.to_string(),
                        }
                    }
                })
            }

            Effect::ApplyToolCall { call } => {
                self.apply_tool_call(&call);
                Some(TurnEvent::ToolCallApplied)
            }

            Effect::RememberThread { thread_id } => {
                if !thread_id.is_empty() {
                    turn.thread_id = Some(thread_id);
                }
                None
            }

            Effect::SaveChat => {
                self.saver.save(self.snapshot());
                None
            }

            Effect::NotifyError { message } => {
                let _ = self.broadcast_tx.send(SessionEvent::Error { message });
                None
            }

            Effect::TurnComplete => None,
        }
    }

    /// Encode one call and append its tool entry, then its note if any.
    /// A bad call appends nothing and never affects its siblings.
    fn apply_tool_call(&self, call: &ToolCallRequest) {
        match tools::encode(&call.tool_name, &call.args) {
            Ok(encoded) => {
                self.append(Entry::tool([encoded.result]));
                if let Some(note) = encoded.note {
                    self.append(Entry::system(note));
                }
            }
            Err(ToolError::UnknownTool(name)) => {
                tracing::debug!(tool = %name, "Ignoring unknown tool call");
            }
            Err(e @ ToolError::Payload { .. }) => {
                tracing::warn!(tool = %call.tool_name, error = %e, "Skipping malformed tool call");
            }
        }
    }

    fn append(&self, entry: Entry) {
        self.touch();
        let snapshot = self.transcript.append(entry);
        let _ = self.broadcast_tx.send(SessionEvent::Entries {
            entries: project_state(&snapshot),
        });
    }

    /// Start a simulated purchase and return its live display.
    ///
    /// Runs detached from any turn. The fill is recorded as a system entry
    /// before the display completes.
    pub fn confirm_purchase(
        self: &Arc<Self>,
        symbol: &str,
        price: f64,
        amount: i64,
    ) -> UiStream<PurchaseDisplay> {
        let order = PurchaseOrder {
            symbol: symbol.to_string(),
            price,
            amount,
        };
        self.touch();
        let (ui, stream) = streamable();
        ui.update(PurchaseDisplay::Purchasing {
            amount,
            symbol: order.symbol.clone(),
        });

        let session = Arc::clone(self);
        tokio::spawn(async move {
            let done = purchase::run(&order, &ui, session.settings.purchase_step_delay).await;
            session.append(Entry::system(order.note()));
            tracing::info!(
                conv_id = %session.conversation_id(),
                symbol = %order.symbol,
                amount = order.amount,
                total = order.total(),
                "Purchase filled"
            );
            ui.complete(done);
            session.saver.save(session.snapshot());
        });

        stream
    }
}
