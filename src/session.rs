//! Conversation sessions
//!
//! A turn is driven by a pure `transition` function (Elm style) and an
//! executor in `SessionController` that performs the resulting effects.

mod controller;
mod effect;
mod event;
mod manager;
mod purchase;
mod state;
mod streamable;
mod traits;
mod transition;

#[cfg(test)]
pub mod testing;

#[cfg(test)]
mod proptests;

pub use controller::SessionController;
pub use effect::Effect;
pub use event::TurnEvent;
pub use manager::SessionManager;
pub use purchase::{PurchaseDisplay, PurchaseOrder};
pub use state::{TurnContext, TurnState};
pub use streamable::{streamable, StreamableUi, UiFrame, UiStream};
pub use traits::{ChatSaver, ChatStore, DatabaseChatStore};
pub use transition::{transition, TransitionError, TransitionResult};

use crate::projection::RenderEntry;
use std::time::Duration;

/// Tunables shared by every session
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    /// Pause between purchase display states
    pub purchase_step_delay: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            purchase_step_delay: Duration::from_secs(1),
        }
    }
}

/// Events pushed to live clients of a session
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Full projection after an append
    Entries { entries: Vec<RenderEntry> },
    Error { message: String },
}
