use serde::{Deserialize, Serialize};

use super::{FilterSpec, Intent};

/// Per-session conversation state
///
/// Carries the filters resolved by the previous turn so that follow-up
/// questions can inherit the dimensions they leave out. A context is never
/// shared between sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationContext {
    /// Filters resolved by the most recent turn
    pub filters: FilterSpec,

    /// Intent resolved by the most recent turn
    pub last_intent: Option<Intent>,

    /// Number of turns resolved in this session
    pub turns: usize,
}

impl ConversationContext {
    /// Create a context for a new session
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if no turn has been resolved yet
    pub fn is_fresh(&self) -> bool {
        self.turns == 0
    }

    /// Produce the context that follows a resolved turn
    pub fn advance(&self, filters: FilterSpec, intent: Intent) -> Self {
        Self {
            filters,
            last_intent: Some(intent),
            turns: self.turns + 1,
        }
    }

    /// Forget everything learned in this session
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
