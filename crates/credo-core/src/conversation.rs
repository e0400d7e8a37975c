//! Conversation turn types.
//!
//! This module contains types for representing the ordered message history
//! of a chat session: who said what, in the order it was produced.

use serde::{Deserialize, Serialize};

/// Represents the producer of a turn in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnRole {
    /// Turn produced by the underwriter at the keyboard.
    User,
    /// Turn produced by the generation backend.
    Model,
}

/// A single finalized exchange unit in a conversation.
///
/// Turns are immutable once appended to a history; partial model output is
/// never represented as a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who produced the turn.
    pub role: TurnRole,
    /// The full text of the turn.
    pub text: String,
}

impl Turn {
    /// Creates a user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    /// Creates a model turn.
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            text: text.into(),
        }
    }
}

/// Ordered turn history scoped to a single chat session.
///
/// Append-only; turns are never reordered, deduplicated, or persisted beyond
/// the owning session's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a finalized turn.
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Returns the turns in production order.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of turns recorded so far.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// True when no turn has been exchanged yet.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_preserves_order() {
        let mut history = ConversationHistory::new();
        history.push(Turn::user("question"));
        history.push(Turn::model("answer"));

        assert_eq!(history.len(), 2);
        assert_eq!(history.turns()[0].role, TurnRole::User);
        assert_eq!(history.turns()[1].role, TurnRole::Model);
        assert_eq!(history.turns()[1].text, "answer");
    }
}
