//! Chat history for one assistant panel.
//!
//! Turns are append-only and insertion order is both the display order and
//! the order replayed to the provider. While an exchange is active the
//! session is busy and refuses new sends; a streamed exchange additionally
//! owns a single pending assistant turn whose text is rewritten in place as
//! fragments arrive.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::api::provider::{HistoryRole, HistoryTurn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub id: Uuid,
    pub role: TurnRole,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub pending: bool,
    pub images: Vec<String>,
}

impl ChatTurn {
    fn new(role: TurnRole, text: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            text: text.to_string(),
            created_at: Utc::now(),
            pending: false,
            images: Vec::new(),
        }
    }

    pub fn user(text: &str) -> Self {
        Self::new(TurnRole::User, text)
    }

    pub fn assistant(text: &str) -> Self {
        Self::new(TurnRole::Assistant, text)
    }
}

/// Snapshot handed to the provider when a streamed exchange starts: the
/// turns from before the new user message, and the id of the placeholder
/// turn the reply streams into.
pub struct StreamedExchange {
    pub prior_turns: Vec<HistoryTurn>,
    pub pending_turn_id: Uuid,
}

pub struct ChatSession {
    turns: Vec<ChatTurn>,
    busy: bool,
}

impl ChatSession {
    pub fn with_greeting(greeting: &str) -> Self {
        Self {
            turns: vec![ChatTurn::assistant(greeting)],
            busy: false,
        }
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Append the user's turn and mark the session busy. Returns false
    /// without touching the session while an exchange is still active.
    pub fn begin_exchange(&mut self, user_text: &str) -> bool {
        if self.busy {
            return false;
        }
        self.busy = true;
        self.turns.push(ChatTurn::user(user_text));
        true
    }

    /// Streamed variant of [`Self::begin_exchange`]: also appends an empty
    /// pending assistant turn for the reply to stream into, and captures
    /// the provider history from before the user turn landed.
    pub fn begin_streamed_exchange(&mut self, user_text: &str) -> Option<StreamedExchange> {
        if self.busy {
            return None;
        }
        let prior_turns = self.provider_history();
        self.busy = true;
        self.turns.push(ChatTurn::user(user_text));

        let mut placeholder = ChatTurn::assistant("");
        placeholder.pending = true;
        let pending_turn_id = placeholder.id;
        self.turns.push(placeholder);

        Some(StreamedExchange {
            prior_turns,
            pending_turn_id,
        })
    }

    /// Rewrite the in-flight turn's text with the latest accumulated
    /// snapshot. The first rewrite clears the turn's pending marker.
    pub fn update_streaming_turn(&mut self, turn_id: Uuid, full_text: &str) {
        if let Some(turn) = self.turn_mut(turn_id) {
            turn.text = full_text.to_string();
            turn.pending = false;
        }
    }

    /// The stream closed normally; the turn keeps its accumulated text.
    pub fn finish_streamed_exchange(&mut self, turn_id: Uuid) {
        if let Some(turn) = self.turn_mut(turn_id) {
            turn.pending = false;
        }
        self.busy = false;
    }

    /// The stream failed partway; the failure text replaces whatever had
    /// accumulated on the turn.
    pub fn fail_streamed_exchange(&mut self, turn_id: Uuid, failure_text: &str) {
        if let Some(turn) = self.turn_mut(turn_id) {
            turn.text = failure_text.to_string();
            turn.pending = false;
        }
        self.busy = false;
    }

    /// Whole-reply completion for exchanges that do not stream.
    pub fn finish_with_reply(&mut self, text: &str, images: Vec<String>) {
        let mut turn = ChatTurn::assistant(text);
        turn.images = images;
        self.turns.push(turn);
        self.busy = false;
    }

    /// Turns as the provider sees them: system and still-pending turns are
    /// dropped, the rest map onto user/model roles in order.
    fn provider_history(&self) -> Vec<HistoryTurn> {
        self.turns
            .iter()
            .filter(|turn| turn.role != TurnRole::System && !turn.pending)
            .map(|turn| HistoryTurn {
                role: match turn.role {
                    TurnRole::User => HistoryRole::User,
                    _ => HistoryRole::Model,
                },
                text: turn.text.clone(),
            })
            .collect()
    }

    fn turn_mut(&mut self, turn_id: Uuid) -> Option<&mut ChatTurn> {
        self.turns.iter_mut().find(|turn| turn.id == turn_id)
    }

    #[cfg(test)]
    pub fn push_system_note(&mut self, text: &str) {
        self.turns.push(ChatTurn::new(TurnRole::System, text));
    }
}
