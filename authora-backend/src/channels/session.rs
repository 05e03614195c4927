//! Operator session: the single pending-transaction slot and the rolling
//! conversation history fed to the intent parser.

use super::types::SentMessage;
use crate::ai::Message;
use rust_decimal::Decimal;
use std::collections::VecDeque;

/// Maximum number of turns kept in history
pub const HISTORY_LIMIT: usize = 10;

/// A fully resolved transfer waiting for approve / cancel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    pub to: String,
    pub amount: Decimal,
    pub from_wallet: String,
    /// Contact name, or the raw address when sent to one directly
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum SessionState {
    Idle,
    AwaitingConfirmation,
}

/// FIFO-bounded transcript; the oldest turns drop first
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    turns: VecDeque<Message>,
    limit: usize,
}

impl ConversationHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(limit + 1),
            limit,
        }
    }

    pub fn push(&mut self, message: Message) {
        self.turns.push_back(message);
        while self.turns.len() > self.limit {
            self.turns.pop_front();
        }
    }

    pub fn turns(&self) -> Vec<Message> {
        self.turns.iter().cloned().collect()
    }

}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(HISTORY_LIMIT)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    pending: Option<PendingTransaction>,
    /// Confirmation prompt showing the pending transfer
    prompt: Option<SentMessage>,
    pub history: ConversationHistory,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        if self.pending.is_some() {
            SessionState::AwaitingConfirmation
        } else {
            SessionState::Idle
        }
    }

    pub fn pending(&self) -> Option<&PendingTransaction> {
        self.pending.as_ref()
    }

    /// Stage a transfer, replacing whatever was pending. Returns the prompt
    /// of the replaced transfer, if any.
    pub fn stage(&mut self, tx: PendingTransaction, prompt: Option<SentMessage>) -> Option<SentMessage> {
        let replaced = match self.pending.replace(tx) {
            Some(_) => self.prompt.take(),
            None => None,
        };
        self.prompt = prompt;
        replaced
    }

    /// True when `origin` is a confirmation prompt other than the one showing
    /// the pending transfer
    pub fn is_superseded(&self, origin: Option<SentMessage>) -> bool {
        match (origin, self.prompt) {
            (Some(origin), Some(current)) => origin != current,
            _ => false,
        }
    }

    /// Remove and return the pending transfer; the slot is empty afterwards
    pub fn take_pending(&mut self) -> Option<PendingTransaction> {
        self.prompt = None;
        self.pending.take()
    }
}
