//! Conversation turns and the ordered transcript

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Content prefixes of the synthetic turns used to seed assessment context
pub const PRIMING_PREFIXES: [&str; 2] = ["Start an MCQ quiz on:", "Start a Q&A test on:"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One message of the conversation.
///
/// A reply being streamed is `Streaming`; it collapses to `Sealed` when the
/// stream ends, whether it completed or failed part-way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Turn {
    Sealed { role: Role, content: String },
    Streaming { content: String },
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Turn::Sealed {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Turn::Sealed {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Turn::Sealed { role, .. } => *role,
            Turn::Streaming { .. } => Role::Assistant,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Turn::Sealed { content, .. } | Turn::Streaming { content } => content,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Turn::Streaming { .. })
    }

    /// Synthetic turn that seeded an assessment, whichever side wrote it
    pub fn is_priming(&self) -> bool {
        PRIMING_PREFIXES
            .iter()
            .any(|prefix| self.content().starts_with(prefix))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TurnError {
    #[error("A reply is still streaming")]
    StreamInFlight,
    #[error("No reply is streaming")]
    NoOpenTurn,
}

/// Ordered turn sequence.
///
/// Append-only, except that the last turn may be open for streaming. At most
/// one turn is open and it is always the last element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn has_open_turn(&self) -> bool {
        self.turns.last().is_some_and(Turn::is_open)
    }

    /// Append a sealed turn
    pub fn push(&mut self, turn: Turn) -> Result<(), TurnError> {
        if self.has_open_turn() || turn.is_open() {
            return Err(TurnError::StreamInFlight);
        }
        self.turns.push(turn);
        Ok(())
    }

    /// Open an empty assistant turn at the end
    pub fn open(&mut self) -> Result<(), TurnError> {
        if self.has_open_turn() {
            return Err(TurnError::StreamInFlight);
        }
        self.turns.push(Turn::Streaming {
            content: String::new(),
        });
        Ok(())
    }

    /// Concatenate a fragment onto the open turn and return the updated turn
    pub fn append(&mut self, fragment: &str) -> Result<&Turn, TurnError> {
        let Some(Turn::Streaming { content }) = self.turns.last_mut() else {
            return Err(TurnError::NoOpenTurn);
        };
        content.push_str(fragment);
        self.turns.last().ok_or(TurnError::NoOpenTurn)
    }

    /// Seal the open turn, keeping whatever content it has
    pub fn seal(&mut self) -> Result<&Turn, TurnError> {
        let Some(last) = self.turns.last_mut() else {
            return Err(TurnError::NoOpenTurn);
        };
        let Turn::Streaming { content } = last else {
            return Err(TurnError::NoOpenTurn);
        };
        *last = Turn::assistant(std::mem::take(content));
        Ok(last)
    }

    /// Remove the open turn entirely
    pub fn discard_open(&mut self) -> Result<(), TurnError> {
        if !self.has_open_turn() {
            return Err(TurnError::NoOpenTurn);
        }
        self.turns.pop();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Most recent learner-written text, skipping priming turns
    pub fn last_user_text(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role() == Role::User && !t.is_priming())
            .map(Turn::content)
    }

    /// Turns shown to the learner. With a start index only turns from that
    /// index on are shown; otherwise priming turns are hidden.
    pub fn visible(&self, from: Option<usize>) -> Vec<&Turn> {
        match from {
            Some(start) => self.turns.iter().skip(start).collect(),
            None => self.turns.iter().filter(|t| !t.is_priming()).collect(),
        }
    }
}
