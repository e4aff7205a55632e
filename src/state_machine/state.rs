//! Session mode states

use crate::quiz::AssessmentKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse mode shown to the learner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    #[default]
    Study,
    Mcq,
    Qa,
}

impl From<AssessmentKind> for SessionMode {
    fn from(kind: AssessmentKind) -> Self {
        match kind {
            AssessmentKind::Mcq => SessionMode::Mcq,
            AssessmentKind::Qa => SessionMode::Qa,
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionMode::Study => "study",
            SessionMode::Mcq => "mcq",
            SessionMode::Qa => "qa",
        })
    }
}

/// Where the session is in the assessment lifecycle.
///
/// Every assessment state carries its kind, so switching from one kind to
/// the other always passes through `Study`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModeState {
    /// Free conversation
    #[default]
    Study,

    /// Questions requested, waiting for the generator
    Generating { kind: AssessmentKind },

    /// Questions on screen, answers being collected
    Active { kind: AssessmentKind },

    /// Batch submission in flight
    Submitting { kind: AssessmentKind },

    /// Results attached and on screen
    Reviewed { kind: AssessmentKind },
}

impl ModeState {
    pub fn kind(&self) -> Option<AssessmentKind> {
        match self {
            ModeState::Study => None,
            ModeState::Generating { kind }
            | ModeState::Active { kind }
            | ModeState::Submitting { kind }
            | ModeState::Reviewed { kind } => Some(*kind),
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.kind().map_or(SessionMode::Study, SessionMode::from)
    }

    /// A remote assessment call is in flight
    pub fn is_busy(&self) -> bool {
        matches!(self, ModeState::Generating { .. } | ModeState::Submitting { .. })
    }

    pub fn accepts_answers(&self) -> bool {
        matches!(self, ModeState::Active { .. })
    }
}
