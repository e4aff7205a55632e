//! Pure mode transition function

use super::{ModeEffect, ModeEvent, ModeState};
use crate::quiz::AssessmentKind;
use thiserror::Error;

/// Result of a mode transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    pub new_state: ModeState,
    pub effects: Vec<ModeEffect>,
}

impl TransitionResult {
    pub fn new(state: ModeState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: ModeEffect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = ModeEffect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("An assessment request is already in flight")]
    AssessmentBusy,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function: same inputs, same outputs, no I/O.
pub fn transition(state: &ModeState, event: ModeEvent) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // Exit is always permitted and always clears the assessment
        (_, ModeEvent::ExitRequested) => Ok(TransitionResult::new(ModeState::Study)
            .with_effect(ModeEffect::ClearQuiz)
            .with_effect(ModeEffect::ClearReviewStart)),

        // ============================================================
        // Generation
        // ============================================================
        (ModeState::Study, ModeEvent::AssessmentRequested { kind }) => Ok(start_generating(kind)),

        // Another round of the same kind replaces the current one
        (
            ModeState::Active { kind: current } | ModeState::Reviewed { kind: current },
            ModeEvent::AssessmentRequested { kind },
        ) if *current == kind => Ok(start_generating(kind)),

        (ModeState::Generating { .. } | ModeState::Submitting { .. }, ModeEvent::AssessmentRequested { .. }) => {
            Err(TransitionError::AssessmentBusy)
        }

        (ModeState::Generating { kind: current }, ModeEvent::QuestionsReady { kind, count })
            if *current == kind =>
        {
            if count == 0 {
                Ok(TransitionResult::new(ModeState::Study).with_effects([
                    ModeEffect::ClearQuiz,
                    ModeEffect::ClearReviewStart,
                    ModeEffect::report(format!("No {kind} questions were generated")),
                ]))
            } else {
                Ok(TransitionResult::new(ModeState::Active { kind }))
            }
        }

        (ModeState::Generating { kind: current }, ModeEvent::GenerationFailed { kind, message })
            if *current == kind =>
        {
            Ok(TransitionResult::new(ModeState::Study).with_effects([
                ModeEffect::ClearQuiz,
                ModeEffect::ClearReviewStart,
                ModeEffect::report(format!("Failed to generate {kind} questions: {message}")),
            ]))
        }

        // ============================================================
        // Submission
        // ============================================================
        (ModeState::Active { kind }, ModeEvent::SubmitStarted) => {
            Ok(TransitionResult::new(ModeState::Submitting { kind: *kind }))
        }

        (ModeState::Submitting { kind }, ModeEvent::SubmitSucceeded) => {
            Ok(TransitionResult::new(ModeState::Reviewed { kind: *kind })
                .with_effect(ModeEffect::RefreshProfile))
        }

        // Answers stay in place for another attempt
        (ModeState::Submitting { kind }, ModeEvent::SubmitFailed { message }) => {
            Ok(TransitionResult::new(ModeState::Active { kind: *kind })
                .with_effect(ModeEffect::report(format!("Failed to submit answers: {message}"))))
        }

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {state:?} with event {event:?}"
        ))),
    }
}

fn start_generating(kind: AssessmentKind) -> TransitionResult {
    let result = TransitionResult::new(ModeState::Generating { kind }).with_effect(ModeEffect::ClearQuiz);
    match kind {
        AssessmentKind::Mcq => result.with_effect(ModeEffect::MarkReviewStart),
        AssessmentKind::Qa => result.with_effect(ModeEffect::ClearReviewStart),
    }
}
