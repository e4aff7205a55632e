//! Property-based tests for the mode state machine
//!
//! These tests verify key invariants hold across arbitrary event sequences.

use super::*;
use crate::quiz::AssessmentKind;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_kind() -> impl Strategy<Value = AssessmentKind> {
    prop_oneof![Just(AssessmentKind::Mcq), Just(AssessmentKind::Qa)]
}

fn arb_state() -> impl Strategy<Value = ModeState> {
    prop_oneof![
        Just(ModeState::Study),
        arb_kind().prop_map(|kind| ModeState::Generating { kind }),
        arb_kind().prop_map(|kind| ModeState::Active { kind }),
        arb_kind().prop_map(|kind| ModeState::Submitting { kind }),
        arb_kind().prop_map(|kind| ModeState::Reviewed { kind }),
    ]
}

fn arb_event() -> impl Strategy<Value = ModeEvent> {
    prop_oneof![
        arb_kind().prop_map(|kind| ModeEvent::AssessmentRequested { kind }),
        (arb_kind(), 0usize..8).prop_map(|(kind, count)| ModeEvent::QuestionsReady { kind, count }),
        (arb_kind(), "[a-z ]{0,20}")
            .prop_map(|(kind, message)| ModeEvent::GenerationFailed { kind, message }),
        Just(ModeEvent::SubmitStarted),
        Just(ModeEvent::SubmitSucceeded),
        "[a-z ]{0,20}".prop_map(|message| ModeEvent::SubmitFailed { message }),
        Just(ModeEvent::ExitRequested),
    ]
}

/// Apply events in order, skipping rejected ones. Returns visited states.
fn run(events: Vec<ModeEvent>) -> Vec<ModeState> {
    let mut state = ModeState::Study;
    let mut visited = vec![state];
    for event in events {
        if let Ok(result) = transition(&state, event) {
            state = result.new_state;
            visited.push(state);
        }
    }
    visited
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_kind_never_switches_without_study(events in prop::collection::vec(arb_event(), 0..40)) {
        let visited = run(events);
        for pair in visited.windows(2) {
            if let (Some(before), Some(after)) = (pair[0].kind(), pair[1].kind()) {
                prop_assert_eq!(before, after, "{:?} -> {:?}", pair[0], pair[1]);
            }
        }
    }

    #[test]
    fn prop_exit_always_returns_to_study(state in arb_state()) {
        let result = transition(&state, ModeEvent::ExitRequested).unwrap();
        prop_assert_eq!(result.new_state, ModeState::Study);
        prop_assert!(result.effects.contains(&ModeEffect::ClearQuiz));
    }

    #[test]
    fn prop_failed_generation_ends_in_study(kind in arb_kind(), message in "[a-z ]{0,20}") {
        let started = transition(&ModeState::Study, ModeEvent::AssessmentRequested { kind }).unwrap();
        let failed = transition(
            &started.new_state,
            ModeEvent::GenerationFailed { kind, message },
        )
        .unwrap();
        prop_assert_eq!(failed.new_state, ModeState::Study);
    }

    #[test]
    fn prop_busy_states_only_accept_their_outcome(state in arb_state(), event in arb_event()) {
        prop_assume!(state.is_busy());
        let is_request = matches!(event, ModeEvent::AssessmentRequested { .. });
        let result = transition(&state, event);
        if is_request {
            prop_assert_eq!(result, Err(TransitionError::AssessmentBusy));
        }
    }

    #[test]
    fn prop_reviewed_only_after_submitting(state in arb_state(), event in arb_event()) {
        if let Ok(result) = transition(&state, event) {
            if matches!(result.new_state, ModeState::Reviewed { .. }) {
                let was_submitting = matches!(state, ModeState::Submitting { .. });
                prop_assert!(was_submitting, "entered review from {:?}", state);
            }
        }
    }

    #[test]
    fn prop_leaving_an_assessment_clears_quiz(state in arb_state(), event in arb_event()) {
        prop_assume!(state != ModeState::Study);
        if let Ok(result) = transition(&state, event) {
            if result.new_state == ModeState::Study {
                prop_assert!(result.effects.contains(&ModeEffect::ClearQuiz));
            }
        }
    }
}
