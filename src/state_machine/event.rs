//! Events that drive mode transitions

use crate::quiz::AssessmentKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeEvent {
    /// Learner asked for an assessment
    AssessmentRequested { kind: AssessmentKind },

    /// Generator returned `count` questions
    QuestionsReady { kind: AssessmentKind, count: usize },

    GenerationFailed {
        kind: AssessmentKind,
        message: String,
    },

    /// Batch submission sent
    SubmitStarted,

    SubmitSucceeded,

    SubmitFailed { message: String },

    /// Learner left the assessment, or the session was reset
    ExitRequested,
}
