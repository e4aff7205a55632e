//! Effects produced by mode transitions

/// Work the session performs after a transition is applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeEffect {
    /// Drop questions, answers and results
    ClearQuiz,

    /// Best-effort learner profile fetch
    RefreshProfile,

    /// Surface a message to the learner
    ReportError { message: String },

    /// Remember the current transcript length as the start of the review view
    MarkReviewStart,

    ClearReviewStart,
}

impl ModeEffect {
    pub fn report(message: impl Into<String>) -> Self {
        ModeEffect::ReportError {
            message: message.into(),
        }
    }
}
