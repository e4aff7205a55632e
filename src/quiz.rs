//! Quiz lifecycle: generation, answer collection, batch submission, review

mod round;
pub mod scoring;

pub use round::{QuizAnswer, QuizQuestion, QuizRound, MIN_QA_ANSWER_CHARS};
pub use scoring::{qa_mean, McqScore, QaGrade};

use crate::api::{
    ApiError, BatchSubmitRequest, GenerateRequest, McqQuestion, McqResult, QaQuestion, QaResult,
    QuestionSize, TutorApi,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Topic used when the learner has no known concepts yet
pub const FALLBACK_TOPIC: &str = "General Study";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentKind {
    Mcq,
    Qa,
}

impl fmt::Display for AssessmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AssessmentKind::Mcq => "MCQ",
            AssessmentKind::Qa => "QA",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuizError {
    #[error("No assessment is active")]
    NoActiveQuiz,
    #[error("Expected a {expected} answer but the active assessment is {actual}")]
    WrongKind {
        expected: AssessmentKind,
        actual: AssessmentKind,
    },
    #[error("Unknown question: {0}")]
    UnknownQuestion(String),
    #[error("Option {option} is out of range for question {question_id} ({options} options)")]
    OptionOutOfRange {
        question_id: String,
        option: usize,
        options: usize,
    },
    #[error("Answers are locked once results are in")]
    AnswersLocked,
    #[error("{} question(s) still need a complete answer", .missing.len())]
    IncompleteAnswers { missing: Vec<String> },
    #[error("Question count must be at least 1")]
    InvalidCount,
    #[error("No questions were generated")]
    NoQuestions,
    #[error("Results name {} question(s) outside this round", .unexpected.len())]
    ResultMismatch { unexpected: Vec<String> },
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// What to ask the question generator for
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationPlan {
    pub kind: AssessmentKind,
    pub topics: Vec<String>,
    pub count: u32,
    /// Only used for Q&A
    pub size: QuestionSize,
    pub focus: Option<String>,
}

impl GenerationPlan {
    fn request(&self, user_id: &str) -> Result<GenerateRequest, QuizError> {
        if self.count < 1 {
            return Err(QuizError::InvalidCount);
        }
        let topics = if self.topics.is_empty() {
            vec![FALLBACK_TOPIC.to_string()]
        } else {
            self.topics.clone()
        };
        Ok(GenerateRequest {
            user_id: user_id.to_string(),
            topics,
            count: self.count,
            size: match self.kind {
                AssessmentKind::Mcq => None,
                AssessmentKind::Qa => Some(self.size),
            },
            query: self.focus.clone(),
        })
    }
}

pub type McqRound = QuizRound<McqQuestion, usize, McqResult>;
pub type QaRound = QuizRound<QaQuestion, String, QaResult>;

/// The assessment currently in progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActiveQuiz {
    Mcq(McqRound),
    Qa(QaRound),
}

impl ActiveQuiz {
    pub fn kind(&self) -> AssessmentKind {
        match self {
            ActiveQuiz::Mcq(_) => AssessmentKind::Mcq,
            ActiveQuiz::Qa(_) => AssessmentKind::Qa,
        }
    }

    pub fn question_count(&self) -> usize {
        match self {
            ActiveQuiz::Mcq(round) => round.questions().len(),
            ActiveQuiz::Qa(round) => round.questions().len(),
        }
    }

    pub fn question_ids(&self) -> Vec<&str> {
        match self {
            ActiveQuiz::Mcq(round) => round.questions().iter().map(|q| q.id.as_str()).collect(),
            ActiveQuiz::Qa(round) => round.questions().iter().map(|q| q.id.as_str()).collect(),
        }
    }

    pub fn is_graded(&self) -> bool {
        match self {
            ActiveQuiz::Mcq(round) => round.is_graded(),
            ActiveQuiz::Qa(round) => round.is_graded(),
        }
    }

    pub fn incomplete(&self) -> Vec<String> {
        match self {
            ActiveQuiz::Mcq(round) => round.incomplete(),
            ActiveQuiz::Qa(round) => round.incomplete(),
        }
    }
}

/// Graded outcome of a submission
#[derive(Debug, Clone, PartialEq)]
pub enum QuizReport {
    Mcq {
        results: BTreeMap<String, McqResult>,
        score: McqScore,
    },
    Qa {
        results: BTreeMap<String, QaResult>,
        mean: f64,
        grade: QaGrade,
    },
}

/// Owns the active assessment's questions, pending answers and results.
/// Everything is dropped when the session returns to study mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuizController {
    quiz: Option<ActiveQuiz>,
}

impl QuizController {
    pub fn active(&self) -> Option<&ActiveQuiz> {
        self.quiz.as_ref()
    }

    pub fn kind(&self) -> Option<AssessmentKind> {
        self.quiz.as_ref().map(ActiveQuiz::kind)
    }

    pub fn is_empty(&self) -> bool {
        self.quiz.is_none()
    }

    pub fn clear(&mut self) {
        self.quiz = None;
    }

    /// Ask the remote generator for a round of questions.
    /// Returns the number of questions on success.
    pub async fn generate<A: TutorApi + ?Sized>(
        &mut self,
        api: &A,
        user_id: &str,
        plan: &GenerationPlan,
    ) -> Result<usize, QuizError> {
        self.clear();
        let request = plan.request(user_id)?;

        tracing::info!(
            kind = %plan.kind,
            topics = ?request.topics,
            count = request.count,
            focused = request.query.is_some(),
            "Generating assessment"
        );

        let quiz = match plan.kind {
            AssessmentKind::Mcq => {
                let questions = api.generate_mcq(&request).await?;
                ActiveQuiz::Mcq(QuizRound::new(questions))
            }
            AssessmentKind::Qa => {
                let questions = api.generate_qa(&request).await?;
                ActiveQuiz::Qa(QuizRound::new(questions))
            }
        };

        let count = quiz.question_count();
        if count == 0 {
            return Err(QuizError::NoQuestions);
        }
        self.quiz = Some(quiz);
        Ok(count)
    }

    pub fn record_option(&mut self, question_id: &str, option: usize) -> Result<(), QuizError> {
        match self.quiz.as_mut() {
            Some(ActiveQuiz::Mcq(round)) => {
                let options = round
                    .question(question_id)
                    .map(|q| q.options.len())
                    .ok_or_else(|| QuizError::UnknownQuestion(question_id.to_string()))?;
                if option >= options {
                    return Err(QuizError::OptionOutOfRange {
                        question_id: question_id.to_string(),
                        option,
                        options,
                    });
                }
                round.record(question_id, option)
            }
            Some(ActiveQuiz::Qa(_)) => Err(QuizError::WrongKind {
                expected: AssessmentKind::Mcq,
                actual: AssessmentKind::Qa,
            }),
            None => Err(QuizError::NoActiveQuiz),
        }
    }

    pub fn record_text(&mut self, question_id: &str, text: impl Into<String>) -> Result<(), QuizError> {
        match self.quiz.as_mut() {
            Some(ActiveQuiz::Qa(round)) => round.record(question_id, text.into()),
            Some(ActiveQuiz::Mcq(_)) => Err(QuizError::WrongKind {
                expected: AssessmentKind::Qa,
                actual: AssessmentKind::Mcq,
            }),
            None => Err(QuizError::NoActiveQuiz),
        }
    }

    /// Local submission precondition; no network involved
    pub fn check_ready(&self) -> Result<(), QuizError> {
        match self.quiz.as_ref() {
            Some(ActiveQuiz::Mcq(round)) => round.submission().map(|_| ()),
            Some(ActiveQuiz::Qa(round)) => round.submission().map(|_| ()),
            None => Err(QuizError::NoActiveQuiz),
        }
    }

    /// Submit every answer in one batch and attach the results.
    /// On failure the answers stay in place for a resubmission.
    pub async fn submit<A: TutorApi + ?Sized>(
        &mut self,
        api: &A,
        user_id: &str,
    ) -> Result<QuizReport, QuizError> {
        match self.quiz.as_mut() {
            Some(ActiveQuiz::Mcq(round)) => {
                let request = BatchSubmitRequest {
                    user_id: user_id.to_string(),
                    answers: round.submission()?,
                };
                let results = api.submit_mcq(&request).await?;
                log_ungraded(&round.attach_results(results.clone())?);
                let score = McqScore::from_results(&results, round.questions().len());
                tracing::info!(%score, percentage = score.percentage(), "MCQ batch graded");
                Ok(QuizReport::Mcq { results, score })
            }
            Some(ActiveQuiz::Qa(round)) => {
                let request = BatchSubmitRequest {
                    user_id: user_id.to_string(),
                    answers: round.submission()?,
                };
                let results = api.submit_qa(&request).await?;
                log_ungraded(&round.attach_results(results.clone())?);
                let mean = qa_mean(&results);
                let grade = QaGrade::from_mean(mean);
                tracing::info!(mean, %grade, "QA batch graded");
                Ok(QuizReport::Qa {
                    results,
                    mean,
                    grade,
                })
            }
            None => Err(QuizError::NoActiveQuiz),
        }
    }
}

/// Ungraded questions count against the MCQ score and are left out of the
/// QA mean
fn log_ungraded(ungraded: &[String]) {
    if !ungraded.is_empty() {
        tracing::warn!(count = ungraded.len(), ids = ?ungraded, "Service left questions ungraded");
    }
}
