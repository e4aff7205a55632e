//! One round of questions, the learner's answers, and their results

use super::QuizError;
use crate::api::{McqQuestion, QaQuestion};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Minimum trimmed length of a free-text answer, in characters
pub const MIN_QA_ANSWER_CHARS: usize = 50;

pub trait QuizQuestion {
    fn id(&self) -> &str;
}

impl QuizQuestion for McqQuestion {
    fn id(&self) -> &str {
        &self.id
    }
}

impl QuizQuestion for QaQuestion {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Whether a recorded answer is good enough to submit
pub trait QuizAnswer {
    fn is_complete(&self) -> bool;
}

/// Option index; any recorded choice counts
impl QuizAnswer for usize {
    fn is_complete(&self) -> bool {
        true
    }
}

impl QuizAnswer for String {
    fn is_complete(&self) -> bool {
        self.trim().chars().count() >= MIN_QA_ANSWER_CHARS
    }
}

/// Questions of one assessment with the pending answers and, once graded,
/// the results. Answers are frozen as soon as results are attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizRound<Q, A, R> {
    questions: Vec<Q>,
    answers: BTreeMap<String, A>,
    results: Option<BTreeMap<String, R>>,
}

impl<Q, A, R> QuizRound<Q, A, R>
where
    Q: QuizQuestion,
    A: QuizAnswer + Clone,
{
    pub fn new(questions: Vec<Q>) -> Self {
        Self {
            questions,
            answers: BTreeMap::new(),
            results: None,
        }
    }

    pub fn questions(&self) -> &[Q] {
        &self.questions
    }

    pub fn question(&self, question_id: &str) -> Option<&Q> {
        self.questions.iter().find(|q| q.id() == question_id)
    }

    pub fn answers(&self) -> &BTreeMap<String, A> {
        &self.answers
    }

    pub fn answer(&self, question_id: &str) -> Option<&A> {
        self.answers.get(question_id)
    }

    pub fn results(&self) -> Option<&BTreeMap<String, R>> {
        self.results.as_ref()
    }

    pub fn is_graded(&self) -> bool {
        self.results.is_some()
    }

    /// Record or overwrite the answer to one question
    pub fn record(&mut self, question_id: &str, answer: A) -> Result<(), QuizError> {
        if self.is_graded() {
            return Err(QuizError::AnswersLocked);
        }
        if self.question(question_id).is_none() {
            return Err(QuizError::UnknownQuestion(question_id.to_string()));
        }
        self.answers.insert(question_id.to_string(), answer);
        Ok(())
    }

    /// Ids of questions without a complete answer, in question order
    pub fn incomplete(&self) -> Vec<String> {
        self.questions
            .iter()
            .filter(|q| !self.answers.get(q.id()).is_some_and(|a| a.is_complete()))
            .map(|q| q.id().to_string())
            .collect()
    }

    /// Answers ready for batch submission
    pub fn submission(&self) -> Result<BTreeMap<String, A>, QuizError> {
        if self.is_graded() {
            return Err(QuizError::AnswersLocked);
        }
        let missing = self.incomplete();
        if !missing.is_empty() {
            return Err(QuizError::IncompleteAnswers { missing });
        }
        Ok(self
            .questions
            .iter()
            .filter_map(|q| {
                self.answers
                    .get(q.id())
                    .map(|a| (q.id().to_string(), a.clone()))
            })
            .collect())
    }

    /// Attach grading results and return the ids left ungraded, in question
    /// order. A result for an id outside the round rejects the whole batch.
    pub fn attach_results(
        &mut self,
        results: BTreeMap<String, R>,
    ) -> Result<Vec<String>, QuizError> {
        let unexpected: Vec<String> = results
            .keys()
            .filter(|id| self.question(id).is_none())
            .cloned()
            .collect();
        if !unexpected.is_empty() {
            return Err(QuizError::ResultMismatch { unexpected });
        }
        let ungraded = self
            .questions
            .iter()
            .filter(|q| !results.contains_key(q.id()))
            .map(|q| q.id().to_string())
            .collect();
        self.results = Some(results);
        Ok(ungraded)
    }
}
