//! Score presentation for graded assessments

use crate::api::{McqResult, QaResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Correct answers out of the questions asked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct McqScore {
    pub correct: usize,
    pub total: usize,
}

impl McqScore {
    pub fn from_results(results: &BTreeMap<String, McqResult>, total_questions: usize) -> Self {
        Self {
            correct: results.values().filter(|r| r.is_correct).count(),
            total: total_questions,
        }
    }

    /// Percentage rounded to two decimals
    #[allow(clippy::cast_precision_loss)] // question counts are tiny
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        round2(self.correct as f64 / self.total as f64 * 100.0)
    }
}

impl fmt::Display for McqScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.correct, self.total)
    }
}

/// Overall Q&A grade bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QaGrade {
    EliteScholar,
    AdvancedLearner,
    Competent,
    FoundationBuilding,
}

impl QaGrade {
    /// Bucket for a mean total score; lower bounds are inclusive
    pub fn from_mean(mean: f64) -> Self {
        if mean >= 8.5 {
            QaGrade::EliteScholar
        } else if mean >= 7.0 {
            QaGrade::AdvancedLearner
        } else if mean >= 4.0 {
            QaGrade::Competent
        } else {
            QaGrade::FoundationBuilding
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QaGrade::EliteScholar => "Elite Scholar",
            QaGrade::AdvancedLearner => "Advanced Learner",
            QaGrade::Competent => "Competent",
            QaGrade::FoundationBuilding => "Foundation Building",
        }
    }
}

impl fmt::Display for QaGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Mean `total_score` across all results
#[allow(clippy::cast_precision_loss)]
pub fn qa_mean(results: &BTreeMap<String, QaResult>) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let total: f64 = results.values().map(|r| r.total_score).sum();
    total / results.len() as f64
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
