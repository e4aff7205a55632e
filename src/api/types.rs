//! Wire types for the tutoring service

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

// ============================================================================
// Chat
// ============================================================================

/// Request for an assistant reply
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub message: String,
    pub session_id: String,
    pub stream: bool,
}

// ============================================================================
// Learner profile
// ============================================================================

/// Latest known state of the learner, replaced wholesale on every fetch
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LearnerProfile {
    #[serde(default)]
    pub knowledge_level: String,
    #[serde(default)]
    pub known_concepts: Vec<String>,
    #[serde(default)]
    pub weak_areas: Vec<String>,
    #[serde(default)]
    pub confidence_score: f64,
    #[serde(default)]
    pub explanation_preference: String,
    #[serde(default)]
    pub topic_mastery: BTreeMap<String, f64>,
    #[serde(default)]
    pub topics: BTreeMap<String, TopicState>,
    #[serde(default)]
    pub current_session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicState {
    #[serde(rename = "topic_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mastery: f64,
    #[serde(default)]
    pub attempted: u32,
    /// Partial credit makes this fractional
    #[serde(default)]
    pub correct: f64,
    #[serde(default)]
    pub status: String,
    #[serde(default, rename = "last_assessed")]
    pub last_assessed_at: Option<NaiveDateTime>,
}

// ============================================================================
// History
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: String,
    pub content: String,
    pub timestamp: NaiveDateTime,
}

/// Read-only snapshot of a past session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHistoryEntry {
    pub session_id: String,
    pub user_id: String,
    #[serde(rename = "messages", default)]
    pub turns: Vec<HistoryTurn>,
    #[serde(default)]
    pub mastered_concepts: Vec<String>,
    #[serde(default)]
    pub weak_areas: Vec<String>,
    #[serde(default)]
    pub topic_mastery: BTreeMap<String, f64>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResetAck {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
}

// ============================================================================
// Assessments
// ============================================================================

/// Expected answer length for Q&A questions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionSize {
    Short,
    #[default]
    Medium,
    Long,
}

impl fmt::Display for QuestionSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QuestionSize::Short => "short",
            QuestionSize::Medium => "medium",
            QuestionSize::Long => "long",
        })
    }
}

impl FromStr for QuestionSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short" => Ok(QuestionSize::Short),
            "medium" => Ok(QuestionSize::Medium),
            "long" => Ok(QuestionSize::Long),
            other => Err(format!("unknown question size: {other}")),
        }
    }
}

/// Request to generate a batch of questions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateRequest {
    pub user_id: String,
    pub topics: Vec<String>,
    pub count: u32,
    /// Only sent for Q&A generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<QuestionSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

/// Multiple-choice question. The correct answer is withheld until grading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McqQuestion {
    pub id: String,
    #[serde(rename = "question")]
    pub prompt: String,
    pub options: Vec<String>,
    #[serde(default, rename = "correct_answer")]
    pub correct_option: Option<usize>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McqResult {
    pub is_correct: bool,
    pub correct_option: usize,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaQuestion {
    pub id: String,
    #[serde(rename = "question")]
    pub prompt: String,
    #[serde(default, rename = "suggested_answer_key_points")]
    pub suggested_key_points: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaResult {
    #[serde(default)]
    pub correctness_score: f64,
    #[serde(default)]
    pub completeness_score: f64,
    #[serde(default)]
    pub clarity_score: f64,
    #[serde(default)]
    pub total_score: f64,
    #[serde(default)]
    pub feedback: String,
}

/// Batch of answers keyed by question id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSubmitRequest<A> {
    pub user_id: String,
    pub answers: BTreeMap<String, A>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevisionRequest {
    pub user_id: String,
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RevisionMaterial {
    pub revision_material: String,
}

// ============================================================================
// Upload
// ============================================================================

/// File handed to the ingestion endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file from disk, naming it after its final path component
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self { name, bytes })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct UploadAck {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub content_length: usize,
}
