//! Mock tutoring service for testing
//!
//! Every operation pops its next scripted response from a queue and every
//! call is recorded, so tests can assert on what reached the "network".

use crate::api::{
    ApiError, BatchSubmitRequest, ChatRequest, ChunkStream, GenerateRequest, LearnerProfile,
    McqQuestion, McqResult, QaQuestion, QaResult, ResetAck, RevisionMaterial, RevisionRequest,
    SessionHistoryEntry, TutorApi, UploadAck, UploadFile,
};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

// ============================================================================
// Recorded calls
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    StreamChat(ChatRequest),
    History(String),
    Profile(String),
    Reset(String),
    GenerateMcq(GenerateRequest),
    SubmitMcq(BatchSubmitRequest<usize>),
    GenerateQa(GenerateRequest),
    SubmitQa(BatchSubmitRequest<String>),
    Revision(RevisionRequest),
    Upload { user_id: String, name: String },
}

type Queue<T> = Mutex<VecDeque<Result<T, ApiError>>>;

fn pop<T>(queue: &Queue<T>) -> Result<T, ApiError> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(ApiError::network("No mock response queued")))
}

// ============================================================================
// Mock Tutor API
// ============================================================================

/// Mock tutoring service that returns queued responses
#[derive(Default)]
pub struct MockTutorApi {
    streams: Queue<ChunkStream>,
    history: Queue<Vec<SessionHistoryEntry>>,
    profiles: Queue<LearnerProfile>,
    resets: Queue<ResetAck>,
    mcq_questions: Queue<Vec<McqQuestion>>,
    mcq_results: Queue<BTreeMap<String, McqResult>>,
    qa_questions: Queue<Vec<QaQuestion>>,
    qa_results: Queue<BTreeMap<String, QaResult>>,
    revisions: Queue<RevisionMaterial>,
    uploads: Queue<UploadAck>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockTutorApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply stream that yields `items` and then ends
    pub fn queue_stream(&self, items: Vec<Result<&str, ApiError>>) {
        let items: Vec<Result<String, ApiError>> =
            items.into_iter().map(|r| r.map(str::to_string)).collect();
        self.streams
            .lock()
            .unwrap()
            .push_back(Ok(Box::pin(stream::iter(items))));
    }

    /// Queue a reply stream that yields `fragments` and then never ends
    pub fn queue_hanging_stream(&self, fragments: &[&str]) {
        let items: Vec<Result<String, ApiError>> =
            fragments.iter().map(|f| Ok((*f).to_string())).collect();
        self.streams
            .lock()
            .unwrap()
            .push_back(Ok(Box::pin(stream::iter(items).chain(stream::pending()))));
    }

    /// Queue a failure to open the reply stream
    pub fn queue_stream_error(&self, error: ApiError) {
        self.streams.lock().unwrap().push_back(Err(error));
    }

    pub fn queue_history(&self, response: Result<Vec<SessionHistoryEntry>, ApiError>) {
        self.history.lock().unwrap().push_back(response);
    }

    pub fn queue_profile(&self, response: Result<LearnerProfile, ApiError>) {
        self.profiles.lock().unwrap().push_back(response);
    }

    pub fn queue_reset(&self, response: Result<ResetAck, ApiError>) {
        self.resets.lock().unwrap().push_back(response);
    }

    pub fn queue_mcq_questions(&self, response: Result<Vec<McqQuestion>, ApiError>) {
        self.mcq_questions.lock().unwrap().push_back(response);
    }

    pub fn queue_mcq_results(&self, response: Result<BTreeMap<String, McqResult>, ApiError>) {
        self.mcq_results.lock().unwrap().push_back(response);
    }

    pub fn queue_qa_questions(&self, response: Result<Vec<QaQuestion>, ApiError>) {
        self.qa_questions.lock().unwrap().push_back(response);
    }

    pub fn queue_qa_results(&self, response: Result<BTreeMap<String, QaResult>, ApiError>) {
        self.qa_results.lock().unwrap().push_back(response);
    }

    pub fn queue_revision(&self, response: Result<RevisionMaterial, ApiError>) {
        self.revisions.lock().unwrap().push_back(response);
    }

    pub fn queue_upload(&self, response: Result<UploadAck, ApiError>) {
        self.uploads.lock().unwrap().push_back(response);
    }

    /// Get recorded calls
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl TutorApi for MockTutorApi {
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChunkStream, ApiError> {
        self.record(MockCall::StreamChat(request.clone()));
        pop(&self.streams)
    }

    async fn history(&self, user_id: &str) -> Result<Vec<SessionHistoryEntry>, ApiError> {
        self.record(MockCall::History(user_id.to_string()));
        pop(&self.history)
    }

    async fn profile(&self, user_id: &str) -> Result<LearnerProfile, ApiError> {
        self.record(MockCall::Profile(user_id.to_string()));
        pop(&self.profiles)
    }

    async fn reset(&self, user_id: &str) -> Result<ResetAck, ApiError> {
        self.record(MockCall::Reset(user_id.to_string()));
        pop(&self.resets)
    }

    async fn generate_mcq(&self, request: &GenerateRequest) -> Result<Vec<McqQuestion>, ApiError> {
        self.record(MockCall::GenerateMcq(request.clone()));
        pop(&self.mcq_questions)
    }

    async fn submit_mcq(
        &self,
        request: &BatchSubmitRequest<usize>,
    ) -> Result<BTreeMap<String, McqResult>, ApiError> {
        self.record(MockCall::SubmitMcq(request.clone()));
        pop(&self.mcq_results)
    }

    async fn generate_qa(&self, request: &GenerateRequest) -> Result<Vec<QaQuestion>, ApiError> {
        self.record(MockCall::GenerateQa(request.clone()));
        pop(&self.qa_questions)
    }

    async fn submit_qa(
        &self,
        request: &BatchSubmitRequest<String>,
    ) -> Result<BTreeMap<String, QaResult>, ApiError> {
        self.record(MockCall::SubmitQa(request.clone()));
        pop(&self.qa_results)
    }

    async fn revision(&self, request: &RevisionRequest) -> Result<RevisionMaterial, ApiError> {
        self.record(MockCall::Revision(request.clone()));
        pop(&self.revisions)
    }

    async fn upload(&self, user_id: &str, file: &UploadFile) -> Result<UploadAck, ApiError> {
        self.record(MockCall::Upload {
            user_id: user_id.to_string(),
            name: file.name.clone(),
        });
        pop(&self.uploads)
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn mcq_question(id: &str) -> McqQuestion {
    McqQuestion {
        id: id.to_string(),
        prompt: format!("Question {id}"),
        options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
        correct_option: None,
        explanation: None,
        topic: None,
    }
}

pub fn qa_question(id: &str) -> QaQuestion {
    QaQuestion {
        id: id.to_string(),
        prompt: format!("Explain {id}"),
        suggested_key_points: None,
        topic: None,
    }
}

pub fn mcq_result(is_correct: bool) -> McqResult {
    McqResult {
        is_correct,
        correct_option: 0,
        explanation: String::new(),
    }
}

pub fn qa_result(total_score: f64) -> QaResult {
    QaResult {
        correctness_score: total_score,
        completeness_score: total_score,
        clarity_score: total_score,
        total_score,
        feedback: "Solid answer".to_string(),
    }
}

pub fn profile_with(known_concepts: &[&str], weak_areas: &[&str]) -> LearnerProfile {
    LearnerProfile {
        knowledge_level: "Beginner".to_string(),
        known_concepts: known_concepts.iter().map(ToString::to_string).collect(),
        weak_areas: weak_areas.iter().map(ToString::to_string).collect(),
        ..LearnerProfile::default()
    }
}
