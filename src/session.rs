//! Session orchestrator
//!
//! Owns the transcript and the active mode, and wires the streaming
//! assembler, the quiz controller and the profile cache together. Every
//! operation takes `&mut self`: one logical thread of control per session.

mod assembler;
mod error;
mod profile;
mod turn;

pub use assembler::{AssemblyError, StreamAssembler, StreamFailure, StreamSummary};
pub use error::{SessionError, TIMEOUT_MESSAGE};
pub use profile::ProfileCache;
pub use turn::{Role, Transcript, Turn, TurnError, PRIMING_PREFIXES};

use crate::api::{
    ChatRequest, LearnerProfile, ResetAck, RevisionRequest, SessionHistoryEntry, TutorApi,
    UploadAck, UploadFile,
};
use crate::config::ClientConfig;
use crate::quiz::{AssessmentKind, GenerationPlan, QuizController, QuizError, QuizReport};
use crate::state_machine::{transition, ModeEffect, ModeEvent, ModeState, SessionMode};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Everything a session knows, as one serializable value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub transcript: Transcript,
    pub mode: ModeState,
    pub quiz: QuizController,
    pub profile: ProfileCache,
    /// Past session snapshots, loaded on demand
    pub history: Vec<SessionHistoryEntry>,
    /// Transcript index the MCQ review view starts from
    pub review_start: Option<usize>,
    /// Name of the uploaded file the conversation is grounded in
    pub grounded_file: Option<String>,
    pub last_error: Option<String>,
    /// Text of the last send that failed, kept for retry
    pub failed_message: Option<String>,
}

pub struct Session<A> {
    api: A,
    config: ClientConfig,
    state: SessionState,
    assembler: StreamAssembler,
    cancel: CancellationToken,
}

impl<A: TutorApi> Session<A> {
    pub fn new(api: A, config: ClientConfig) -> Self {
        Self::from_state(api, config, SessionState::default())
    }

    /// Resume from a previously captured state
    pub fn from_state(api: A, config: ClientConfig, state: SessionState) -> Self {
        let assembler = StreamAssembler::new(config.stream_timeout);
        Self {
            api,
            config,
            state,
            assembler,
            cancel: CancellationToken::new(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn into_state(self) -> SessionState {
        self.state
    }

    pub fn mode(&self) -> SessionMode {
        self.state.mode.mode()
    }

    pub fn profile(&self) -> Option<&LearnerProfile> {
        self.state.profile.current()
    }

    pub fn history(&self) -> &[SessionHistoryEntry] {
        &self.state.history
    }

    pub fn grounded_file(&self) -> Option<&str> {
        self.state.grounded_file.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.state.last_error.as_deref()
    }

    /// Token that cancels the reply currently streaming.
    /// A fresh token is installed after every cancellation.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    // ========================================================================
    // Conversation
    // ========================================================================

    pub async fn send_message(&mut self, text: &str) -> Result<StreamSummary, SessionError> {
        self.send_message_with(text, |_, _| {}).await
    }

    /// Send a learner message and stream the reply. `on_update` sees every
    /// fragment together with the reply assembled so far.
    pub async fn send_message_with<F>(
        &mut self,
        text: &str,
        on_update: F,
    ) -> Result<StreamSummary, SessionError>
    where
        F: FnMut(&str, &Turn),
    {
        self.state.transcript.push(Turn::user(text))?;
        self.stream_reply(text, on_update).await
    }

    /// Resubmit the text of the last failed send. The learner turn is reused
    /// when nothing was appended after it.
    pub async fn retry_last(&mut self) -> Result<StreamSummary, SessionError> {
        let text = self
            .state
            .failed_message
            .clone()
            .ok_or(SessionError::NothingToRetry)?;

        let reuse = self
            .state
            .transcript
            .last()
            .is_some_and(|turn| turn.role() == Role::User && turn.content() == text);
        if !reuse {
            self.state.transcript.push(Turn::user(text.as_str()))?;
        }
        tracing::info!(reused_turn = reuse, "Retrying last message");
        self.stream_reply(&text, |_, _| {}).await
    }

    async fn stream_reply<F>(&mut self, text: &str, on_update: F) -> Result<StreamSummary, SessionError>
    where
        F: FnMut(&str, &Turn),
    {
        self.state.last_error = None;
        self.state.failed_message = None;
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }

        let request = ChatRequest {
            user_id: self.config.user_id.clone(),
            message: text.to_string(),
            session_id: self.config.session_id.clone(),
            stream: true,
        };
        let started = Instant::now();
        let outcome = self
            .assembler
            .assemble(
                &mut self.state.transcript,
                self.api.stream_chat(&request),
                &self.cancel,
                on_update,
            )
            .await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(summary) => {
                tracing::info!(
                    user_id = %self.config.user_id,
                    fragments = summary.fragments,
                    chars = summary.chars,
                    duration_ms,
                    "Reply completed"
                );
                self.state
                    .profile
                    .refresh(&self.api, &self.config.user_id)
                    .await;
                Ok(summary)
            }
            Err(AssemblyError { failure, partial }) => {
                if failure == StreamFailure::Cancelled {
                    self.cancel = CancellationToken::new();
                }
                let error = SessionError::from(failure);
                tracing::error!(
                    user_id = %self.config.user_id,
                    error = %error,
                    partial_fragments = partial.map_or(0, |p| p.fragments),
                    duration_ms,
                    "Reply failed"
                );
                self.state.failed_message = Some(text.to_string());
                self.state.last_error = Some(error.to_string());
                Err(error)
            }
        }
    }

    // ========================================================================
    // Assessments
    // ========================================================================

    /// Generate a new assessment from the learner's known concepts.
    /// Returns the number of questions.
    pub async fn start_assessment(&mut self, kind: AssessmentKind) -> Result<usize, SessionError> {
        let topics = self
            .state
            .profile
            .current()
            .map(|p| p.known_concepts.clone())
            .ok_or(SessionError::ProfileNotLoaded)?;

        self.apply(ModeEvent::AssessmentRequested { kind }).await?;

        let plan = GenerationPlan {
            kind,
            topics,
            count: match kind {
                AssessmentKind::Mcq => self.config.mcq_count,
                AssessmentKind::Qa => self.config.qa_count,
            },
            size: self.config.qa_size,
            focus: self.state.transcript.last_user_text().map(str::to_string),
        };

        match self
            .state
            .quiz
            .generate(&self.api, &self.config.user_id, &plan)
            .await
        {
            Ok(count) => {
                self.apply(ModeEvent::QuestionsReady { kind, count }).await?;
                Ok(count)
            }
            Err(QuizError::NoQuestions) => {
                self.apply(ModeEvent::QuestionsReady { kind, count: 0 }).await?;
                Err(SessionError::GenerationFailed {
                    kind,
                    message: QuizError::NoQuestions.to_string(),
                })
            }
            Err(e) => {
                let message = e.to_string();
                self.apply(ModeEvent::GenerationFailed {
                    kind,
                    message: message.clone(),
                })
                .await?;
                Err(SessionError::GenerationFailed { kind, message })
            }
        }
    }

    pub fn answer_option(&mut self, question_id: &str, option: usize) -> Result<(), SessionError> {
        self.state
            .quiz
            .record_option(question_id, option)
            .map_err(SessionError::from)
    }

    pub fn answer_text(&mut self, question_id: &str, text: impl Into<String>) -> Result<(), SessionError> {
        self.state
            .quiz
            .record_text(question_id, text)
            .map_err(SessionError::from)
    }

    /// Submit every answer of the active assessment in one batch
    pub async fn submit(&mut self) -> Result<QuizReport, SessionError> {
        // Validate both the mode and the answers before anything changes
        transition(&self.state.mode, ModeEvent::SubmitStarted)?;
        self.state.quiz.check_ready()?;
        self.apply(ModeEvent::SubmitStarted).await?;

        match self.state.quiz.submit(&self.api, &self.config.user_id).await {
            Ok(report) => {
                self.apply(ModeEvent::SubmitSucceeded).await?;
                Ok(report)
            }
            Err(e) => {
                let error = SessionError::from(e);
                self.apply(ModeEvent::SubmitFailed {
                    message: error.to_string(),
                })
                .await?;
                Err(error)
            }
        }
    }

    /// Leave the assessment and drop its questions, answers and results
    pub async fn exit_assessment(&mut self) -> Result<(), SessionError> {
        self.apply(ModeEvent::ExitRequested).await
    }

    /// Override the transcript index the MCQ review view starts from
    pub fn set_review_start(&mut self, index: Option<usize>) {
        self.state.review_start = index;
    }

    async fn apply(&mut self, event: ModeEvent) -> Result<(), SessionError> {
        let result = transition(&self.state.mode, event)?;
        tracing::debug!(
            from = ?self.state.mode,
            to = ?result.new_state,
            effects = result.effects.len(),
            "Mode transition"
        );
        self.state.mode = result.new_state;
        for effect in result.effects {
            self.execute_effect(effect).await;
        }
        Ok(())
    }

    async fn execute_effect(&mut self, effect: ModeEffect) {
        match effect {
            ModeEffect::ClearQuiz => self.state.quiz.clear(),
            ModeEffect::RefreshProfile => {
                self.state
                    .profile
                    .refresh(&self.api, &self.config.user_id)
                    .await;
            }
            ModeEffect::ReportError { message } => {
                tracing::error!(error = %message, "Assessment error");
                self.state.last_error = Some(message);
            }
            ModeEffect::MarkReviewStart => {
                self.state.review_start = Some(self.state.transcript.len());
            }
            ModeEffect::ClearReviewStart => self.state.review_start = None,
        }
    }

    // ========================================================================
    // Side flows
    // ========================================================================

    /// Append revision material for the learner's weak areas.
    /// Returns `Ok(false)` when the remote call failed; that failure is only logged.
    pub async fn revise(&mut self) -> Result<bool, SessionError> {
        let weak_areas = self
            .state
            .profile
            .current()
            .map(|p| p.weak_areas.clone())
            .ok_or(SessionError::ProfileNotLoaded)?;
        if weak_areas.is_empty() {
            return Err(SessionError::NoWeakAreas);
        }

        let request = RevisionRequest {
            user_id: self.config.user_id.clone(),
            topics: weak_areas,
        };
        match self.api.revision(&request).await {
            Ok(material) => {
                tracing::info!(topics = request.topics.len(), "Revision material received");
                self.state
                    .transcript
                    .push(Turn::assistant(material.revision_material))?;
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch revision material");
                Ok(false)
            }
        }
    }

    /// Hand a file to the ingestion endpoint and ground the conversation in it
    pub async fn upload_file(&mut self, file: &UploadFile) -> Result<UploadAck, SessionError> {
        self.state.last_error = None;
        match self.api.upload(&self.config.user_id, file).await {
            Ok(ack) => {
                tracing::info!(
                    filename = %file.name,
                    bytes = file.bytes.len(),
                    "File uploaded"
                );
                self.state.transcript.push(Turn::assistant(format!(
                    "Successfully uploaded and processed **{}**. I am now in \"File Analysis Mode\". I will answer your questions based only on this file.",
                    file.name
                )))?;
                self.state.grounded_file = Some(file.name.clone());
                Ok(ack)
            }
            Err(e) => {
                tracing::error!(filename = %file.name, error = %e, "Upload failed");
                self.state.last_error = Some(e.to_string());
                Err(SessionError::Transport(e))
            }
        }
    }

    /// Wipe the learner's remote memory, then the local session.
    /// Local state is untouched when the remote reset fails.
    pub async fn reset(&mut self) -> Result<ResetAck, SessionError> {
        let ack = match self.api.reset(&self.config.user_id).await {
            Ok(ack) => ack,
            Err(e) => {
                tracing::warn!(user_id = %self.config.user_id, error = %e, "Reset rejected");
                return Err(SessionError::ResetRejected(e));
            }
        };

        self.apply(ModeEvent::ExitRequested).await?;
        self.state.transcript.clear();
        self.state.history.clear();
        self.state.profile.clear();
        self.state.grounded_file = None;
        self.state.last_error = None;
        self.state.failed_message = None;
        tracing::info!(user_id = %self.config.user_id, status = %ack.status, "Session reset");

        self.state
            .profile
            .refresh(&self.api, &self.config.user_id)
            .await;
        Ok(ack)
    }

    /// Best-effort load of past session snapshots
    pub async fn fetch_history(&mut self) -> bool {
        match self.api.history(&self.config.user_id).await {
            Ok(history) => {
                tracing::debug!(sessions = history.len(), "History loaded");
                self.state.history = history;
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch history");
                false
            }
        }
    }

    pub async fn refresh_profile(&mut self) -> bool {
        self.state
            .profile
            .refresh(&self.api, &self.config.user_id)
            .await
    }

    /// Turns shown to the learner
    pub fn visible_turns(&self) -> Vec<&Turn> {
        let from = match self.mode() {
            SessionMode::Mcq => self.state.review_start,
            SessionMode::Study | SessionMode::Qa => None,
        };
        self.state.transcript.visible(from)
    }
}
