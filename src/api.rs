//! Remote tutoring service abstraction
//!
//! Message generation, question generation, grading and file ingestion all
//! live behind the remote service. This module defines the seam the session
//! talks to and the HTTP implementation of it.

mod client;
mod decode;
mod error;
mod types;

pub use client::HttpTutorApi;
pub use error::{ApiError, ApiErrorKind};
pub use types::*;

use async_trait::async_trait;
use futures::Stream;
use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::Arc;

/// Lazy, finite, non-restartable sequence of reply fragments in delivery order
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, ApiError>> + Send>>;

/// Operations offered by the tutoring service
#[async_trait]
pub trait TutorApi: Send + Sync {
    /// Start a streamed reply. Resolves once the response head arrives;
    /// fragments are then pulled from the returned stream.
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChunkStream, ApiError>;

    async fn history(&self, user_id: &str) -> Result<Vec<SessionHistoryEntry>, ApiError>;

    async fn profile(&self, user_id: &str) -> Result<LearnerProfile, ApiError>;

    async fn reset(&self, user_id: &str) -> Result<ResetAck, ApiError>;

    async fn generate_mcq(&self, request: &GenerateRequest) -> Result<Vec<McqQuestion>, ApiError>;

    async fn submit_mcq(
        &self,
        request: &BatchSubmitRequest<usize>,
    ) -> Result<BTreeMap<String, McqResult>, ApiError>;

    async fn generate_qa(&self, request: &GenerateRequest) -> Result<Vec<QaQuestion>, ApiError>;

    async fn submit_qa(
        &self,
        request: &BatchSubmitRequest<String>,
    ) -> Result<BTreeMap<String, QaResult>, ApiError>;

    async fn revision(&self, request: &RevisionRequest) -> Result<RevisionMaterial, ApiError>;

    async fn upload(&self, user_id: &str, file: &UploadFile) -> Result<UploadAck, ApiError>;
}

// ============================================================================
// Arc implementation for shared clients
// ============================================================================

#[async_trait]
impl<T: TutorApi + ?Sized> TutorApi for Arc<T> {
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChunkStream, ApiError> {
        (**self).stream_chat(request).await
    }

    async fn history(&self, user_id: &str) -> Result<Vec<SessionHistoryEntry>, ApiError> {
        (**self).history(user_id).await
    }

    async fn profile(&self, user_id: &str) -> Result<LearnerProfile, ApiError> {
        (**self).profile(user_id).await
    }

    async fn reset(&self, user_id: &str) -> Result<ResetAck, ApiError> {
        (**self).reset(user_id).await
    }

    async fn generate_mcq(&self, request: &GenerateRequest) -> Result<Vec<McqQuestion>, ApiError> {
        (**self).generate_mcq(request).await
    }

    async fn submit_mcq(
        &self,
        request: &BatchSubmitRequest<usize>,
    ) -> Result<BTreeMap<String, McqResult>, ApiError> {
        (**self).submit_mcq(request).await
    }

    async fn generate_qa(&self, request: &GenerateRequest) -> Result<Vec<QaQuestion>, ApiError> {
        (**self).generate_qa(request).await
    }

    async fn submit_qa(
        &self,
        request: &BatchSubmitRequest<String>,
    ) -> Result<BTreeMap<String, QaResult>, ApiError> {
        (**self).submit_qa(request).await
    }

    async fn revision(&self, request: &RevisionRequest) -> Result<RevisionMaterial, ApiError> {
        (**self).revision(request).await
    }

    async fn upload(&self, user_id: &str, file: &UploadFile) -> Result<UploadAck, ApiError> {
        (**self).upload(user_id, file).await
    }
}
