//! Tutor session client
//!
//! Client-side orchestration of one learning session against a remote
//! tutoring service: streamed conversation turns, MCQ and Q&A assessments,
//! and the learner profile feed that reacts to them.

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate, clippy::module_name_repetitions)]

pub mod api;
pub mod config;
pub mod quiz;
pub mod session;
pub mod state_machine;

#[cfg(test)]
mod testing;

pub use api::{ApiError, ApiErrorKind, HttpTutorApi, TutorApi};
pub use config::ClientConfig;
pub use quiz::AssessmentKind;
pub use session::{Session, SessionError, SessionState};
