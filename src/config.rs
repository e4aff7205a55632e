//! Client configuration

use crate::api::QuestionSize;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_USER_ID: &str = "learner";
pub const DEFAULT_SESSION_ID: &str = "default";

/// Hard limit on the total duration of one streamed reply
pub const DEFAULT_STREAM_TIMEOUT: Duration = Duration::from_secs(120);

pub const DEFAULT_MCQ_COUNT: u32 = 5;
pub const DEFAULT_QA_COUNT: u32 = 3;

/// Configuration for a tutoring session
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the tutoring service (e.g., `http://localhost:8000`)
    pub api_url: String,
    pub user_id: String,
    pub session_id: String,
    pub stream_timeout: Duration,
    /// Number of questions requested per MCQ assessment
    pub mcq_count: u32,
    /// Number of questions requested per Q&A assessment
    pub qa_count: u32,
    pub qa_size: QuestionSize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            user_id: DEFAULT_USER_ID.to_string(),
            session_id: DEFAULT_SESSION_ID.to_string(),
            stream_timeout: DEFAULT_STREAM_TIMEOUT,
            mcq_count: DEFAULT_MCQ_COUNT,
            qa_count: DEFAULT_QA_COUNT,
            qa_size: QuestionSize::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let count = |key: &str, fallback: u32| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u32>().ok())
                .filter(|n| *n >= 1)
                .unwrap_or(fallback)
        };

        Self {
            api_url: lookup("TUTOR_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
            user_id: lookup("TUTOR_USER_ID").unwrap_or(defaults.user_id),
            session_id: lookup("TUTOR_SESSION_ID").unwrap_or(defaults.session_id),
            stream_timeout: lookup("TUTOR_STREAM_TIMEOUT_SECS")
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map_or(defaults.stream_timeout, Duration::from_secs),
            mcq_count: count("TUTOR_MCQ_COUNT", defaults.mcq_count),
            qa_count: count("TUTOR_QA_COUNT", defaults.qa_count),
            qa_size: lookup("TUTOR_QA_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.qa_size),
        }
    }
}
