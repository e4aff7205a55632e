//! HTTP implementation of the tutoring service

use super::decode::Utf8ChunkDecoder;
use super::types::*;
use super::{ApiError, ApiErrorKind, ChunkStream, TutorApi};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Tutoring service reached over HTTP
pub struct HttpTutorApi {
    client: Client,
    base_url: String,
}

impl HttpTutorApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        // No overall request timeout: streamed replies carry their own deadline
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ApiError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        let start = Instant::now();
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(send_error)?;
        let result = read_json(response).await;
        log_outcome("GET", path, start, &result);
        result
    }

    async fn post_json<B, R>(&self, path: &str, body: Option<&B>) -> Result<R, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        let start = Instant::now();
        let mut builder = self.client.post(self.url(path));
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = builder.send().await.map_err(send_error)?;
        let result = read_json(response).await;
        log_outcome("POST", path, start, &result);
        result
    }
}

#[async_trait]
impl TutorApi for HttpTutorApi {
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChunkStream, ApiError> {
        let response = self
            .client
            .post(self.url("/chat"))
            .json(request)
            .send()
            .await
            .map_err(send_error)?;
        let response = ensure_success(response).await?;

        tracing::debug!(user_id = %request.user_id, "Reply stream opened");

        let body = Box::pin(response.bytes_stream());
        let stream = futures::stream::unfold(
            (body, Utf8ChunkDecoder::default(), false),
            |(mut body, mut decoder, finished)| async move {
                if finished {
                    return None;
                }
                loop {
                    match body.next().await {
                        Some(Ok(bytes)) => {
                            let text = decoder.push(&bytes);
                            if !text.is_empty() {
                                return Some((Ok(text), (body, decoder, false)));
                            }
                        }
                        Some(Err(e)) => {
                            let error = ApiError::network(format!("Failed to read response: {e}"));
                            return Some((Err(error), (body, decoder, true)));
                        }
                        None => {
                            let rest = decoder.finish();
                            if rest.is_empty() {
                                return None;
                            }
                            return Some((Ok(rest), (body, decoder, true)));
                        }
                    }
                }
            },
        );

        Ok(Box::pin(stream))
    }

    async fn history(&self, user_id: &str) -> Result<Vec<SessionHistoryEntry>, ApiError> {
        self.get_json(&format!("/history/{user_id}")).await
    }

    async fn profile(&self, user_id: &str) -> Result<LearnerProfile, ApiError> {
        self.get_json(&format!("/user/{user_id}/profile")).await
    }

    async fn reset(&self, user_id: &str) -> Result<ResetAck, ApiError> {
        self.post_json::<(), _>(&format!("/user/{user_id}/reset"), None)
            .await
    }

    async fn generate_mcq(&self, request: &GenerateRequest) -> Result<Vec<McqQuestion>, ApiError> {
        self.post_json("/assessment/mcq/generate", Some(request)).await
    }

    async fn submit_mcq(
        &self,
        request: &BatchSubmitRequest<usize>,
    ) -> Result<BTreeMap<String, McqResult>, ApiError> {
        self.post_json("/assessment/mcq/batch-submit", Some(request))
            .await
    }

    async fn generate_qa(&self, request: &GenerateRequest) -> Result<Vec<QaQuestion>, ApiError> {
        self.post_json("/assessment/qa/generate", Some(request)).await
    }

    async fn submit_qa(
        &self,
        request: &BatchSubmitRequest<String>,
    ) -> Result<BTreeMap<String, QaResult>, ApiError> {
        self.post_json("/assessment/qa/batch-submit", Some(request))
            .await
    }

    async fn revision(&self, request: &RevisionRequest) -> Result<RevisionMaterial, ApiError> {
        self.post_json("/assessment/revision", Some(request)).await
    }

    async fn upload(&self, user_id: &str, file: &UploadFile) -> Result<UploadAck, ApiError> {
        let start = Instant::now();
        let part = reqwest::multipart::Part::bytes(file.bytes.clone()).file_name(file.name.clone());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.url("/upload"))
            .query(&[("user_id", user_id)])
            .multipart(form)
            .send()
            .await
            .map_err(send_error)?;
        let result = read_json(response).await;
        log_outcome("POST", "/upload", start, &result);
        result
    }
}

/// Error body shape used by the service. `detail` is usually a string but
/// validation failures carry structured detail.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

fn send_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::network(format!("Request timeout: {e}"))
    } else if e.is_connect() {
        ApiError::network(format!("Connection failed: {e}"))
    } else {
        ApiError::network(format!("Request failed: {e}"))
    }
}

async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_error(status, &body))
}

async fn read_json<R: DeserializeOwned>(response: Response) -> Result<R, ApiError> {
    let response = ensure_success(response).await?;
    let body = response
        .text()
        .await
        .map_err(|e| ApiError::network(format!("Failed to read response: {e}")))?;
    serde_json::from_str(&body)
        .map_err(|e| ApiError::decode(format!("Failed to parse response: {e}")))
}

fn classify_error(status: StatusCode, body: &str) -> ApiError {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail)
        .and_then(|detail| match detail {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        });
    let message = detail.unwrap_or_else(|| format!("Server error: {}", status.as_u16()));
    let kind = if status.is_server_error() {
        ApiErrorKind::Server
    } else {
        ApiErrorKind::Client
    };
    ApiError::new(kind, message).with_status(status.as_u16())
}

fn log_outcome<R>(method: &str, path: &str, start: Instant, result: &Result<R, ApiError>) {
    let duration_ms = start.elapsed().as_millis();
    match result {
        Ok(_) => tracing::debug!(%method, %path, %duration_ms, "Tutor API request completed"),
        Err(e) => tracing::warn!(
            %method,
            %path,
            %duration_ms,
            status = ?e.status,
            retryable = e.kind.is_retryable(),
            error = %e.message,
            "Tutor API request failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_becomes_message() {
        let err = classify_error(
            StatusCode::BAD_REQUEST,
            r#"{"detail": "Could not extract text from file or unsupported format"}"#,
        );
        assert_eq!(err.kind, ApiErrorKind::Client);
        assert_eq!(err.status, Some(400));
        assert_eq!(
            err.message,
            "Could not extract text from file or unsupported format"
        );
    }

    #[test]
    fn test_missing_detail_falls_back_to_status() {
        let err = classify_error(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>");
        assert_eq!(err.kind, ApiErrorKind::Server);
        assert!(err.kind.is_retryable());
        assert_eq!(err.message, "Server error: 500");

        let err = classify_error(StatusCode::BAD_GATEWAY, r#"{"detail": null}"#);
        assert_eq!(err.message, "Server error: 502");
    }

    #[test]
    fn test_structured_detail_is_rendered() {
        let err = classify_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail": [{"loc": ["body", "topics"], "msg": "field required"}]}"#,
        );
        assert!(err.message.contains("field required"));
        assert!(!err.kind.is_retryable());
    }

    #[test]
    fn test_base_url_is_normalized() {
        let api = HttpTutorApi::new("http://localhost:8000/").unwrap();
        assert_eq!(api.base_url(), "http://localhost:8000");
        assert_eq!(api.url("/chat"), "http://localhost:8000/chat");
    }
}
