//! Gemini REST implementation of the model gateway.
//!
//! One client per process: the gateway is constructed once at startup and
//! shared behind an `Arc` by every session and request. Single-shot calls
//! retry transient HTTP failures with bounded backoff; the streaming call
//! parses the `alt=sse` event stream lazily so that consumption drives the
//! backend read.

mod wire;

use std::time::Duration;

use async_stream::try_stream;
use futures::StreamExt;
use reqwest::{Client, StatusCode, header::HeaderValue};
use tracing::{debug, warn};

use credo_core::conversation::Turn;
use credo_core::error::{CredoError, Result};
use credo_core::gateway::{ChunkStream, ModelGateway};
use credo_core::schema::SchemaNode;

pub use wire::schema_to_wire;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const BACKOFF_BASE: Duration = Duration::from_millis(500);

/// Connection settings for the Gemini backend.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Bound on a single generation call; expiry is a gateway failure.
    pub request_timeout: Duration,
    /// Additional attempts for transient failures on single-shot calls.
    pub max_retries: u32,
}

impl GeminiConfig {
    /// Creates a config with the default endpoint, timeout, and retry budget.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: BASE_URL.to_string(),
            request_timeout: Duration::from_secs(120),
            max_retries: 2,
        }
    }
}

/// Gateway implementation over the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiGateway {
    client: Client,
    config: GeminiConfig,
}

impl GeminiGateway {
    /// Builds the shared HTTP client with the configured request timeout.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| CredoError::config(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client, config })
    }

    fn request_url(&self, method: &str, sse: bool) -> String {
        let mut url = format!(
            "{}/{}:{method}?key={}",
            self.config.base_url, self.config.model, self.config.api_key
        );
        if sse {
            url.push_str("&alt=sse");
        }
        url
    }

    async fn generate(
        &self,
        body: &wire::GenerateContentRequest,
    ) -> std::result::Result<wire::GenerateContentResponse, HttpFailure> {
        let response = self
            .client
            .post(self.request_url("generateContent", false))
            .json(body)
            .send()
            .await
            .map_err(HttpFailure::from_transport)?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(HttpFailure::from_status(status, body_text, retry_after));
        }

        response
            .json()
            .await
            .map_err(|err| HttpFailure::terminal(format!("failed to parse response: {err}")))
    }

    /// Single-shot call with bounded retry for transient failures.
    async fn generate_with_retry(
        &self,
        body: &wire::GenerateContentRequest,
    ) -> Result<wire::GenerateContentResponse> {
        let mut attempt = 0u32;
        loop {
            match self.generate(body).await {
                Ok(response) => return Ok(response),
                Err(failure) if failure.retryable && attempt < self.config.max_retries => {
                    let delay = failure
                        .retry_after
                        .unwrap_or_else(|| BACKOFF_BASE * 2u32.pow(attempt));
                    warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %failure.message,
                        "transient backend failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(failure) => return Err(failure.into_error()),
            }
        }
    }
}

#[async_trait::async_trait]
impl ModelGateway for GeminiGateway {
    async fn complete_once(&self, context: &str, turns: &[Turn]) -> Result<String> {
        let mut contents = vec![wire::Content::user(context)];
        contents.extend(turns.iter().map(wire::Content::from_turn));
        let body = wire::GenerateContentRequest {
            contents,
            generation_config: None,
        };

        let response = self.generate_with_retry(&body).await?;
        wire::extract_text(response)
            .ok_or_else(|| CredoError::gateway("backend returned no text candidates"))
    }

    async fn complete_structured(
        &self,
        context: &str,
        instruction: &str,
        schema: &SchemaNode,
    ) -> Result<serde_json::Value> {
        let body = wire::GenerateContentRequest {
            contents: vec![wire::Content::user(context), wire::Content::user(instruction)],
            generation_config: Some(wire::GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: wire::schema_to_wire(schema),
            }),
        };

        // No automatic retry: the caller owns the retry decision for
        // structured extraction.
        let response = self
            .generate(&body)
            .await
            .map_err(|failure| {
                warn!(error = %failure.message, "structured generation failed");
                failure.into_error()
            })?;

        let text = wire::extract_text(response)
            .ok_or_else(|| CredoError::gateway("backend returned no text candidates"))?;
        let value = serde_json::from_str(&text).map_err(|err| {
            warn!(error = %err, "structured output is not valid JSON");
            CredoError::gateway(format!("structured output is not valid JSON: {err}"))
        })?;
        debug!("structured generation parsed");
        Ok(value)
    }

    async fn complete_streaming(&self, turns: &[Turn]) -> Result<ChunkStream> {
        let body = wire::GenerateContentRequest {
            contents: turns.iter().map(wire::Content::from_turn).collect(),
            generation_config: None,
        };
        let url = self.request_url("streamGenerateContent", true);
        let client = self.client.clone();

        let stream = try_stream! {
            let response = client
                .post(url)
                .json(&body)
                .send()
                .await
                .map_err(|err| CredoError::gateway(format!("stream request failed: {err}")))?;

            let status = response.status();
            if !status.is_success() {
                let body_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "failed to read error body".to_string());
                Err(HttpFailure::from_status(status, body_text, None).into_error())?;
            } else {
                let mut bytes = response.bytes_stream();
                let mut buffer = String::new();
                while let Some(chunk) = bytes.next().await {
                    let chunk = chunk
                        .map_err(|err| CredoError::gateway(format!("stream read failed: {err}")))?;
                    let chunk = std::str::from_utf8(&chunk)
                        .map_err(|err| CredoError::gateway(format!("stream is not UTF-8: {err}")))?;
                    buffer.push_str(chunk);

                    while let Some(pos) = buffer.find('\n') {
                        let line: String = buffer.drain(..=pos).collect();
                        if let Some(text) = parse_sse_line(line.trim_end())? {
                            if !text.is_empty() {
                                yield text;
                            }
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Extracts the text delta from one SSE line, if it carries an event.
fn parse_sse_line(line: &str) -> Result<Option<String>> {
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim_start();
    if data.is_empty() || data == "[DONE]" {
        return Ok(None);
    }

    let event: wire::GenerateContentResponse = serde_json::from_str(data)
        .map_err(|err| CredoError::gateway(format!("stream decode failed: {err}")))?;
    Ok(wire::extract_text(event))
}

struct HttpFailure {
    message: String,
    retryable: bool,
    retry_after: Option<Duration>,
}

impl HttpFailure {
    fn terminal(message: String) -> Self {
        Self {
            message,
            retryable: false,
            retry_after: None,
        }
    }

    fn from_transport(err: reqwest::Error) -> Self {
        Self {
            message: format!("request failed: {err}"),
            retryable: err.is_connect() || err.is_timeout(),
            retry_after: None,
        }
    }

    fn from_status(status: StatusCode, body: String, retry_after: Option<Duration>) -> Self {
        let message = serde_json::from_str::<wire::ErrorWrapper>(&body)
            .map(|wrapper| {
                let status_text = wrapper.error.status.unwrap_or_default();
                let msg = wrapper.error.message.unwrap_or_else(|| body.clone());
                if status_text.is_empty() {
                    msg
                } else {
                    format!("{status_text}: {msg}")
                }
            })
            .unwrap_or_else(|_| body.clone());

        let retryable = matches!(
            status,
            StatusCode::TOO_MANY_REQUESTS
                | StatusCode::INTERNAL_SERVER_ERROR
                | StatusCode::BAD_GATEWAY
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT
        );

        Self {
            message: format!("backend returned {status}: {message}"),
            retryable,
            retry_after,
        }
    }

    fn into_error(self) -> CredoError {
        CredoError::gateway(self.message)
    }
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    // Retry-After HTTP-date parsing is omitted; only delta-seconds are used.
    value.parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sse_line_extracts_text_delta() {
        let line = r#"data: {"candidates":[{"content":{"parts":[{"text":"The "}]}}]}"#;
        assert_eq!(parse_sse_line(line).unwrap().as_deref(), Some("The "));
    }

    #[test]
    fn test_parse_sse_line_skips_non_data_lines() {
        assert_eq!(parse_sse_line("").unwrap(), None);
        assert_eq!(parse_sse_line(": keepalive").unwrap(), None);
        assert_eq!(parse_sse_line("data:").unwrap(), None);
        assert_eq!(parse_sse_line("data: [DONE]").unwrap(), None);
    }

    #[test]
    fn test_parse_sse_line_rejects_malformed_events() {
        assert!(parse_sse_line("data: {not json").is_err());
    }

    #[test]
    fn test_transient_statuses_are_retryable() {
        for status in [
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            assert!(HttpFailure::from_status(status, String::new(), None).retryable);
        }
        assert!(!HttpFailure::from_status(StatusCode::BAD_REQUEST, String::new(), None).retryable);
    }

    #[test]
    fn test_status_failure_prefers_structured_error_body() {
        let body = r#"{"error":{"code":429,"message":"quota exhausted","status":"RESOURCE_EXHAUSTED"}}"#;
        let failure =
            HttpFailure::from_status(StatusCode::TOO_MANY_REQUESTS, body.to_string(), None);

        assert!(failure.message.contains("RESOURCE_EXHAUSTED: quota exhausted"));
    }

    #[test]
    fn test_parse_retry_after_delta_seconds() {
        let header = HeaderValue::from_static("7");
        assert_eq!(
            parse_retry_after(Some(&header)),
            Some(Duration::from_secs(7))
        );
        let bad = HeaderValue::from_static("soon");
        assert_eq!(parse_retry_after(Some(&bad)), None);
        assert_eq!(parse_retry_after(None), None);
    }

    #[test]
    fn test_request_url_shapes() {
        let gateway = GeminiGateway::new(GeminiConfig::new("k", "gemini-2.5-flash")).unwrap();

        assert_eq!(
            gateway.request_url("generateContent", false),
            format!("{BASE_URL}/gemini-2.5-flash:generateContent?key=k")
        );
        assert_eq!(
            gateway.request_url("streamGenerateContent", true),
            format!("{BASE_URL}/gemini-2.5-flash:streamGenerateContent?key=k&alt=sse")
        );
    }
}
