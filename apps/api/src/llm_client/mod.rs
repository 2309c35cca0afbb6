//! Anthropic Messages API client used by the interview coach.
//!
//! One `LlmClient` is built at startup with the model named in `Config`.
//! Each call is a `Completion` carrying its own system prompt and token
//! budget, so a short reference answer and a full evaluation do not share a
//! ceiling. Transient API failures (429, 5xx, transport errors) are retried
//! here; everything else is returned to the caller.
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_ATTEMPTS: u32 = 3;
const FIRST_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// One prompt to send.
#[derive(Debug, Clone, Copy)]
pub struct Completion<'a> {
    pub system: &'a str,
    pub prompt: &'a str,
    pub max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [UserMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl MessagesResponse {
    /// All text blocks joined, trimmed.
    fn into_text(self) -> String {
        self.content
            .into_iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join("")
            .trim()
            .to_string()
    }
}

#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    api_key: String,
    model: String,
}

impl LlmClient {
    pub fn new(api_key: String, model: String) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_key,
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends `completion` and returns the model's text. Empty output is an error.
    pub async fn complete(&self, completion: Completion<'_>) -> Result<String, LlmError> {
        let request = self.request(completion);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.send(&request).await {
                Ok(response) => {
                    if response.stop_reason.as_deref() == Some("max_tokens") {
                        warn!(
                            max_tokens = completion.max_tokens,
                            "LLM output hit the token budget and was truncated"
                        );
                    }
                    let text = response.into_text();
                    if text.is_empty() {
                        return Err(LlmError::EmptyContent);
                    }
                    return Ok(text);
                }
                Err(e) if attempt < MAX_ATTEMPTS && is_transient(&e) => {
                    let delay = backoff(attempt);
                    warn!(attempt, "LLM call failed, retrying in {delay:?}: {e}");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Like `complete`, then parses the text as JSON. Markdown fences around
    /// the JSON are tolerated.
    pub async fn complete_json<T: DeserializeOwned>(
        &self,
        completion: Completion<'_>,
    ) -> Result<T, LlmError> {
        let text = self.complete(completion).await?;
        Ok(serde_json::from_str(strip_code_fence(&text))?)
    }

    fn request<'a>(&'a self, completion: Completion<'a>) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.model,
            max_tokens: completion.max_tokens,
            system: completion.system,
            messages: [UserMessage {
                role: "user",
                content: completion.prompt,
            }],
        }
    }

    async fn send(&self, request: &MessagesRequest<'_>) -> Result<MessagesResponse, LlmError> {
        let response = self
            .http
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: MessagesResponse = response.json().await?;
        debug!(model = request.model, "LLM call succeeded");
        Ok(parsed)
    }
}

/// Rate limits, server errors and transport failures are worth another try.
fn is_transient(error: &LlmError) -> bool {
    match error {
        LlmError::Api { status, .. } => {
            *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
        }
        LlmError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        LlmError::Parse(_) | LlmError::EmptyContent => false,
    }
}

/// 500ms, 1s, 2s, ...
fn backoff(attempt: u32) -> Duration {
    FIRST_BACKOFF * 2u32.pow(attempt.saturating_sub(1))
}

/// Removes a surrounding markdown code fence (with or without a language tag).
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(body) = text.strip_prefix("```") else {
        return text;
    };
    // Drop an optional language tag on the opening line.
    let body = match body.split_once('\n') {
        Some((tag, rest)) if !tag.trim().contains(char::is_whitespace) => rest,
        _ => body,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("  {\"a\": 1}  "), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn test_request_uses_configured_model_and_call_budget() {
        let client = LlmClient::new("key".into(), "claude-test-model".into()).unwrap();
        let request = client.request(Completion {
            system: "Be brief.",
            prompt: "Why Rust?",
            max_tokens: 321,
        });

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["model"], "claude-test-model");
        assert_eq!(body["max_tokens"], 321);
        assert_eq!(body["system"], "Be brief.");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Why Rust?");
    }

    #[test]
    fn test_response_text_joins_text_blocks() {
        let response: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"text","text":" Hello "},{"type":"tool_use"},{"type":"text","text":"world "}],
                "stop_reason":"end_turn"}"#,
        )
        .unwrap();
        assert_eq!(response.into_text(), "Hello world");
    }

    #[test]
    fn test_only_transient_failures_are_retried() {
        let api = |status| LlmError::Api {
            status,
            message: String::new(),
        };
        assert!(is_transient(&api(429)));
        assert!(is_transient(&api(529)));
        assert!(!is_transient(&api(400)));
        assert!(!is_transient(&LlmError::EmptyContent));
    }

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff(1), Duration::from_millis(500));
        assert_eq!(backoff(2), Duration::from_secs(1));
        assert_eq!(backoff(3), Duration::from_secs(2));
    }
}
