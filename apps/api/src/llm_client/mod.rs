//! Anthropic Messages client for match summaries. Failures are reported to
//! the caller, which keeps the keyword recommendation instead.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::matching::prompts::MATCH_SUMMARY_SYSTEM;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
pub const MODEL: &str = "claude-sonnet-4-5";
/// A 2-3 sentence summary wrapped in a one-key JSON object.
const MAX_TOKENS: u32 = 400;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const MAX_ATTEMPTS: u32 = 2;
const RETRY_DELAY: Duration = Duration::from_millis(500);
pub const MAX_SUMMARY_CHARS: usize = 800;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: StatusCode, message: String },

    #[error("Summary is not the expected JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned no summary text")]
    Empty,
}

impl LlmError {
    /// Rate limits, server errors and dropped connections are worth one more try.
    fn is_transient(&self) -> bool {
        match self {
            LlmError::Http(e) => e.is_timeout() || e.is_connect(),
            LlmError::Api { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            LlmError::Parse(_) | LlmError::Empty => false,
        }
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'static str,
    max_tokens: u32,
    system: &'static str,
    messages: [UserMessage<'a>; 1],
}

#[derive(Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesReply {
    content: Vec<ReplyBlock>,
}

#[derive(Deserialize)]
struct ReplyBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorReply {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct SummaryJson {
    summary: String,
}

#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, api_key })
    }

    /// Sends a filled match-summary prompt and returns the cleaned summary.
    pub async fn match_summary(&self, prompt: &str) -> Result<String, LlmError> {
        let request = MessagesRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system: MATCH_SUMMARY_SYSTEM,
            messages: [UserMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut attempt = 1;
        let raw = loop {
            match self.send(&request).await {
                Err(e) if attempt < MAX_ATTEMPTS && e.is_transient() => {
                    warn!("Match summary attempt {attempt} failed, retrying: {e}");
                    tokio::time::sleep(RETRY_DELAY).await;
                    attempt += 1;
                }
                other => break other?,
            }
        };
        debug!(attempt, "Match summary received");
        parse_summary(&raw)
    }

    async fn send(&self, request: &MessagesRequest<'_>) -> Result<String, LlmError> {
        let response = self
            .http
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status,
                message: api_error_message(body),
            });
        }

        let reply: MessagesReply = response.json().await?;
        reply
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or(LlmError::Empty)
    }
}

fn api_error_message(body: String) -> String {
    serde_json::from_str::<ApiErrorReply>(&body)
        .map(|reply| reply.error.message)
        .unwrap_or(body)
}

/// Reads `{"summary": "..."}`, tolerating a markdown fence around it.
/// Whitespace is collapsed and the text is capped at `MAX_SUMMARY_CHARS`.
fn parse_summary(raw: &str) -> Result<String, LlmError> {
    let parsed: SummaryJson = serde_json::from_str(strip_json_fences(raw))?;
    let summary = parsed.summary.split_whitespace().collect::<Vec<_>>().join(" ");
    if summary.is_empty() {
        return Err(LlmError::Empty);
    }
    if summary.chars().count() <= MAX_SUMMARY_CHARS {
        return Ok(summary);
    }
    let capped: String = summary.chars().take(MAX_SUMMARY_CHARS).collect();
    Ok(capped.trim_end().to_string())
}

fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences() {
        let bare = r#"{"summary": "ok"}"#;
        assert_eq!(strip_json_fences(bare), bare);
        assert_eq!(strip_json_fences(&format!("```json\n{bare}\n```")), bare);
        assert_eq!(strip_json_fences(&format!("```\n{bare}\n```")), bare);
    }

    #[test]
    fn test_parse_summary_collapses_whitespace() {
        let raw = "```json\n{\"summary\": \"  Strong Rust\\n background.  Learn Kafka. \"}\n```";
        assert_eq!(
            parse_summary(raw).unwrap(),
            "Strong Rust background. Learn Kafka."
        );
    }

    #[test]
    fn test_parse_summary_rejects_blank_and_non_json() {
        assert!(matches!(
            parse_summary(r#"{"summary": "   "}"#),
            Err(LlmError::Empty)
        ));
        assert!(matches!(
            parse_summary("Great candidate!"),
            Err(LlmError::Parse(_))
        ));
        assert!(matches!(
            parse_summary(r#"{"verdict": "yes"}"#),
            Err(LlmError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_summary_caps_length() {
        let long = "word ".repeat(MAX_SUMMARY_CHARS);
        let raw = serde_json::json!({ "summary": long }).to_string();
        let summary = parse_summary(&raw).unwrap();
        assert!(summary.chars().count() <= MAX_SUMMARY_CHARS);
        assert!(!summary.ends_with(' '));
    }

    #[test]
    fn test_api_error_message_prefers_structured_body() {
        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        assert_eq!(api_error_message(body.to_string()), "Overloaded");
        assert_eq!(api_error_message("bad gateway".to_string()), "bad gateway");
    }

    #[test]
    fn test_only_rate_limits_and_server_errors_retry() {
        let api = |status| LlmError::Api {
            status,
            message: String::new(),
        };
        assert!(api(StatusCode::TOO_MANY_REQUESTS).is_transient());
        assert!(api(StatusCode::SERVICE_UNAVAILABLE).is_transient());
        assert!(!api(StatusCode::BAD_REQUEST).is_transient());
        assert!(!api(StatusCode::UNAUTHORIZED).is_transient());
        assert!(!LlmError::Empty.is_transient());
    }
}
