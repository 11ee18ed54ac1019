//! Minimal OpenAI chat-completions client implementing `LlmTransport`.
//!
//! One plain-text completion per generation request. Calls are instrumented and log
//! the model name, latency and token usage (not contents).
//!
//! NOTE: We never log the API key.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::error::TransportError;
use crate::transport::{ChatPrompt, LlmTransport};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

const TEMPERATURE: f32 = 0.2;

#[derive(Clone)]
pub struct OpenAI {
  client: reqwest::Client,
  api_key: String,
  pub base_url: String,
  pub model: String,
  pub timeout: Duration,
}

impl std::fmt::Debug for OpenAI {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("OpenAI")
      .field("base_url", &self.base_url)
      .field("model", &self.model)
      .field("timeout", &self.timeout)
      .finish_non_exhaustive()
  }
}

impl OpenAI {
  pub fn new(
    api_key: impl Into<String>,
    base_url: impl Into<String>,
    model: impl Into<String>,
    timeout: Duration,
  ) -> Result<Self, TransportError> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| TransportError::Failed(e.to_string()))?;
    let base_url: String = base_url.into();
    Ok(Self {
      client,
      api_key: api_key.into(),
      base_url: base_url.trim_end_matches('/').to_string(),
      model: model.into(),
      timeout,
    })
  }

  /// Construct the client if we find a non-blank OPENAI_API_KEY; otherwise None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url = std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
    let timeout = std::env::var("OPENAI_TIMEOUT_SECS")
      .ok()
      .and_then(|s| s.parse::<u64>().ok())
      .map(Duration::from_secs)
      .unwrap_or(DEFAULT_TIMEOUT);

    match Self::new(api_key, base_url, model, timeout) {
      Ok(client) => Some(client),
      Err(e) => {
        error!(target: "flashcard_tutor", error = %e, "Failed to build OpenAI client");
        None
      }
    }
  }

  fn map_reqwest_error(&self, e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
      TransportError::Timeout(self.timeout)
    } else {
      TransportError::Failed(e.to_string())
    }
  }

  /// Plain-text chat completion.
  #[instrument(level = "info", skip_all, fields(model = %self.model, user_len = prompt.user.len()))]
  async fn chat_plain(&self, prompt: &ChatPrompt) -> Result<String, TransportError> {
    if self.api_key.trim().is_empty() {
      return Err(TransportError::Unavailable);
    }

    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: prompt.system.clone() },
        ChatMessageReq { role: "user".into(), content: prompt.user.clone() },
      ],
      temperature: TEMPERATURE,
      max_tokens: None,
    };

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "flashcard-tutor/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await.map_err(|e| self.map_reqwest_error(e))?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or(body);
      return Err(TransportError::Failed(format!("OpenAI HTTP {}: {}", status, msg)));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| {
      if e.is_timeout() {
        TransportError::Timeout(self.timeout)
      } else {
        TransportError::Failed(format!("malformed response envelope: {e}"))
      }
    })?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.into_iter().next()
      .and_then(|c| c.message.content)
      .ok_or_else(|| TransportError::Failed("response has no message content".into()))?;

    info!(elapsed = ?start.elapsed(), reply_len = text.len(), "Model response received");
    Ok(text)
  }
}

impl LlmTransport for OpenAI {
  async fn complete(&self, prompt: &ChatPrompt) -> Result<String, TransportError> {
    self.chat_plain(prompt).await
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn extracts_error_message() {
    let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
    assert_eq!(extract_openai_error(body).as_deref(), Some("Incorrect API key provided"));
    assert_eq!(extract_openai_error("<html>bad gateway</html>"), None);
  }

  #[test]
  fn debug_output_hides_the_key() {
    let client = OpenAI::new("sk-secret", "http://localhost:1/v1/", "m", DEFAULT_TIMEOUT).unwrap();
    let shown = format!("{client:?}");
    assert!(!shown.contains("sk-secret"));
    assert_eq!(client.base_url, "http://localhost:1/v1");
  }

  #[tokio::test]
  async fn blank_key_is_unavailable() {
    let client = OpenAI::new("  ", "http://localhost:1/v1", "m", DEFAULT_TIMEOUT).unwrap();
    let prompt = ChatPrompt { system: "s".into(), user: "u".into() };
    assert_eq!(client.complete(&prompt).await, Err(TransportError::Unavailable));
  }
}
