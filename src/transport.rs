//! Boundary to a remote chat-completion model.
//!
//! The orchestrator only needs "send this prompt, give me the raw reply". Keeping
//! that behind a trait lets tests and alternative providers plug in.

use std::future::Future;

use crate::config::Prompts;
use crate::domain::GenerationRequest;
use crate::error::TransportError;
use crate::util::fill_template;

/// System + user message pair for a single completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatPrompt {
  pub system: String,
  pub user: String,
}

/// A single request/response exchange with a language model.
///
/// Implementations must bound the call with a timeout and map failures onto the
/// three `TransportError` kinds.
pub trait LlmTransport: Send + Sync {
  fn complete(&self, prompt: &ChatPrompt) -> impl Future<Output = Result<String, TransportError>> + Send;
}

/// Fill the prompt templates with the request's text, count, style and difficulty.
pub fn build_prompt(prompts: &Prompts, req: &GenerationRequest) -> ChatPrompt {
  let count = req.count.to_string();
  let pairs = [
    ("count", count.as_str()),
    ("style", req.style.label()),
    ("card_type", req.style.card_type().as_str()),
    ("difficulty", req.difficulty.as_str()),
    ("text", req.text.as_str()),
  ];
  ChatPrompt {
    system: fill_template(&prompts.system, &pairs),
    user: fill_template(&prompts.user_template, &pairs),
  }
}
