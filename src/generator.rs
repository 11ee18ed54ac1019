//! Generation orchestrator: the single entry point for making flashcards.
//!
//! Decision table:
//!
//! | use_llm | transport | reply           | valid cards | mode          |
//! |---------|-----------|-----------------|-------------|---------------|
//! | false   | -         | -               | -           | `fallback`    |
//! | true    | none      | -               | -           | `fallback`    |
//! | true    | some      | transport error | -           | `fallback`    |
//! | true    | some      | unparsable / 0  | 0           | `fallback`    |
//! | true    | some      | ok              | < n         | `llm_partial` |
//! | true    | some      | ok              | >= n        | `llm`         |
//!
//! Only request validation errors are returned to the caller; every other failure
//! degrades to the deterministic path.

use tracing::{info, instrument, warn};

use crate::config::Prompts;
use crate::domain::{GenerationRequest, GenerationResult, Limits, Mode};
use crate::error::ValidationError;
use crate::fallback;
use crate::parser::parse_cards;
use crate::transport::{build_prompt, LlmTransport};
use crate::util::trunc_for_log;

#[derive(Clone, Debug)]
pub struct Generator<T> {
  transport: Option<T>,
  prompts: Prompts,
  limits: Limits,
}

impl<T: LlmTransport> Generator<T> {
  pub fn new(transport: Option<T>, prompts: Prompts, limits: Limits) -> Self {
    Self { transport, prompts, limits }
  }

  /// Generator with no model; always uses the deterministic path.
  pub fn offline(prompts: Prompts, limits: Limits) -> Self {
    Self::new(None, prompts, limits)
  }

  pub fn has_transport(&self) -> bool {
    self.transport.is_some()
  }

  /// Validate the request, then produce at most `req.count` cards.
  #[instrument(
    level = "info",
    skip_all,
    fields(text_len = req.text.len(), count = req.count, style = %req.style, difficulty = %req.difficulty, use_llm = req.use_llm)
  )]
  pub async fn generate(&self, req: &GenerationRequest) -> Result<GenerationResult, ValidationError> {
    self.limits.validate(req)?;

    if !req.use_llm {
      info!(target: "flashcards", reason = "llm_disabled", "Using fallback generation");
      return Ok(self.fallback(req));
    }
    let Some(transport) = &self.transport else {
      info!(target: "flashcards", reason = "no_credential", "Using fallback generation");
      return Ok(self.fallback(req));
    };

    let prompt = build_prompt(&self.prompts, req);
    let raw = match transport.complete(&prompt).await {
      Ok(raw) => raw,
      Err(e) => {
        warn!(target: "flashcards", error = %e, "LLM transport failed; using fallback generation");
        return Ok(self.fallback(req));
      }
    };

    match parse_cards(&raw) {
      Ok(mut cards) if !cards.is_empty() => {
        let mode = if cards.len() < req.count { Mode::LlmPartial } else { Mode::Llm };
        cards.truncate(req.count);
        info!(target: "flashcards", %mode, cards = cards.len(), "Generated cards with LLM");
        Ok(GenerationResult { cards, mode, raw })
      }
      Ok(_) => {
        warn!(target: "flashcards", reply = %trunc_for_log(&raw, 120), "LLM reply had no valid cards; using fallback generation");
        Ok(self.fallback(req))
      }
      Err(e) => {
        warn!(target: "flashcards", error = %e, reply = %trunc_for_log(&raw, 120), "LLM reply unparsable; using fallback generation");
        Ok(self.fallback(req))
      }
    }
  }

  /// Fallback results never carry a model reply; rejected replies are only logged.
  fn fallback(&self, req: &GenerationRequest) -> GenerationResult {
    let cards = fallback::generate(&req.text, req.count, req.style, req.difficulty);
    info!(target: "flashcards", cards = cards.len(), "Generated cards offline");
    GenerationResult { cards, mode: Mode::Fallback, raw: String::new() }
  }
}
