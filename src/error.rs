//! Error kinds for the generation engine, the quiz session and config loading.
//!
//! Only `ValidationError` ever reaches a caller of `Generator::generate`.
//! Transport and parse failures are consumed by the orchestrator's fallback branch.

use std::time::Duration;

use thiserror::Error;

/// Malformed generation request, reported before any generation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("study text is empty")]
  EmptyText,

  #[error("study text is too short: {actual} characters, need at least {min}")]
  TooShort { min: usize, actual: usize },

  #[error("card count {count} is out of range ({min}..={max})")]
  CountOutOfRange { count: usize, min: usize, max: usize },
}

/// Failure of the remote chat-completion call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
  /// No API credential configured.
  #[error("LLM transport unavailable: no API credential configured")]
  Unavailable,

  #[error("LLM request timed out after {0:?}")]
  Timeout(Duration),

  /// HTTP error, network failure or malformed response envelope.
  #[error("LLM transport error: {0}")]
  Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
  #[error("unparsable model response: {0}")]
  UnparsableResponse(String),
}

/// Why a single candidate card was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
  #[error("candidate is not a JSON object")]
  NotAnObject,

  #[error("missing or empty question")]
  MissingQuestion,

  #[error("missing or empty answer")]
  MissingAnswer,

  #[error("cloze question must contain exactly one blank, found {0}")]
  ClozeBlanks(usize),

  #[error("definition question reads as a sentence ({0} words)")]
  DefinitionNotTerm(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
  #[error("no flashcards yet; generate flashcards first")]
  NoCards,

  #[error("quiz is finished")]
  Finished,

  #[error("this question was already marked; move on to the next question")]
  AlreadyMarked,

  /// No stored session under this id.
  #[error("unknown quiz session '{0}'")]
  UnknownSession(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config file: {0}")]
  Io(#[from] std::io::Error),

  #[error("failed to parse TOML config: {0}")]
  Toml(#[from] toml::de::Error),
}
