//! Loading tutor configuration (prompts + request limits) from TOML.
//!
//! See `TutorConfig` and `Prompts` for expected schema. Everything is optional;
//! a missing or broken file means defaults.

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::Limits;
use crate::error::ConfigError;

pub const CONFIG_PATH_ENV: &str = "TUTOR_CONFIG_PATH";

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct TutorConfig {
  pub prompts: Prompts,
  pub limits: Limits,
  /// Card count used when a request does not name one.
  pub default_count: usize,
}

impl Default for TutorConfig {
  fn default() -> Self {
    Self { prompts: Prompts::default(), limits: Limits::default(), default_count: 10 }
  }
}

/// Prompts used for the model path. Placeholders: `{count}`, `{style}`,
/// `{card_type}`, `{difficulty}`, `{text}`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Prompts {
  pub system: String,
  pub user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      system: "You are a study assistant that writes concise, accurate flashcards. Respond ONLY with a JSON array; no prose, no code fences.".into(),
      user_template: "Create exactly {count} flashcards in the '{style}' style at '{difficulty}' difficulty from the study material below.\n\
Return a JSON array. Each element is an object with keys:\n\
  \"type\": \"{card_type}\",\n\
  \"difficulty\": \"{difficulty}\",\n\
  \"question\": non-empty string,\n\
  \"answer\": non-empty string.\n\
For cloze cards the question must contain exactly one blank written as _____ and the answer is the removed text.\n\
For definition cards the question is only the term and the answer is its definition.\n\
Use only facts stated in the material.\n\n\
Study material:\n{text}".into(),
    }
  }
}

impl TutorConfig {
  pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
    Ok(toml::from_str(s)?)
  }

  pub fn load(path: &str) -> Result<Self, ConfigError> {
    let s = std::fs::read_to_string(path)?;
    Self::from_toml_str(&s)
  }
}

/// Load config from `TUTOR_CONFIG_PATH`. Unset, unreadable or invalid → defaults.
pub fn load_config_from_env() -> TutorConfig {
  let Ok(path) = std::env::var(CONFIG_PATH_ENV) else {
    return TutorConfig::default();
  };
  match TutorConfig::load(&path) {
    Ok(cfg) => {
      info!(target: "flashcard_tutor", %path, "Loaded tutor config (TOML)");
      cfg
    }
    Err(e) => {
      error!(target: "flashcard_tutor", %path, error = %e, "Failed to load tutor config; using defaults");
      TutorConfig::default()
    }
  }
}
