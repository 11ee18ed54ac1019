//! Domain models: cards, generation requests/results and request limits.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{Rejection, ValidationError};

/// Kind of flashcard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
  #[default]
  Qa,
  Definition,
  Cloze,
}

impl CardType {
  pub fn as_str(&self) -> &'static str {
    match self {
      CardType::Qa => "qa",
      CardType::Definition => "definition",
      CardType::Cloze => "cloze",
    }
  }

  /// Case-insensitive match, including a few spellings models like to use.
  pub fn parse_loose(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "qa" | "q/a" | "q&a" | "question" | "basic" => Some(CardType::Qa),
      "definition" | "def" | "term" => Some(CardType::Definition),
      "cloze" | "fill-in-the-blank" | "fill_in_the_blank" | "blank" => Some(CardType::Cloze),
      _ => None,
    }
  }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Difficulty {
  Easy,
  #[default]
  Medium,
  Hard,
}

impl Difficulty {
  pub fn as_str(&self) -> &'static str {
    match self {
      Difficulty::Easy => "easy",
      Difficulty::Medium => "medium",
      Difficulty::Hard => "hard",
    }
  }

  pub fn parse_loose(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "easy" => Some(Difficulty::Easy),
      "medium" => Some(Difficulty::Medium),
      "hard" => Some(Difficulty::Hard),
      _ => None,
    }
  }
}

impl TryFrom<String> for Difficulty {
  type Error = String;
  fn try_from(s: String) -> Result<Self, Self::Error> {
    Difficulty::parse_loose(&s).ok_or_else(|| format!("unknown difficulty '{s}'"))
  }
}

impl fmt::Display for Difficulty {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// How the generator should render cards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Style {
  #[default]
  Qa,
  Definition,
  Cloze,
}

impl Style {
  pub fn label(&self) -> &'static str {
    match self {
      Style::Qa => "Q/A",
      Style::Definition => "Definition",
      Style::Cloze => "Cloze",
    }
  }

  /// Card type every card rendered in this style carries.
  pub fn card_type(&self) -> CardType {
    match self {
      Style::Qa => CardType::Qa,
      Style::Definition => CardType::Definition,
      Style::Cloze => CardType::Cloze,
    }
  }
}

impl FromStr for Style {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "q/a" | "qa" | "q&a" => Ok(Style::Qa),
      "definition" => Ok(Style::Definition),
      "cloze" => Ok(Style::Cloze),
      _ => Err(format!("unknown style '{s}'")),
    }
  }
}

impl TryFrom<String> for Style {
  type Error = String;
  fn try_from(s: String) -> Result<Self, Self::Error> {
    s.parse()
  }
}

impl From<Style> for String {
  fn from(s: Style) -> String {
    s.label().to_string()
  }
}

impl fmt::Display for Style {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

/// One flashcard. Immutable once built; construction goes through the card schema
/// so every instance satisfies it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Map<String, serde_json::Value>")]
pub struct Card {
  #[serde(rename = "type")]
  card_type: CardType,
  difficulty: Difficulty,
  question: String,
  answer: String,
}

impl Card {
  pub fn new(
    card_type: CardType,
    difficulty: Difficulty,
    question: impl Into<String>,
    answer: impl Into<String>,
  ) -> Result<Self, Rejection> {
    let question: String = question.into();
    let answer: String = answer.into();
    crate::schema::build_card(card_type, difficulty, &question, &answer)
  }

  /// Only the schema module calls this, after checking every rule.
  pub(crate) fn from_validated(
    card_type: CardType,
    difficulty: Difficulty,
    question: String,
    answer: String,
  ) -> Self {
    Self { card_type, difficulty, question, answer }
  }

  pub fn card_type(&self) -> CardType { self.card_type }
  pub fn difficulty(&self) -> Difficulty { self.difficulty }
  pub fn question(&self) -> &str { &self.question }
  pub fn answer(&self) -> &str { &self.answer }
}

impl TryFrom<serde_json::Map<String, serde_json::Value>> for Card {
  type Error = Rejection;
  fn try_from(map: serde_json::Map<String, serde_json::Value>) -> Result<Self, Self::Error> {
    crate::schema::validate_candidate(&map)
  }
}

#[derive(Clone, Debug)]
pub struct GenerationRequest {
  pub text: String,
  pub count: usize,
  pub style: Style,
  pub difficulty: Difficulty,
  pub use_llm: bool,
}

/// Which path actually produced the cards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
  /// The model returned at least the requested number of valid cards.
  Llm,
  /// The model returned some valid cards, but fewer than requested.
  LlmPartial,
  Fallback,
}

impl Mode {
  pub fn as_str(&self) -> &'static str {
    match self {
      Mode::Llm => "llm",
      Mode::LlmPartial => "llm_partial",
      Mode::Fallback => "fallback",
    }
  }
}

impl fmt::Display for Mode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Clone, Debug, Serialize)]
pub struct GenerationResult {
  pub cards: Vec<Card>,
  pub mode: Mode,
  /// Unparsed model reply, kept for debugging. Always empty for fallback results.
  pub raw: String,
}

/// Request bounds. These are UX policy, so they live in config rather than code.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Limits {
  pub min_chars: usize,
  pub min_cards: usize,
  pub max_cards: usize,
}

impl Default for Limits {
  fn default() -> Self {
    Self { min_chars: 120, min_cards: 3, max_cards: 30 }
  }
}

impl Limits {
  pub fn validate(&self, req: &GenerationRequest) -> Result<(), ValidationError> {
    let text = req.text.trim();
    if text.is_empty() {
      return Err(ValidationError::EmptyText);
    }
    let actual = text.chars().count();
    if actual < self.min_chars {
      return Err(ValidationError::TooShort { min: self.min_chars, actual });
    }
    if req.count < self.min_cards || req.count > self.max_cards {
      return Err(ValidationError::CountOutOfRange {
        count: req.count,
        min: self.min_cards,
        max: self.max_cards,
      });
    }
    Ok(())
  }
}
