//! Card schema shared by the model path and the deterministic path.
//!
//! Untyped candidates (JSON objects from a model reply) are decoded first and then
//! mapped into `Card` here. Enum fields default when missing or unknown; the
//! question and answer are required and never invented.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::domain::{Card, CardType, Difficulty};
use crate::error::Rejection;

/// Canonical blank marker in cloze questions.
pub const BLANK: &str = "_____";

/// Longest definition "question" still accepted as a term rather than a sentence.
pub const MAX_TERM_WORDS: usize = 12;

const TYPE_KEYS: &[&str] = &["type", "card_type", "kind"];
const DIFFICULTY_KEYS: &[&str] = &["difficulty", "level"];
const QUESTION_KEYS: &[&str] = &["question", "front", "q", "prompt"];
const ANSWER_KEYS: &[&str] = &["answer", "back", "a", "response"];

static BLANK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"_{3,}").unwrap());

// Anki-style deletion, `{{c1::text}}` or `{{c1::text::hint}}`.
static CLOZE_TAG_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"\{\{c\d+::(?:[^}]*?)(?:::[^}]*)?\}\}").unwrap());

/// Validate one raw candidate into a `Card`.
pub fn validate_candidate(map: &Map<String, Value>) -> Result<Card, Rejection> {
  let card_type = text_field(map, TYPE_KEYS)
    .and_then(|s| CardType::parse_loose(&s))
    .unwrap_or_default();
  let difficulty = text_field(map, DIFFICULTY_KEYS)
    .and_then(|s| Difficulty::parse_loose(&s))
    .unwrap_or_default();
  let question = text_field(map, QUESTION_KEYS).ok_or(Rejection::MissingQuestion)?;
  let answer = text_field(map, ANSWER_KEYS).ok_or(Rejection::MissingAnswer)?;
  build_card(card_type, difficulty, &question, &answer)
}

/// Same as `validate_candidate` for an arbitrary JSON value.
pub fn validate_value(value: &Value) -> Result<Card, Rejection> {
  match value {
    Value::Object(map) => validate_candidate(map),
    _ => Err(Rejection::NotAnObject),
  }
}

/// Apply the per-type rules to already-typed fields.
pub fn build_card(
  card_type: CardType,
  difficulty: Difficulty,
  question: &str,
  answer: &str,
) -> Result<Card, Rejection> {
  let question = question.trim();
  if question.is_empty() {
    return Err(Rejection::MissingQuestion);
  }
  let answer = answer.trim();
  if answer.is_empty() {
    return Err(Rejection::MissingAnswer);
  }

  let question = match card_type {
    CardType::Qa => question.to_string(),
    CardType::Cloze => normalize_cloze(question)?,
    CardType::Definition => normalize_term(question)?,
  };

  Ok(Card::from_validated(card_type, difficulty, question, answer.to_string()))
}

/// Number of blank markers (runs of three or more underscores) in `s`.
pub fn count_blanks(s: &str) -> usize {
  BLANK_RE.find_iter(s).count()
}

fn normalize_cloze(question: &str) -> Result<String, Rejection> {
  let mut q = question.to_string();
  if count_blanks(&q) == 0 && CLOZE_TAG_RE.find_iter(&q).count() == 1 {
    q = CLOZE_TAG_RE.replace(&q, BLANK).into_owned();
  }
  let blanks = count_blanks(&q);
  if blanks != 1 {
    return Err(Rejection::ClozeBlanks(blanks));
  }
  Ok(BLANK_RE.replace(&q, BLANK).into_owned())
}

fn normalize_term(question: &str) -> Result<String, Rejection> {
  let term = question.trim_end_matches(['.', ':', ';']).trim_end();
  if term.is_empty() {
    return Err(Rejection::MissingQuestion);
  }
  let words = term.split_whitespace().count();
  if words > MAX_TERM_WORDS {
    return Err(Rejection::DefinitionNotTerm(words));
  }
  Ok(term.to_string())
}

/// First matching key (case-insensitive) holding a scalar, rendered as text.
fn text_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
  for key in keys {
    let found = map.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)).map(|(_, v)| v);
    match found {
      Some(Value::String(s)) => return Some(s.clone()),
      Some(Value::Number(n)) => return Some(n.to_string()),
      Some(Value::Bool(b)) => return Some(b.to_string()),
      _ => continue,
    }
  }
  None
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn obj(v: Value) -> Map<String, Value> {
    v.as_object().cloned().unwrap()
  }

  #[test]
  fn accepts_well_formed_candidate() {
    let card = validate_candidate(&obj(json!({
      "type": "QA", "difficulty": "Easy", "question": " Q1 ", "answer": "A1"
    })))
    .unwrap();
    assert_eq!(card.card_type(), CardType::Qa);
    assert_eq!(card.difficulty(), Difficulty::Easy);
    assert_eq!(card.question(), "Q1");
    assert_eq!(card.answer(), "A1");
  }

  #[test]
  fn defaults_unknown_enums() {
    let card = validate_candidate(&obj(json!({
      "type": "essay", "question": "Q", "answer": "A"
    })))
    .unwrap();
    assert_eq!(card.card_type(), CardType::Qa);
    assert_eq!(card.difficulty(), Difficulty::Medium);
  }

  #[test]
  fn rejects_empty_question_or_answer() {
    assert_eq!(
      validate_candidate(&obj(json!({"question": "   ", "answer": "A"}))),
      Err(Rejection::MissingQuestion)
    );
    assert_eq!(
      validate_candidate(&obj(json!({"question": "Q"}))),
      Err(Rejection::MissingAnswer)
    );
    assert_eq!(
      validate_candidate(&obj(json!({"question": "Q", "answer": null}))),
      Err(Rejection::MissingAnswer)
    );
  }

  #[test]
  fn accepts_aliases_and_numeric_answers() {
    let card = validate_candidate(&obj(json!({
      "Front": "Year the Berlin Wall fell?", "back": 1989
    })))
    .unwrap();
    assert_eq!(card.question(), "Year the Berlin Wall fell?");
    assert_eq!(card.answer(), "1989");
  }

  #[test]
  fn cloze_needs_exactly_one_blank() {
    let ok = build_card(CardType::Cloze, Difficulty::Hard, "Water boils at ___ degrees.", "100").unwrap();
    assert_eq!(ok.question(), "Water boils at _____ degrees.");
    assert_eq!(
      build_card(CardType::Cloze, Difficulty::Hard, "Water boils at 100 degrees.", "100"),
      Err(Rejection::ClozeBlanks(0))
    );
    assert_eq!(
      build_card(CardType::Cloze, Difficulty::Hard, "____ boils at ____ degrees.", "x"),
      Err(Rejection::ClozeBlanks(2))
    );
  }

  #[test]
  fn cloze_accepts_a_single_anki_deletion() {
    let card = build_card(
      CardType::Cloze,
      Difficulty::Medium,
      "The capital of France is {{c1::Paris::city}}.",
      "Paris",
    )
    .unwrap();
    assert_eq!(card.question(), "The capital of France is _____.");
  }

  #[test]
  fn definition_question_is_a_term() {
    let card = build_card(CardType::Definition, Difficulty::Medium, "Osmosis.", "Diffusion of water").unwrap();
    assert_eq!(card.question(), "Osmosis");
    let sentence = "Osmosis is the movement of water across a membrane from low to high solute concentration.";
    assert!(matches!(
      build_card(CardType::Definition, Difficulty::Medium, sentence, "x"),
      Err(Rejection::DefinitionNotTerm(_))
    ));
  }

  #[test]
  fn non_objects_are_rejected() {
    assert_eq!(validate_value(&json!("just text")), Err(Rejection::NotAnObject));
  }
}
