//! Turn a model's raw reply into validated cards.
//!
//! Models wrap JSON in prose and code fences, leave trailing commas, or get cut off
//! mid-array. We isolate the first JSON value that holds cards, apply a couple of
//! bounded repairs, and run every element through the card schema. Bad elements are
//! dropped one by one; only a reply with no recoverable JSON is an error.

use serde_json::Value;
use tracing::{debug, instrument};

use crate::domain::Card;
use crate::error::ParseError;
use crate::schema;

/// Upper bound on candidate start positions tried per region.
const MAX_START_ATTEMPTS: usize = 64;

/// Fields a model may wrap the card array in.
const WRAPPER_KEYS: &[&str] = &["cards", "flashcards", "items", "data", "questions", "results"];

const FENCE: &str = "```";

/// Parse `raw` into cards. `Ok(vec![])` means JSON was found but no element was valid.
#[instrument(level = "debug", skip_all, fields(raw_len = raw.len()))]
pub fn parse_cards(raw: &str) -> Result<Vec<Card>, ParseError> {
  let items = extract_card_items(raw)?;
  let total = items.len();
  let cards: Vec<Card> = items
    .iter()
    .enumerate()
    .filter_map(|(index, item)| match schema::validate_value(item) {
      Ok(card) => Some(card),
      Err(reason) => {
        debug!(target: "flashcards", index, %reason, "Dropping invalid card from model reply");
        None
      }
    })
    .collect();
  debug!(target: "flashcards", total, valid = cards.len(), "Model reply parsed");
  Ok(cards)
}

/// Locate the card array in `raw`: fenced block first, then the whole reply.
pub fn extract_card_items(raw: &str) -> Result<Vec<Value>, ParseError> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return Err(ParseError::UnparsableResponse("empty reply".into()));
  }

  let mut regions = Vec::with_capacity(2);
  if let Some(body) = fenced_block(trimmed) {
    regions.push(body);
  }
  regions.push(trimmed);

  first_non_empty(regions.into_iter().map(items_in_region))
    .ok_or_else(|| ParseError::UnparsableResponse("no JSON array of cards found".into()))
}

/// Candidate start positions in order. An empty array only wins when nothing later
/// holds any elements (e.g. a `[]` in the prose before the real list).
fn items_in_region(region: &str) -> Option<Vec<Value>> {
  first_non_empty(
    region
      .char_indices()
      .filter(|(_, c)| matches!(c, '[' | '{'))
      .take(MAX_START_ATTEMPTS)
      .map(|(pos, _)| parse_at(&region[pos..]).and_then(card_items)),
  )
}

/// First non-empty hit, else the first empty one.
fn first_non_empty(hits: impl Iterator<Item = Option<Vec<Value>>>) -> Option<Vec<Value>> {
  let mut empty = None;
  for items in hits.flatten() {
    if !items.is_empty() {
      return Some(items);
    }
    empty.get_or_insert(items);
  }
  empty
}

/// Body of the first code fence, skipping a language tag. An unclosed fence runs to the end.
fn fenced_block(s: &str) -> Option<&str> {
  let open = s.find(FENCE)?;
  let rest = &s[open + FENCE.len()..];
  let close = rest.find(FENCE);
  let body_start = match rest.find('\n') {
    Some(nl) if close.map_or(true, |c| nl < c) => nl + 1,
    _ => 0,
  };
  let body = &rest[body_start..];
  let body = match body.find(FENCE) {
    Some(end) => &body[..end],
    None => body,
  };
  let body = body.trim();
  if body.is_empty() { None } else { Some(body) }
}

/// Pull the card elements out of a decoded value.
fn card_items(value: Value) -> Option<Vec<Value>> {
  match value {
    Value::Array(items) => holds_cards(&items).then_some(items),
    Value::Object(mut map) => {
      let key = WRAPPER_KEYS
        .iter()
        .find(|k| matches!(map.get(**k), Some(Value::Array(_))))
        .copied();
      if let Some(key) = key {
        if let Some(Value::Array(items)) = map.remove(key) {
          return Some(items);
        }
      }
      if map.keys().any(|k| k.eq_ignore_ascii_case("question") || k.eq_ignore_ascii_case("front")) {
        return Some(vec![Value::Object(map)]);
      }
      map
        .into_iter()
        .find_map(|(_, v)| match v {
          Value::Array(items) if !items.is_empty() && holds_cards(&items) => Some(items),
          _ => None,
        })
    }
    _ => None,
  }
}

fn holds_cards(items: &[Value]) -> bool {
  items.is_empty() || items.iter().any(Value::is_object)
}

enum Scan {
  /// Balanced value ending at this byte offset (exclusive).
  Complete(usize),
  /// Input ended inside the value.
  Open {
    closers: Vec<char>,
    in_string: bool,
    /// Offset just past the last complete top-level element.
    boundary: Option<usize>,
  },
  Mismatch,
}

/// Walk brackets from the start of `s`, ignoring anything inside strings.
fn scan(s: &str) -> Scan {
  let mut closers = Vec::new();
  let mut in_string = false;
  let mut escaped = false;
  let mut boundary = None;

  for (i, c) in s.char_indices() {
    if in_string {
      if escaped {
        escaped = false;
      } else if c == '\\' {
        escaped = true;
      } else if c == '"' {
        in_string = false;
      }
      continue;
    }
    match c {
      '"' => in_string = true,
      '[' => closers.push(']'),
      '{' => closers.push('}'),
      ']' | '}' => {
        if closers.pop() != Some(c) {
          return Scan::Mismatch;
        }
        match closers.len() {
          0 => return Scan::Complete(i + c.len_utf8()),
          1 => boundary = Some(i + c.len_utf8()),
          _ => {}
        }
      }
      _ => {}
    }
  }
  Scan::Open { closers, in_string, boundary }
}

/// Decode the JSON value starting at `s[0]`, with bounded repairs.
fn parse_at(s: &str) -> Option<Value> {
  match scan(s) {
    Scan::Complete(end) => {
      let slice = &s[..end];
      serde_json::from_str(slice)
        .ok()
        .or_else(|| serde_json::from_str(&strip_trailing_commas(slice)).ok())
    }
    Scan::Open { closers, in_string, boundary } => {
      let suffix: String = closers.iter().rev().collect();
      let mut text = s.trim_end().to_string();
      if in_string {
        text.push('"');
      }
      text.push_str(&suffix);
      if let Ok(v) = serde_json::from_str(&strip_trailing_commas(&text)) {
        return Some(v);
      }
      // Drop the incomplete trailing element and close the outer container.
      let cut = format!("{}{}", &s[..boundary?], closers.first()?);
      serde_json::from_str(&strip_trailing_commas(&cut)).ok()
    }
    Scan::Mismatch => None,
  }
}

/// Remove commas directly followed by a closing bracket (or end of input).
pub fn strip_trailing_commas(s: &str) -> String {
  let chars: Vec<char> = s.chars().collect();
  let mut out = String::with_capacity(s.len());
  let mut in_string = false;
  let mut escaped = false;

  for (i, &c) in chars.iter().enumerate() {
    if in_string {
      out.push(c);
      if escaped {
        escaped = false;
      } else if c == '\\' {
        escaped = true;
      } else if c == '"' {
        in_string = false;
      }
      continue;
    }
    if c == '"' {
      in_string = true;
    } else if c == ',' {
      let next = chars[i + 1..].iter().find(|n| !n.is_whitespace());
      if matches!(next, None | Some(']') | Some('}')) {
        continue;
      }
    }
    out.push(c);
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{CardType, Difficulty};

  #[test]
  fn strips_prose_and_code_fence() {
    let raw = "Here are your cards:\n```json\n[{\"type\":\"qa\",\"difficulty\":\"easy\",\"question\":\"Q1\",\"answer\":\"A1\"}]\n```";
    let cards = parse_cards(raw).unwrap();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].question(), "Q1");
    assert_eq!(cards[0].answer(), "A1");
    assert_eq!(cards[0].card_type(), CardType::Qa);
    assert_eq!(cards[0].difficulty(), Difficulty::Easy);
  }

  #[test]
  fn empty_and_prose_replies_are_unparsable() {
    assert!(matches!(parse_cards(""), Err(ParseError::UnparsableResponse(_))));
    assert!(matches!(parse_cards("   \n "), Err(ParseError::UnparsableResponse(_))));
    assert!(matches!(
      parse_cards("Sorry, I cannot create flashcards from this text."),
      Err(ParseError::UnparsableResponse(_))
    ));
  }

  #[test]
  fn bare_array_without_fence() {
    let raw = r#"[{"question":"What is ATP?","answer":"Energy currency"},{"question":"Q2","answer":"A2"}]"#;
    assert_eq!(parse_cards(raw).unwrap().len(), 2);
  }

  #[test]
  fn repairs_trailing_commas() {
    let raw = r#"[{"question":"Q1","answer":"A1",},{"question":"Q2","answer":"A2"},]"#;
    let cards = parse_cards(raw).unwrap();
    assert_eq!(cards.len(), 2);
  }

  #[test]
  fn closes_unterminated_array() {
    let raw = r#"Sure! [{"question":"Q1","answer":"A1"},{"question":"Q2","answer":"A2"}"#;
    let cards = parse_cards(raw).unwrap();
    assert_eq!(cards.len(), 2);
  }

  #[test]
  fn drops_element_cut_off_mid_way() {
    let raw = r#"[{"question":"Q1","answer":"A1"},{"question":"Q2","ans"#;
    let cards = parse_cards(raw).unwrap();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].question(), "Q1");
  }

  #[test]
  fn unwraps_well_known_fields() {
    let raw = r#"{"flashcards":[{"type":"definition","question":"Osmosis","answer":"Water diffusion"}]}"#;
    let cards = parse_cards(raw).unwrap();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].card_type(), CardType::Definition);
  }

  #[test]
  fn single_card_object() {
    let raw = r#"{"question":"Q1","answer":"A1"}"#;
    assert_eq!(parse_cards(raw).unwrap().len(), 1);
  }

  #[test]
  fn skips_bracketed_prose_before_the_array() {
    let raw = r#"As noted in [1] and [the notes], here you go: [{"question":"Q1","answer":"A1"}]"#;
    let cards = parse_cards(raw).unwrap();
    assert_eq!(cards.len(), 1);
  }

  #[test]
  fn empty_array_in_prose_does_not_hide_cards() {
    let raw = r#"Output format is a list like [] of objects. Here: [{"question":"Q1","answer":"A1"}]"#;
    let cards = parse_cards(raw).unwrap();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].question(), "Q1");
  }

  #[test]
  fn lone_empty_array_is_an_empty_result() {
    assert!(parse_cards("No cards could be made: []").unwrap().is_empty());
  }

  #[test]
  fn drops_invalid_elements_only() {
    let raw = r#"[
      {"question":"Q1","answer":"A1"},
      {"question":"","answer":"A2"},
      {"type":"cloze","question":"No blank here","answer":"x"},
      "not an object",
      {"type":"cloze","question":"Water boils at ____ degrees","answer":"100"}
    ]"#;
    let cards = parse_cards(raw).unwrap();
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[1].question(), "Water boils at _____ degrees");
  }

  #[test]
  fn all_invalid_yields_empty_list() {
    let raw = r#"[{"question":"","answer":""}]"#;
    assert!(parse_cards(raw).unwrap().is_empty());
  }

  #[test]
  fn brackets_inside_strings_are_ignored() {
    let raw = r#"[{"question":"What does [x] denote in set {A, B}?","answer":"An element"}]"#;
    let cards = parse_cards(raw).unwrap();
    assert_eq!(cards[0].question(), "What does [x] denote in set {A, B}?");
  }

  #[test]
  fn trailing_comma_stripper_leaves_strings_alone() {
    assert_eq!(strip_trailing_commas(r#"["a,]", "b",]"#), r#"["a,]", "b"]"#);
  }
}
