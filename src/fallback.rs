//! Offline flashcard generation.
//!
//! Flow:
//! 1) Split the text into sentences, dropping headers and other boilerplate lines.
//! 2) Score every sentence as a card candidate (definitions, numbers, enumerations,
//!    plausible length).
//! 3) Stable-sort by score so identical input always yields identical cards.
//! 4) Render the best candidates in the requested style until `count` is reached.
//!
//! No network, no randomness. Short sources produce fewer cards, never padding.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument};

use crate::domain::{Card, Difficulty, Style};
use crate::schema::BLANK;

/// Segments shorter than this are merged into the following one.
pub const MIN_SEGMENT_CHARS: usize = 25;
/// Sentences with fewer words are never turned into cards.
pub const MIN_WORDS: usize = 4;
/// Lines without terminal punctuation and at most this many words are headers.
const MAX_HEADER_WORDS: usize = 6;

static DEFINITION_RE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"^(?P<term>[\w'’()\-]+(?:\s+[\w'’()\-]+){0,4}?),?\s+(?P<verb>is defined as|are defined as|is known as|are known as|refers to|refer to|means|is|are)\s+(?P<def>\S.*)$",
  )
  .unwrap()
});

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+(?:[.,]\d+)*\b%?").unwrap());

static ENUMERATION_RE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?i)\b(first|second|third|fourth|finally|two|three|four|five|six|seven|eight|nine|ten|several|types|kinds|stages|steps|phases|categories|includes?)\b",
  )
  .unwrap()
});

static BULLET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:[-*+•]|\d+[.)])\s+").unwrap());

static PAGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^page\s+\d+").unwrap());

const STOPWORDS: &[&str] = &[
  "a", "about", "after", "all", "also", "although", "an", "and", "any", "are", "as", "at",
  "be", "because", "been", "before", "being", "between", "both", "but", "by", "can", "could",
  "did", "do", "does", "during", "each", "either", "for", "from", "had", "has", "have", "he",
  "her", "here", "his", "how", "however", "i", "if", "in", "into", "is", "it", "its", "many",
  "may", "more", "most", "much", "must", "neither", "no", "nor", "not", "of", "on", "once",
  "one", "only", "or", "other", "our", "she", "should", "since", "so", "some", "such", "than",
  "that", "the", "their", "them", "then", "there", "these", "they", "this", "those", "through",
  "thus", "to", "under", "until", "upon", "very", "was", "we", "were", "what", "when", "where",
  "whether", "which", "while", "who", "whom", "whose", "why", "will", "with", "within",
  "without", "would", "yet", "you", "your",
];

/// First words that make a "<term> is ..." match a clause rather than a definition.
const TERM_BLOCKERS: &[&str] = &[
  "it", "this", "that", "these", "those", "there", "here", "he", "she", "they", "we", "you",
  "i", "which", "what", "who", "why", "how", "when", "where", "one", "each", "another", "such",
  "in", "on", "at", "for", "if", "because", "while", "although", "after", "before", "however",
  "but", "and", "so", "also", "thus", "today",
];

/// A scored sentence, tagged with its position in the source text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
  pub index: usize,
  pub sentence: String,
  pub score: i32,
}

/// `<term> <verb> <clause>` split of a definitional sentence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Definition<'a> {
  /// Term as written, including any leading article.
  pub term: &'a str,
  pub plural: bool,
  pub clause: &'a str,
}

/// Produce up to `count` cards from `text` without any external call.
#[instrument(level = "debug", skip_all, fields(text_len = text.len(), %count, %style, %difficulty))]
pub fn generate(text: &str, count: usize, style: Style, difficulty: Difficulty) -> Vec<Card> {
  let mut candidates = rank_candidates(text);
  if candidates.is_empty() {
    // Nothing survived segmentation; try the text as a single unit.
    let whole = collapse_whitespace(text);
    if let Some(score) = score_sentence(&whole) {
      candidates.push(Candidate { index: 0, sentence: whole, score });
    }
  }

  let mut cards = Vec::with_capacity(count.min(candidates.len()));
  let mut seen = HashSet::new();
  for cand in &candidates {
    if cards.len() >= count {
      break;
    }
    match render_unseen(&cand.sentence, style, difficulty, &seen) {
      Some(card) => {
        seen.insert(card.question().to_lowercase());
        cards.push(card);
      }
      None => debug!(target: "flashcards", index = cand.index, "Sentence gave no new card"),
    }
  }

  debug!(target: "flashcards", candidates = candidates.len(), produced = cards.len(), "Fallback generation done");
  cards
}

/// Segment, score and rank. Ties keep source order.
pub fn rank_candidates(text: &str) -> Vec<Candidate> {
  let mut candidates: Vec<Candidate> = segment_sentences(text)
    .into_iter()
    .enumerate()
    .filter_map(|(index, sentence)| {
      score_sentence(&sentence).map(|score| Candidate { index, sentence, score })
    })
    .collect();
  candidates.sort_by(|a, b| b.score.cmp(&a.score));
  candidates
}

/// Split text into sentences. Boilerplate lines are dropped, wrapped lines joined,
/// and fragments shorter than `MIN_SEGMENT_CHARS` merged into their neighbour.
pub fn segment_sentences(text: &str) -> Vec<String> {
  let mut blocks: Vec<String> = Vec::new();
  let mut block = String::new();

  for raw in text.lines() {
    let collapsed = collapse_whitespace(raw);
    if collapsed.is_empty() {
      flush(&mut block, &mut blocks);
      continue;
    }
    let (line, bulleted) = strip_bullet(&collapsed);
    if !bulleted && continues(&block, line) {
      block.push(' ');
      block.push_str(line);
      continue;
    }
    flush(&mut block, &mut blocks);
    if is_boilerplate(line) {
      continue;
    }
    block.push_str(line);
  }
  flush(&mut block, &mut blocks);

  let pieces = blocks.iter().flat_map(|b| split_block(b)).collect();
  merge_short(pieces)
}

/// Score a sentence, or `None` when it can never make a card.
pub fn score_sentence(sentence: &str) -> Option<i32> {
  let words = sentence.split_whitespace().count();
  if words < MIN_WORDS || !sentence.chars().any(char::is_alphabetic) {
    return None;
  }
  let mut score = 0;
  if find_definition(sentence).is_some() {
    score += 3;
  }
  if NUMBER_RE.is_match(sentence) {
    score += 2;
  }
  if ENUMERATION_RE.is_match(sentence) {
    score += 1;
  }
  if (6..=40).contains(&words) {
    score += 1;
  }
  if words > 60 {
    score -= 1;
  }
  Some(score)
}

/// Recognize `<Term> is/are/refers to/means ...`.
pub fn find_definition(sentence: &str) -> Option<Definition<'_>> {
  let caps = DEFINITION_RE.captures(sentence)?;
  let term = caps.name("term")?.as_str();
  let verb = caps.name("verb")?.as_str();
  let clause = caps.name("def")?.as_str().trim();

  let first = term.split_whitespace().next()?.to_lowercase();
  let last = term.split_whitespace().last()?.to_lowercase();
  if TERM_BLOCKERS.contains(&first.as_str()) || (last != first && is_stopword(&last)) {
    return None;
  }
  if clause.split_whitespace().count() < 2 || sentence.trim_end().ends_with('?') {
    return None;
  }
  let plural = verb.starts_with("are") || verb == "refer to";
  Some(Definition { term, plural, clause })
}

/// Most salient phrase: the longest run of capitalized words, else the longest
/// content word. Ties go to the earliest.
pub fn key_phrase(sentence: &str) -> Option<String> {
  key_phrases(sentence).into_iter().next()
}

/// Every candidate phrase in salience order: capitalized runs by length, then
/// content words by length. Ties keep sentence order; repeats are dropped.
pub fn key_phrases(sentence: &str) -> Vec<String> {
  let mut runs: Vec<Vec<&str>> = Vec::new();
  let mut run: Vec<&str> = Vec::new();

  for raw in sentence.split_whitespace() {
    let word = raw.trim_matches(|c: char| !c.is_alphanumeric());
    let cut_before = raw.len() != raw.trim_start_matches(|c: char| !c.is_alphanumeric()).len();
    let cut_after = raw.len() != raw.trim_end_matches(|c: char| !c.is_alphanumeric()).len();
    let capitalized = word.chars().next().map_or(false, char::is_uppercase) && !is_stopword(word);

    if !capitalized {
      close_run(&mut run, &mut runs);
      continue;
    }
    if cut_before {
      close_run(&mut run, &mut runs);
    }
    run.push(word);
    if cut_after {
      close_run(&mut run, &mut runs);
    }
  }
  close_run(&mut run, &mut runs);
  runs.sort_by(|a, b| b.len().cmp(&a.len()));

  let mut words: Vec<&str> = sentence
    .split_whitespace()
    .map(|raw| raw.trim_matches(|c: char| !c.is_alphanumeric()))
    .filter(|word| word.chars().filter(|c| c.is_alphabetic()).count() >= 4 && !is_stopword(word))
    .collect();
  words.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));

  let mut phrases: Vec<String> = Vec::new();
  for phrase in runs.iter().map(|r| r.join(" ")).chain(words.into_iter().map(str::to_string)) {
    if !phrases.iter().any(|p| p.eq_ignore_ascii_case(&phrase)) {
      phrases.push(phrase);
    }
  }
  phrases
}

/// Render one sentence as a card in `style`.
pub fn render(sentence: &str, style: Style, difficulty: Difficulty) -> Option<Card> {
  render_unseen(sentence, style, difficulty, &HashSet::new())
}

/// Like `render`, but when the sentence has no definition, walk down its key phrases
/// until the question is not in `seen` (lowercased questions already produced).
fn render_unseen(sentence: &str, style: Style, difficulty: Difficulty, seen: &HashSet<String>) -> Option<Card> {
  let def = find_definition(sentence);
  let options: Vec<(String, String)> = match (style, &def) {
    (Style::Qa, Some(d)) => {
      let verb = if d.plural { "are" } else { "is" };
      vec![(format!("What {} {}?", verb, lowercase_article(d.term)), sentence.to_string())]
    }
    (Style::Qa, None) => key_phrases(sentence)
      .into_iter()
      .map(|phrase| (format!("What does the text say about {phrase}?"), sentence.to_string()))
      .collect(),
    (Style::Definition, Some(d)) => vec![(strip_article(d.term).to_string(), capitalize(d.clause))],
    (Style::Definition, None) => key_phrases(sentence)
      .into_iter()
      .map(|phrase| (phrase, sentence.to_string()))
      .collect(),
    (Style::Cloze, _) => cloze_spans(sentence, def.as_ref())
      .into_iter()
      .map(|(start, end)| {
        (format!("{}{}{}", &sentence[..start], BLANK, &sentence[end..]), sentence[start..end].to_string())
      })
      .collect(),
  };

  options
    .into_iter()
    .filter(|(question, _)| !seen.contains(&question.to_lowercase()))
    .find_map(|(question, answer)| Card::new(style.card_type(), difficulty, question, answer).ok())
}

/// Byte ranges to mask, best first: the first number, else the defined term, else
/// each key phrase at its first whole-word occurrence.
fn cloze_spans(sentence: &str, def: Option<&Definition<'_>>) -> Vec<(usize, usize)> {
  if let Some(m) = NUMBER_RE.find(sentence) {
    return vec![(m.start(), m.end())];
  }
  if let Some(d) = def {
    let bare = strip_article(d.term);
    return vec![(d.term.len() - bare.len(), d.term.len())];
  }
  key_phrases(sentence)
    .iter()
    .filter_map(|phrase| find_whole_word(sentence, phrase))
    .collect()
}

/// First occurrence of `phrase` that is not part of a longer word.
fn find_whole_word(sentence: &str, phrase: &str) -> Option<(usize, usize)> {
  let re = Regex::new(&format!(r"\b{}\b", regex::escape(phrase))).ok()?;
  re.find(sentence).map(|m| (m.start(), m.end()))
}

fn close_run<'a>(run: &mut Vec<&'a str>, runs: &mut Vec<Vec<&'a str>>) {
  if !run.is_empty() {
    runs.push(std::mem::take(run));
  }
}

fn split_block(block: &str) -> Vec<String> {
  let chars: Vec<(usize, char)> = block.char_indices().collect();
  let mut out = Vec::new();
  let mut start = 0;

  for i in 0..chars.len() {
    if !matches!(chars[i].1, '.' | '!' | '?') {
      continue;
    }
    let mut j = i + 1;
    while j < chars.len() && is_closing_mark(chars[j].1) {
      j += 1;
    }
    if j >= chars.len() || !chars[j].1.is_whitespace() {
      continue;
    }
    let mut k = j;
    while k < chars.len() && chars[k].1.is_whitespace() {
      k += 1;
    }
    if k < chars.len() && chars[k].1.is_uppercase() {
      let piece = block[start..chars[j].0].trim();
      if !piece.is_empty() {
        out.push(piece.to_string());
      }
      start = chars[k].0;
    }
  }

  let rest = block[start..].trim();
  if !rest.is_empty() {
    out.push(rest.to_string());
  }
  out
}

fn merge_short(pieces: Vec<String>) -> Vec<String> {
  let mut out: Vec<String> = Vec::new();
  let mut carry = String::new();
  for piece in pieces {
    let merged = if carry.is_empty() { piece } else { format!("{carry} {piece}") };
    if merged.chars().count() < MIN_SEGMENT_CHARS {
      carry = merged;
    } else {
      out.push(merged);
      carry.clear();
    }
  }
  if !carry.is_empty() {
    match out.last_mut() {
      Some(last) => {
        last.push(' ');
        last.push_str(&carry);
      }
      None => out.push(carry),
    }
  }
  out
}

fn flush(block: &mut String, blocks: &mut Vec<String>) {
  if !block.is_empty() {
    blocks.push(std::mem::take(block));
  }
}

/// A lowercase line after an unfinished one is a hard-wrapped continuation.
fn continues(block: &str, line: &str) -> bool {
  !block.is_empty()
    && !ends_with_terminal(block)
    && line.chars().next().map_or(false, char::is_lowercase)
}

fn is_boilerplate(line: &str) -> bool {
  let words = line.split_whitespace().count();
  words <= 1
    || !line.chars().any(char::is_alphabetic)
    || PAGE_RE.is_match(line)
    || (!ends_with_terminal(line) && words <= MAX_HEADER_WORDS)
}

fn strip_bullet(line: &str) -> (&str, bool) {
  match BULLET_RE.find(line) {
    Some(m) => (&line[m.end()..], true),
    None => (line, false),
  }
}

fn ends_with_terminal(s: &str) -> bool {
  s.trim_end()
    .trim_end_matches(is_closing_mark)
    .ends_with(['.', '!', '?'])
}

fn is_closing_mark(c: char) -> bool {
  matches!(c, '"' | '\'' | ')' | ']' | '”' | '’')
}

fn is_stopword(word: &str) -> bool {
  STOPWORDS.contains(&word.to_lowercase().as_str())
}

fn collapse_whitespace(s: &str) -> String {
  s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_article(term: &str) -> &str {
  for article in ["the ", "a ", "an "] {
    if let Some(head) = term.get(..article.len()) {
      if head.eq_ignore_ascii_case(article) && term.len() > article.len() {
        return term[article.len()..].trim_start();
      }
    }
  }
  term
}

fn lowercase_article(term: &str) -> String {
  let bare = strip_article(term);
  if bare.len() == term.len() {
    return term.to_string();
  }
  let article = term[..term.len() - bare.len()].trim().to_lowercase();
  format!("{article} {bare}")
}

fn capitalize(s: &str) -> String {
  let mut chars = s.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}
