//! One-question-at-a-time quiz over a generated card list.
//!
//! Correctness is self-reported: the user reveals the answer and marks it right or
//! wrong. Each card can be marked once; `next` moves on and clears per-card flags.

use serde::Serialize;

use crate::domain::{Card, CardType, Difficulty};
use crate::error::QuizError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
  Correct,
  Incorrect,
}

/// One marked question.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuizRecord {
  pub question: String,
  pub answer: String,
  #[serde(rename = "type")]
  pub card_type: CardType,
  pub difficulty: Difficulty,
  pub outcome: Outcome,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Score {
  pub correct: usize,
  pub incorrect: usize,
  pub answered: usize,
  /// Percentage of answered questions marked correct; 0 when nothing was answered.
  pub accuracy: f64,
}

#[derive(Clone, Debug)]
pub struct QuizSession {
  cards: Vec<Card>,
  index: usize,
  revealed: bool,
  marked: bool,
  correct: usize,
  incorrect: usize,
  history: Vec<QuizRecord>,
  finished: bool,
}

impl QuizSession {
  pub fn new(cards: Vec<Card>) -> Result<Self, QuizError> {
    if cards.is_empty() {
      return Err(QuizError::NoCards);
    }
    Ok(Self {
      cards,
      index: 0,
      revealed: false,
      marked: false,
      correct: 0,
      incorrect: 0,
      history: Vec::new(),
      finished: false,
    })
  }

  /// Number of cards in the session.
  pub fn total(&self) -> usize { self.cards.len() }
  pub fn index(&self) -> usize { self.index }
  pub fn is_revealed(&self) -> bool { self.revealed }
  pub fn is_marked(&self) -> bool { self.marked }
  pub fn is_finished(&self) -> bool { self.finished }
  pub fn history(&self) -> &[QuizRecord] { &self.history }

  /// Card being asked, or `None` once the quiz is over.
  pub fn current(&self) -> Option<&Card> {
    if self.finished { None } else { self.cards.get(self.index) }
  }

  /// Show the current answer. Does not affect scoring.
  pub fn reveal(&mut self) -> Result<&str, QuizError> {
    if self.finished {
      return Err(QuizError::Finished);
    }
    self.revealed = true;
    self.cards.get(self.index).map(Card::answer).ok_or(QuizError::Finished)
  }

  /// Record a self-reported result for the current card.
  pub fn mark(&mut self, correct: bool) -> Result<Outcome, QuizError> {
    if self.finished {
      return Err(QuizError::Finished);
    }
    if self.marked {
      return Err(QuizError::AlreadyMarked);
    }
    let Some(card) = self.cards.get(self.index) else {
      self.finished = true;
      return Err(QuizError::Finished);
    };

    let result = if correct { Outcome::Correct } else { Outcome::Incorrect };
    match result {
      Outcome::Correct => self.correct += 1,
      Outcome::Incorrect => self.incorrect += 1,
    }
    self.history.push(QuizRecord {
      question: card.question().to_string(),
      answer: card.answer().to_string(),
      card_type: card.card_type(),
      difficulty: card.difficulty(),
      outcome: result,
    });
    self.marked = true;
    Ok(result)
  }

  /// Advance to the next card. Returns `None` when the quiz just finished.
  pub fn next(&mut self) -> Result<Option<&Card>, QuizError> {
    if self.finished {
      return Err(QuizError::Finished);
    }
    self.index += 1;
    self.revealed = false;
    self.marked = false;
    if self.index >= self.cards.len() {
      self.finished = true;
      return Ok(None);
    }
    Ok(self.cards.get(self.index))
  }

  pub fn score(&self) -> Score {
    let answered = self.correct + self.incorrect;
    let accuracy = if answered == 0 {
      0.0
    } else {
      self.correct as f64 / answered as f64 * 100.0
    };
    Score { correct: self.correct, incorrect: self.incorrect, answered, accuracy }
  }

  /// "Question 2 / 10", or "Finished! 10 / 10".
  pub fn progress(&self) -> String {
    let total = self.cards.len();
    if self.finished {
      format!("Finished! {total} / {total}")
    } else {
      format!("Question {} / {}", self.index + 1, total)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn cards(n: usize) -> Vec<Card> {
    (1..=n)
      .map(|i| Card::new(CardType::Qa, Difficulty::Medium, format!("Q{i}"), format!("A{i}")).unwrap())
      .collect()
  }

  #[test]
  fn empty_session_is_rejected() {
    assert_eq!(QuizSession::new(Vec::new()).unwrap_err(), QuizError::NoCards);
  }

  #[test]
  fn walks_through_cards_and_scores() {
    let mut quiz = QuizSession::new(cards(3)).unwrap();
    assert_eq!(quiz.total(), 3);
    assert_eq!(quiz.progress(), "Question 1 / 3");
    assert_eq!(quiz.current().unwrap().question(), "Q1");

    assert_eq!(quiz.reveal().unwrap(), "A1");
    assert!(quiz.is_revealed());
    assert_eq!(quiz.mark(true).unwrap(), Outcome::Correct);
    assert_eq!(quiz.mark(false), Err(QuizError::AlreadyMarked));

    assert_eq!(quiz.next().unwrap().unwrap().question(), "Q2");
    assert!(!quiz.is_revealed() && !quiz.is_marked());
    quiz.mark(false).unwrap();

    quiz.next().unwrap();
    // Skipping a card without marking is allowed.
    assert!(quiz.next().unwrap().is_none());
    assert!(quiz.is_finished());
    assert_eq!(quiz.progress(), "Finished! 3 / 3");
    assert!(quiz.current().is_none());

    let score = quiz.score();
    assert_eq!((score.correct, score.incorrect, score.answered), (1, 1, 2));
    assert!((score.accuracy - 50.0).abs() < f64::EPSILON);
    assert_eq!(quiz.history().len(), 2);
    assert_eq!(quiz.history()[1].outcome, Outcome::Incorrect);
  }

  #[test]
  fn finished_quiz_rejects_actions() {
    let mut quiz = QuizSession::new(cards(1)).unwrap();
    assert!(quiz.next().unwrap().is_none());
    assert_eq!(quiz.reveal(), Err(QuizError::Finished));
    assert_eq!(quiz.mark(true), Err(QuizError::Finished));
    assert_eq!(quiz.next().unwrap_err(), QuizError::Finished);
  }

  #[test]
  fn accuracy_is_zero_before_any_answer() {
    let quiz = QuizSession::new(cards(2)).unwrap();
    assert_eq!(quiz.score().accuracy, 0.0);
  }
}
