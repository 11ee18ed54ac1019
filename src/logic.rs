//! Core behaviors behind the HTTP handlers.
//!
//! This includes:
//!   - Generating cards (text cleanup, request defaults, status line)
//!   - Starting quiz sessions and applying quiz actions
//!   - Building the quiz view returned to clients

use tracing::{debug, info, instrument};

use crate::domain::{Card, GenerationRequest, Mode};
use crate::error::{QuizError, ValidationError};
use crate::protocol::{GenerateIn, GenerateOut, QuizOut};
use crate::quiz::{Outcome, QuizSession};
use crate::state::AppState;
use crate::util::clean_study_text;

/// A user action on an existing quiz session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuizAction {
  Show,
  Reveal,
  Mark(bool),
  Next,
}

#[instrument(level = "info", skip(state, body), fields(text_len = body.text.len(), count = ?body.count, use_llm = body.use_llm))]
pub async fn generate_cards(state: &AppState, body: GenerateIn) -> Result<GenerateOut, ValidationError> {
  let req = GenerationRequest {
    text: clean_study_text(&body.text),
    count: body.count.unwrap_or(state.config.default_count),
    style: body.style.unwrap_or_default(),
    difficulty: body.difficulty.unwrap_or_default(),
    use_llm: body.use_llm,
  };

  let result = state.generator.generate(&req).await?;
  let status = status_message(result.cards.len(), result.mode);
  info!(target: "flashcards", mode = %result.mode, cards = result.cards.len(), "Cards generated");
  Ok(GenerateOut { cards: result.cards, mode: result.mode, raw: result.raw, status })
}

/// One-line summary shown next to the generated cards.
pub fn status_message(count: usize, mode: Mode) -> String {
  let noun = if count == 1 { "flashcard" } else { "flashcards" };
  match mode {
    Mode::Fallback => format!(
      "Generated {count} {noun}. Mode: {mode}. Using offline fallback generation (LLM disabled or unavailable)."
    ),
    Mode::LlmPartial => format!(
      "Generated {count} {noun}. Mode: {mode}. The model returned fewer cards than requested."
    ),
    Mode::Llm => format!("Generated {count} {noun}. Mode: {mode}."),
  }
}

#[instrument(level = "info", skip_all, fields(cards = cards.len()))]
pub async fn start_quiz(state: &AppState, cards: Vec<Card>) -> Result<QuizOut, QuizError> {
  let session = QuizSession::new(cards)?;
  let id = state.insert_quiz(session.clone()).await;
  info!(target: "quiz", %id, cards = session.total(), "Quiz started");
  Ok(quiz_view(id, &session, String::new()))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn quiz_action(state: &AppState, id: &str, action: QuizAction) -> Result<QuizOut, QuizError> {
  let applied = state
    .update_quiz(id, |session| -> Result<QuizOut, QuizError> {
      let feedback = apply_action(session, action)?;
      Ok(quiz_view(id.to_string(), session, feedback))
    })
    .await;

  match applied {
    Some(res) => {
      if let Err(e) = &res {
        debug!(target: "quiz", %id, ?action, error = %e, "Quiz action rejected");
      }
      res
    }
    None => Err(QuizError::UnknownSession(id.to_string())),
  }
}

/// Apply one action and return the feedback line for it.
fn apply_action(session: &mut QuizSession, action: QuizAction) -> Result<String, QuizError> {
  match action {
    QuizAction::Show => Ok(String::new()),
    QuizAction::Reveal => session.reveal().map(|answer| format!("Answer: {answer}")),
    QuizAction::Mark(correct) => session.mark(correct).map(|outcome| match outcome {
      Outcome::Correct => "Marked correct. Continue with the next question.".to_string(),
      Outcome::Incorrect => "Marked incorrect. Continue with the next question.".to_string(),
    }),
    QuizAction::Next => session.next().map(|card| match card {
      Some(_) => String::new(),
      None => "Quiz is finished.".to_string(),
    }),
  }
}

/// Client view of a session. The answer is only included once revealed.
pub fn quiz_view(session_id: String, session: &QuizSession, feedback: String) -> QuizOut {
  let current = session.current();
  QuizOut {
    session_id,
    progress: session.progress(),
    index: session.index().min(session.total()),
    total: session.total(),
    question: current.map(|c| c.question().to_string()),
    answer: current.filter(|_| session.is_revealed()).map(|c| c.answer().to_string()),
    revealed: session.is_revealed(),
    marked: session.is_marked(),
    finished: session.is_finished(),
    score: session.score(),
    feedback,
    history: if session.is_finished() { session.history().to_vec() } else { Vec::new() },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::TutorConfig;
  use crate::domain::{CardType, Difficulty, Style};
  use crate::generator::Generator;

  const NOTES: &str = "Photosynthesis is the process by which plants convert light energy into chemical energy.   \r\n\
    The mitochondria are the powerhouse of the cell.\r\n\r\n\r\n\
    Human cells contain 46 chromosomes arranged in 23 pairs. Ribosomes build proteins by reading messenger RNA.";

  fn state() -> AppState {
    let config = TutorConfig::default();
    let generator = Generator::offline(config.prompts.clone(), config.limits.clone());
    AppState::with_generator(config, generator)
  }

  fn body(text: &str, count: Option<usize>) -> GenerateIn {
    GenerateIn { text: text.into(), count, style: Some(Style::Qa), difficulty: Some(Difficulty::Easy), use_llm: true }
  }

  fn cards(n: usize) -> Vec<Card> {
    (1..=n)
      .map(|i| Card::new(CardType::Qa, Difficulty::Easy, format!("Q{i}"), format!("A{i}")).unwrap())
      .collect()
  }

  #[tokio::test]
  async fn generates_offline_with_status() {
    let out = generate_cards(&state(), body(NOTES, Some(3))).await.unwrap();
    assert_eq!(out.mode, Mode::Fallback);
    assert_eq!(out.cards.len(), 3);
    assert!(out.cards.iter().all(|c| c.difficulty() == Difficulty::Easy));
    assert!(out.status.starts_with("Generated 3 flashcards. Mode: fallback."));
    assert_eq!(out.raw, "");
  }

  #[tokio::test]
  async fn blank_text_is_a_validation_error() {
    let err = generate_cards(&state(), body(" \r\n\t ", None)).await.unwrap_err();
    assert_eq!(err, ValidationError::EmptyText);
  }

  #[tokio::test]
  async fn default_count_comes_from_config() {
    // Default of 10 is in range; four sentences yield fewer cards, never padding.
    let out = generate_cards(&state(), body(NOTES, None)).await.unwrap();
    assert!(!out.cards.is_empty() && out.cards.len() <= 10);
  }

  #[test]
  fn status_lines() {
    assert_eq!(status_message(1, Mode::Llm), "Generated 1 flashcard. Mode: llm.");
    assert!(status_message(2, Mode::LlmPartial).contains("fewer cards than requested"));
  }

  #[tokio::test]
  async fn quiz_flow_through_state() {
    let state = state();
    let view = start_quiz(&state, cards(2)).await.unwrap();
    assert_eq!(view.progress, "Question 1 / 2");
    assert_eq!(view.question.as_deref(), Some("Q1"));
    assert_eq!(view.answer, None);

    let id = view.session_id;
    let view = quiz_action(&state, &id, QuizAction::Reveal).await.unwrap();
    assert_eq!(view.answer.as_deref(), Some("A1"));
    assert_eq!(view.feedback, "Answer: A1");

    quiz_action(&state, &id, QuizAction::Mark(true)).await.unwrap();
    assert_eq!(quiz_action(&state, &id, QuizAction::Mark(true)).await.unwrap_err(), QuizError::AlreadyMarked);

    let view = quiz_action(&state, &id, QuizAction::Next).await.unwrap();
    assert_eq!(view.question.as_deref(), Some("Q2"));
    assert_eq!(view.answer, None);

    let view = quiz_action(&state, &id, QuizAction::Next).await.unwrap();
    assert!(view.finished);
    assert_eq!(view.feedback, "Quiz is finished.");
    assert_eq!(view.progress, "Finished! 2 / 2");
    assert_eq!(view.score.correct, 1);
    assert_eq!(view.history.len(), 1);
  }

  #[tokio::test]
  async fn quiz_errors() {
    let state = state();
    assert_eq!(start_quiz(&state, Vec::new()).await.unwrap_err(), QuizError::NoCards);
    assert_eq!(
      quiz_action(&state, "nope", QuizAction::Show).await.unwrap_err(),
      QuizError::UnknownSession("nope".into())
    );
  }
}
