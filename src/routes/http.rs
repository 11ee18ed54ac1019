//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{
  extract::{Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument, warn};

use crate::error::{QuizError, ValidationError};
use crate::logic::{generate_cards, quiz_action, start_quiz, QuizAction};
use crate::protocol::*;
use crate::state::AppState;

/// Error body `{ "error": "..." }` with a matching status code.
#[derive(Debug)]
pub struct ApiError {
  pub status: StatusCode,
  pub message: String,
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    (self.status, Json(ErrorOut { error: self.message })).into_response()
  }
}

impl From<ValidationError> for ApiError {
  fn from(e: ValidationError) -> Self {
    Self { status: StatusCode::BAD_REQUEST, message: e.to_string() }
  }
}

impl From<QuizError> for ApiError {
  fn from(e: QuizError) -> Self {
    let status = match e {
      QuizError::NoCards => StatusCode::BAD_REQUEST,
      QuizError::UnknownSession(_) => StatusCode::NOT_FOUND,
      QuizError::Finished | QuizError::AlreadyMarked => StatusCode::CONFLICT,
    };
    Self { status, message: e.to_string() }
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, llm: state.generator.has_transport() })
}

#[instrument(level = "info", skip(state, body), fields(text_len = body.text.len(), count = ?body.count, use_llm = body.use_llm))]
pub async fn http_post_cards(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GenerateIn>,
) -> Result<Json<GenerateOut>, ApiError> {
  match generate_cards(&state, body).await {
    Ok(out) => {
      info!(target: "flashcards", mode = %out.mode, cards = out.cards.len(), "HTTP cards served");
      Ok(Json(out))
    }
    Err(e) => {
      warn!(target: "flashcards", error = %e, "HTTP cards rejected");
      Err(e.into())
    }
  }
}

#[instrument(level = "info", skip(state, body), fields(cards = body.cards.len()))]
pub async fn http_post_quiz(
  State(state): State<Arc<AppState>>,
  Json(body): Json<StartQuizIn>,
) -> Result<Json<QuizOut>, ApiError> {
  Ok(Json(start_quiz(&state, body.cards).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_quiz(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<QuizOut>, ApiError> {
  Ok(Json(quiz_action(&state, &id, QuizAction::Show).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_reveal(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<QuizOut>, ApiError> {
  Ok(Json(quiz_action(&state, &id, QuizAction::Reveal).await?))
}

#[instrument(level = "info", skip(state, body), fields(correct = body.correct))]
pub async fn http_post_mark(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<MarkIn>,
) -> Result<Json<QuizOut>, ApiError> {
  let view = quiz_action(&state, &id, QuizAction::Mark(body.correct)).await?;
  info!(target: "quiz", %id, correct = body.correct, progress = %view.progress, "HTTP answer marked");
  Ok(Json(view))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_next(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<QuizOut>, ApiError> {
  Ok(Json(quiz_action(&state, &id, QuizAction::Next).await?))
}
