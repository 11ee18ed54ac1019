//! Public protocol structs for the HTTP API (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{Card, Difficulty, Mode, Style};
use crate::quiz::{QuizRecord, Score};

//
// Card generation
//

#[derive(Debug, Deserialize)]
pub struct GenerateIn {
    pub text: String,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub style: Option<Style>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(rename = "useLlm", default = "default_true")]
    pub use_llm: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct GenerateOut {
    pub cards: Vec<Card>,
    pub mode: Mode,
    /// Unmodified model reply; empty for fallback results.
    pub raw: String,
    pub status: String,
}

//
// Quiz
//

#[derive(Debug, Deserialize)]
pub struct StartQuizIn {
    pub cards: Vec<Card>,
}

#[derive(Debug, Deserialize)]
pub struct MarkIn {
    pub correct: bool,
}

/// Snapshot of a quiz session after an action.
#[derive(Debug, Serialize)]
pub struct QuizOut {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub progress: String,
    pub index: usize,
    pub total: usize,
    /// Current question; absent once finished.
    pub question: Option<String>,
    /// Present only after reveal.
    pub answer: Option<String>,
    pub revealed: bool,
    pub marked: bool,
    pub finished: bool,
    pub score: Score,
    pub feedback: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<QuizRecord>,
}

//
// Misc
//

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    /// Whether an LLM client is configured.
    pub llm: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub error: String,
}
