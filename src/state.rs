//! Application state: tutor config, the card generator and in-memory quiz sessions.
//!
//! Quiz sessions are keyed by a random uuid and live for the process lifetime.
//! The generator holds the optional OpenAI client; without OPENAI_API_KEY every
//! request takes the offline path.

use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::{load_config_from_env, TutorConfig};
use crate::generator::Generator;
use crate::openai::OpenAI;
use crate::quiz::QuizSession;

#[derive(Clone)]
pub struct AppState {
    pub config: TutorConfig,
    pub generator: Generator<OpenAI>,
    pub quizzes: Arc<RwLock<HashMap<String, QuizSession>>>,
}

impl AppState {
    /// Build state from env: load config, init OpenAI.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let config = load_config_from_env();

        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "flashcard_tutor", base_url = %oa.base_url, model = %oa.model, timeout = ?oa.timeout, "OpenAI enabled.");
        } else {
            info!(target: "flashcard_tutor", "OpenAI disabled (no OPENAI_API_KEY). Using offline generation.");
        }
        info!(
            target: "flashcard_tutor",
            min_chars = config.limits.min_chars,
            min_cards = config.limits.min_cards,
            max_cards = config.limits.max_cards,
            default_count = config.default_count,
            "Request limits"
        );

        let generator = Generator::new(openai, config.prompts.clone(), config.limits.clone());
        Self::with_generator(config, generator)
    }

    /// State around an explicit generator (tests, embedding).
    pub fn with_generator(config: TutorConfig, generator: Generator<OpenAI>) -> Self {
        Self {
            config,
            generator,
            quizzes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Store a new session and return its id.
    #[instrument(level = "debug", skip_all, fields(cards = session.total()))]
    pub async fn insert_quiz(&self, session: QuizSession) -> String {
        let id = Uuid::new_v4().to_string();
        self.quizzes.write().await.insert(id.clone(), session);
        id
    }

    /// Run `f` against the stored session under the write lock.
    /// Returns `None` for an unknown id.
    pub async fn update_quiz<R>(&self, id: &str, f: impl FnOnce(&mut QuizSession) -> R) -> Option<R> {
        let mut quizzes = self.quizzes.write().await;
        quizzes.get_mut(id).map(f)
    }
}
