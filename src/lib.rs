//! Flashcard Tutor: turn study notes into flashcards and quiz yourself on them.
//!
//! Generation goes through [`generator::Generator`], which asks an LLM when one is
//! configured and degrades to the deterministic [`fallback`] generator otherwise.
//! The HTTP surface lives in [`routes`].

pub mod config;
pub mod domain;
pub mod error;
pub mod fallback;
pub mod generator;
pub mod logic;
pub mod openai;
pub mod parser;
pub mod protocol;
pub mod quiz;
pub mod routes;
pub mod schema;
pub mod state;
pub mod telemetry;
pub mod transport;
pub mod util;
