//! Question answering over the record store.
//!
//! Retrieval is keyword matching against the store; an LLM, when one is
//! configured, turns the matched records into a prose answer.

pub mod ask;
pub mod types;

pub use ask::{AnswerOptions, Answerer};
pub use types::{Answer, AnswerLink, Query, FALLBACK_ANSWER, RECORD_LINK_PREFIX};
