//! Record store and question answering for the Virtual TA.
//!
//! Course material and forum posts are stored as [`ContentRecord`]s in a
//! single SQLite file. The [`Answerer`] retrieves matching records by
//! keyword and turns them into an [`Answer`] with source links.

pub mod chunker;
pub mod course;
pub mod keywords;
pub mod parser;
pub mod rag;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use course::{load_course, CourseLoadOptions, CourseLoadReport};
pub use rag::{Answer, AnswerLink, AnswerOptions, Answerer, Query, FALLBACK_ANSWER};
pub use store::{ContentStore, SqliteStore};
pub use types::{ContentRecord, ScoredRecord, SourceType, StoreStats};

use std::sync::Arc;

use vta_core::{AppConfig, AppError, AppResult};
use vta_llm::create_client;
use vta_prompt::{load_prompt, DEFAULT_ANSWER_PROMPT_ID};

/// Open the record store configured for this workspace.
pub fn open_store(config: &AppConfig) -> AppResult<SqliteStore> {
    let path = config.database_path();
    Ok(SqliteStore::open(&path)?.with_max_keywords(config.retrieval.max_keywords))
}

impl Answerer {
    /// Build an answerer from configuration: the workspace prompt (or the
    /// built-in one) and the configured LLM provider, if any.
    pub fn from_config(store: Arc<dyn ContentStore>, config: &AppConfig) -> AppResult<Self> {
        let prompt = load_prompt(&config.workspace, DEFAULT_ANSWER_PROMPT_ID)?;
        let answerer = Answerer::new(store, prompt, AnswerOptions::from(&config.retrieval));

        let endpoint = config.provider_endpoint(&config.provider);
        let api_key = config.resolve_api_key(&config.provider);
        let client = create_client(&config.provider, endpoint.as_deref(), api_key.as_deref())
            .map_err(|e| AppError::Config(format!("Failed to create LLM client: {}", e)))?;

        match client {
            Some(client) => {
                tracing::info!(
                    "Answer synthesis via {} (model: {})",
                    client.provider_name(),
                    config.model
                );
                Ok(answerer.with_llm(client, config.model.clone()))
            }
            None => {
                tracing::info!("No LLM provider configured, answers are composed from matches");
                Ok(answerer)
            }
        }
    }
}
