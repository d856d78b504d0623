//! Answer orchestration.
//!
//! Searches the store, builds context from the matched records, and either
//! asks the LLM to synthesize an answer or composes one from the matches.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use vta_core::config::RetrievalConfig;
use vta_core::{AppError, AppResult};
use vta_llm::{LlmClient, LlmRequest};
use vta_prompt::{build_prompt, PromptDefinition};

use crate::rag::types::{Answer, AnswerLink, Query, RECORD_LINK_PREFIX};
use crate::store::ContentStore;
use crate::types::{ContentRecord, ScoredRecord};

/// Maximum length of a link label built from record text.
const LINK_TEXT_CHARS: usize = 100;

/// Matches quoted in an extractive answer.
const EXTRACTIVE_MATCHES: usize = 3;

/// Separator between context entries.
const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Tuning for answer composition.
#[derive(Debug, Clone, Copy)]
pub struct AnswerOptions {
    pub top_n: usize,
    pub max_links: usize,
    pub snippet_chars: usize,
}

impl Default for AnswerOptions {
    fn default() -> Self {
        Self::from(&RetrievalConfig::default())
    }
}

impl From<&RetrievalConfig> for AnswerOptions {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            top_n: config.top_n.max(1),
            max_links: config.max_links,
            snippet_chars: config.snippet_chars.max(1),
        }
    }
}

/// Turns questions into answers using the record store.
pub struct Answerer {
    store: Arc<dyn ContentStore>,
    llm: Option<Arc<dyn LlmClient>>,
    model: String,
    prompt: PromptDefinition,
    options: AnswerOptions,
}

impl Answerer {
    /// Create an answerer that composes answers from matches only.
    pub fn new(store: Arc<dyn ContentStore>, prompt: PromptDefinition, options: AnswerOptions) -> Self {
        Self {
            store,
            llm: None,
            model: String::new(),
            prompt,
            options,
        }
    }

    /// Synthesize answers with `client` using `model`.
    pub fn with_llm(mut self, client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        self.llm = Some(client);
        self.model = model.into();
        self
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    /// Answer a question.
    ///
    /// An empty question is `MalformedQuery`. No matching content is not an
    /// error: the fixed fallback answer is returned with no links. LLM
    /// failures degrade to an extractive answer.
    pub async fn answer(&self, query: &Query) -> AppResult<Answer> {
        if query.question.trim().is_empty() {
            return Err(AppError::MalformedQuery("question must not be empty".to_string()));
        }

        tracing::info!("Answering question: {}", query.question.trim());

        let matches = self.store.search(&query.search_text(), self.options.top_n)?;
        if matches.is_empty() {
            tracing::info!("No matching content, returning fallback answer");
            return Ok(Answer::fallback());
        }

        let max_score = matches.first().map(|m| m.score).unwrap_or(0);
        tracing::info!(
            "Matched {} records (top score: {}, lowest: {})",
            matches.len(),
            max_score,
            matches.last().map(|m| m.score).unwrap_or(0)
        );

        let answer = match &self.llm {
            Some(client) => {
                let context = build_context(&matches, self.options.snippet_chars);
                match self.generate_answer(client.as_ref(), query, &context).await {
                    Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
                    Ok(_) => {
                        tracing::warn!("LLM returned an empty answer, composing from matches");
                        compose_extractive(&matches, self.options.snippet_chars)
                    }
                    Err(e) => {
                        tracing::warn!("LLM synthesis failed, composing from matches: {}", e);
                        compose_extractive(&matches, self.options.snippet_chars)
                    }
                }
            }
            None => compose_extractive(&matches, self.options.snippet_chars),
        };

        let links = map_records_to_links(&matches, self.options.max_links);

        Ok(Answer::new(answer, links, max_score))
    }

    async fn generate_answer(&self, client: &dyn LlmClient, query: &Query, context: &str) -> AppResult<String> {
        let mut variables = HashMap::new();
        variables.insert("question".to_string(), query.question.trim().to_string());
        variables.insert("context".to_string(), context.to_string());
        if let Some(attachment) = query.attachment.as_deref().filter(|a| !a.trim().is_empty()) {
            variables.insert("attachment".to_string(), attachment.trim().to_string());
        }

        let built = build_prompt(&self.prompt, &variables)?;

        let mut request = LlmRequest::new(built.user, &self.model)
            .with_temperature(self.prompt.behavior.temperature)
            .with_max_tokens(self.prompt.behavior.max_tokens);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        if let Some(image) = query.image.as_deref().filter(|i| !i.is_empty()) {
            request = request.with_image(image);
        }

        tracing::debug!(
            "Requesting answer from {} (model: {})",
            client.provider_name(),
            self.model
        );

        let response = client.complete(&request).await?;
        Ok(response.content)
    }
}

/// Build the LLM context block from matched records.
fn build_context(matches: &[ScoredRecord], snippet_chars: usize) -> String {
    matches
        .iter()
        .map(|m| {
            let record = &m.record;
            format!(
                "{}: {}\n{}",
                record.source.context_label(),
                record.title.as_deref().unwrap_or(&record.id),
                truncate_snippet(&record.text, snippet_chars)
            )
        })
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Compose an answer by quoting the best matches.
fn compose_extractive(matches: &[ScoredRecord], snippet_chars: usize) -> String {
    let mut answer = String::from("Here is what I found in the course materials and forum:\n");

    for m in matches.iter().take(EXTRACTIVE_MATCHES) {
        let snippet = truncate_snippet(&m.record.text, snippet_chars);
        match &m.record.title {
            Some(title) => answer.push_str(&format!("\n- {}: {}", title, snippet)),
            None => answer.push_str(&format!("\n- {}", snippet)),
        }
    }

    answer
}

/// Map matched records to answer links, one per distinct url.
fn map_records_to_links(matches: &[ScoredRecord], max_links: usize) -> Vec<AnswerLink> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for m in matches {
        if links.len() >= max_links {
            break;
        }

        let url = record_url(&m.record);
        if seen.insert(url.clone()) {
            links.push(AnswerLink {
                url,
                text: link_text(&m.record),
            });
        }
    }

    links
}

fn record_url(record: &ContentRecord) -> String {
    match &record.url {
        Some(url) if !url.is_empty() => url.clone(),
        _ => format!("{}{}", RECORD_LINK_PREFIX, record.id),
    }
}

fn link_text(record: &ContentRecord) -> String {
    match &record.title {
        Some(title) if !title.trim().is_empty() => title.trim().to_string(),
        _ => truncate_snippet(&record.text, LINK_TEXT_CHARS),
    }
}

/// Truncate to at most `max_chars` characters, preferring a word boundary.
pub(crate) fn truncate_snippet(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };

    let truncated = &text[..cut];
    match truncated.rfind(char::is_whitespace) {
        Some(space) if space > 0 => format!("{}...", truncated[..space].trim_end()),
        _ => format!("{}...", truncated),
    }
}
