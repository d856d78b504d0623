//! Ask command handler.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::Args;
use vta_core::{config::AppConfig, AppError, AppResult};
use vta_knowledge::{open_store, Answerer, ContentStore, Query};

use super::print_json;

/// Answer a question from the command line
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question
    pub question: String,

    /// Extra context to search and pass along
    #[arg(long)]
    pub context: Option<String>,

    /// Image file to attach (sent to the LLM base64-encoded)
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Output as JSON (same shape as the HTTP API)
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let store: Arc<dyn ContentStore> = Arc::new(open_store(config)?);
        let answerer = Answerer::from_config(store, config)?;

        let mut query = Query::new(self.question.clone());
        if let Some(context) = &self.context {
            query = query.with_attachment(context.clone());
        }
        if let Some(path) = &self.image {
            query = query.with_image(encode_image(path)?);
        }

        let answer = answerer.answer(&query).await?;
        tracing::debug!("Top score: {}, links: {}", answer.max_score, answer.links.len());

        if self.json {
            return print_json(&answer);
        }

        println!("{}", answer.answer);
        if !answer.links.is_empty() {
            println!();
            println!("Sources:");
            for link in &answer.links {
                println!("- {} ({})", link.text, link.url);
            }
        }

        Ok(())
    }
}

/// Read an image as a `data:` URL, labelled by its extension.
fn encode_image(path: &Path) -> AppResult<String> {
    let bytes = std::fs::read(path)
        .map_err(|e| AppError::MalformedQuery(format!("Cannot read image {:?}: {}", path, e)))?;
    Ok(format!("data:{};base64,{}", image_mime(path), STANDARD.encode(bytes)))
}

fn image_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "image/jpeg",
    }
}
