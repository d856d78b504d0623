//! The completion seam used by the answerer.
//!
//! A request carries one fully rendered prompt (question plus retrieved
//! course and forum context), an optional system message, and any base64
//! images the student attached. Providers translate it into their own wire
//! format.

use serde::{Deserialize, Serialize};
use vta_core::AppResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub prompt: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Upper bound on generated tokens; providers map it to their own knob.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Bare base64 payloads, or `data:<mime>;base64,<payload>` URLs when the
    /// media type is known.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl LlmRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            system: None,
            temperature: None,
            max_tokens: None,
            images: Vec::new(),
        }
    }

    pub fn with_system(self, system: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            ..self
        }
    }

    pub fn with_temperature(self, temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
            ..self
        }
    }

    pub fn with_max_tokens(self, max_tokens: u32) -> Self {
        Self {
            max_tokens: Some(max_tokens),
            ..self
        }
    }

    pub fn with_image(mut self, image_base64: impl Into<String>) -> Self {
        self.images.push(image_base64.into());
        self
    }

    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }
}

/// Split an image into its media type and base64 payload.
///
/// `data:image/png;base64,AAA` gives `(Some("image/png"), "AAA")`; anything
/// else is treated as a bare payload.
pub fn split_data_url(image: &str) -> (Option<&str>, &str) {
    match image
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
    {
        Some((mime, payload)) if !mime.is_empty() => (Some(mime), payload),
        Some((_, payload)) => (None, payload),
        None => (None, image),
    }
}

/// Text produced by a provider, already trimmed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    #[serde(default)]
    pub usage: LlmUsage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl LlmUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// A provider able to turn a rendered prompt into an answer.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Short provider tag used in logs ("openai", "ollama").
    fn provider_name(&self) -> &str;

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse>;
}
