use serde::{Deserialize, Serialize};

/// An answer prompt as written in `.vta/prompts/<id>.yml`.
///
/// `system` and `template` are Handlebars sources rendered with the
/// `question`, `context` and `attachment` variables. Unknown keys are
/// ignored so older prompt files keep loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptDefinition {
    pub id: String,
    pub title: String,
    /// `major.minor`, checked on load.
    pub api_version: String,
    #[serde(default)]
    pub behavior: PromptBehavior,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub template: String,
}

/// Sampling settings forwarded to the LLM request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PromptBehavior {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for PromptBehavior {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 300,
        }
    }
}

/// Rendered messages, ready for `LlmRequest`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuiltPrompt {
    pub prompt_id: String,
    pub system: Option<String>,
    pub user: String,
}
