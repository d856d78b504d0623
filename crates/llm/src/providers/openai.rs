//! OpenAI chat completions provider.
//!
//! API: https://platform.openai.com/docs/api-reference/chat

use crate::client::{split_data_url, LlmClient, LlmRequest, LlmResponse, LlmUsage};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use vta_core::{AppError, AppResult};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

/// Media type assumed for images sent without a `data:` prefix.
const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Chat completions request body.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// A chat message. `content` is a plain string, or a list of parts when
/// images are attached.
#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// OpenAI LLM client.
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a client against the public OpenAI endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_ENDPOINT, api_key)
    }

    /// Create a client against a compatible endpoint (proxies, gateways).
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    fn to_chat_request(&self, request: &LlmRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);

        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system",
                content: Value::String(system.clone()),
            });
        }

        let user_content = if request.images.is_empty() {
            Value::String(request.prompt.clone())
        } else {
            let mut parts = vec![json!({ "type": "text", "text": request.prompt })];
            parts.extend(request.images.iter().map(|image| {
                let (mime, payload) = split_data_url(image);
                json!({
                    "type": "image_url",
                    "image_url": {
                        "url": format!("data:{};base64,{}", mime.unwrap_or(DEFAULT_IMAGE_MIME), payload)
                    }
                })
            }));
            Value::Array(parts)
        };

        messages.push(ChatMessage {
            role: "user",
            content: user_content,
        });

        ChatRequest {
            model: request.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!("Sending chat completion request to OpenAI");
        tracing::debug!(
            "Request model: {}, images: {}",
            request.model,
            request.images.len()
        );

        let body = self.to_chat_request(request);
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to OpenAI: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "OpenAI API error ({}): {}",
                status, error_text
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse OpenAI response: {}", e)))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::Llm("OpenAI response contained no choices".to_string()))?;

        let usage = chat
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        tracing::info!("Received completion from OpenAI ({} tokens)", usage.total_tokens);

        Ok(LlmResponse {
            content: content.trim().to_string(),
            model: chat.model,
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_only_request() {
        let client = OpenAiClient::new("sk-test");
        let request = LlmRequest::new("What is pandas?", "gpt-3.5-turbo").with_system("You are a TA");

        let chat = client.to_chat_request(&request);
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[0].role, "system");
        assert_eq!(chat.messages[1].content, Value::String("What is pandas?".into()));
    }

    #[test]
    fn test_image_request_uses_content_parts() {
        let client = OpenAiClient::new("sk-test");
        let request = LlmRequest::new("What does this error mean?", "gpt-4o-mini")
            .with_image("aGVsbG8=");

        let chat = client.to_chat_request(&request);
        assert_eq!(chat.messages.len(), 1);

        let parts = chat.messages[0].content.as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["image_url"]["url"], "data:image/jpeg;base64,aGVsbG8=");
    }

    #[test]
    fn test_image_keeps_declared_media_type() {
        let client = OpenAiClient::new("sk-test");
        let request = LlmRequest::new("Why is this plot empty?", "gpt-4o-mini")
            .with_image("data:image/png;base64,aGVsbG8=");

        let chat = client.to_chat_request(&request);
        let parts = chat.messages[0].content.as_array().unwrap();
        assert_eq!(parts[1]["image_url"]["url"], "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn test_parse_chat_response() {
        let raw = r#"{
            "model": "gpt-3.5-turbo",
            "choices": [{"message": {"role": "assistant", "content": " Use pd.merge. "}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let chat: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(chat.choices.len(), 1);
        assert_eq!(chat.usage.unwrap().completion_tokens, 5);
    }
}
