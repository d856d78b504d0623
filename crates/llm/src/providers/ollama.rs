//! Local Ollama runtime, driven through `POST /api/generate`.

use serde::{Deserialize, Serialize};
use vta_core::{AppError, AppResult};

use crate::client::{split_data_url, LlmClient, LlmRequest, LlmResponse, LlmUsage};

const LOCAL_ENDPOINT: &str = "http://localhost:11434";

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    /// Ollama takes bare base64, without a `data:` prefix.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<&'a str>,
    options: SamplingOptions,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct SamplingOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(rename = "num_predict", skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateReply {
    model: String,
    response: String,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

impl From<GenerateReply> for LlmResponse {
    fn from(reply: GenerateReply) -> Self {
        Self {
            content: reply.response.trim().to_string(),
            model: reply.model,
            usage: LlmUsage::new(reply.prompt_eval_count, reply.eval_count),
        }
    }
}

/// Client for a (usually local) Ollama server.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Client for `http://localhost:11434`.
    pub fn new() -> Self {
        Self::with_base_url(LOCAL_ENDPOINT)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn body<'a>(request: &'a LlmRequest) -> GenerateBody<'a> {
        GenerateBody {
            model: &request.model,
            prompt: &request.prompt,
            system: request.system.as_deref(),
            images: request.images.iter().map(|i| split_data_url(i).1).collect(),
            options: SamplingOptions {
                temperature: request.temperature,
                max_tokens: request.max_tokens,
            },
            stream: false,
        }
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let url = format!("{}/api/generate", self.base_url);
        tracing::debug!(%url, model = %request.model, images = request.images.len(), "ollama generate");

        let response = self
            .client
            .post(&url)
            .json(&Self::body(request))
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("ollama unreachable at {}: {}", self.base_url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Llm(format!("ollama returned {}: {}", status, detail)));
        }

        let reply: GenerateReply = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("unexpected ollama reply: {}", e)))?;

        Ok(reply.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_local_runtime() {
        let client = OllamaClient::default();
        assert_eq!(client.provider_name(), "ollama");
        assert_eq!(client.base_url, LOCAL_ENDPOINT);
        assert_eq!(OllamaClient::with_base_url("http://gpu-box:11434/").base_url, "http://gpu-box:11434");
    }

    #[test]
    fn test_generate_body_shape() {
        let request = LlmRequest::new("How do I merge dataframes?", "llama3.2")
            .with_system("You are a Teaching Assistant.")
            .with_max_tokens(300)
            .with_image("aGVsbG8=")
            .with_image("data:image/png;base64,d29ybGQ=");

        let json = serde_json::to_value(OllamaClient::body(&request)).unwrap();
        assert_eq!(json["model"], "llama3.2");
        assert_eq!(json["system"], "You are a Teaching Assistant.");
        assert_eq!(json["options"]["num_predict"], 300);
        assert!(json["options"].get("temperature").is_none());
        assert_eq!(json["images"][0], "aGVsbG8=");
        assert_eq!(json["images"][1], "d29ybGQ=");
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn test_reply_is_trimmed() {
        let reply: GenerateReply = serde_json::from_str(
            r#"{"model":"llama3.2","response":"  Use pd.merge.\n","eval_count":4}"#,
        )
        .unwrap();
        let response = LlmResponse::from(reply);
        assert_eq!(response.content, "Use pd.merge.");
        assert_eq!(response.usage.total_tokens, 4);
    }
}
