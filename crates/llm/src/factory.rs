//! Builds the configured LLM provider.

use std::sync::Arc;

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiClient};
use crate::types::ProviderType;

/// Resolve `provider` into a client.
///
/// `none` yields `Ok(None)`: the answerer then composes extractive answers.
/// `openai` needs an API key; `endpoint` overrides either provider's URL.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> Result<Option<Arc<dyn LlmClient>>, String> {
    let client: Arc<dyn LlmClient> = match ProviderType::parse(provider) {
        None => return Err(format!("Unknown provider: {}", provider)),
        Some(ProviderType::Disabled) => return Ok(None),
        Some(ProviderType::Ollama) => Arc::new(
            endpoint
                .map(OllamaClient::with_base_url)
                .unwrap_or_default(),
        ),
        Some(ProviderType::OpenAI) => {
            let key = api_key
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| "OpenAI provider requires API key".to_string())?;
            Arc::new(match endpoint {
                Some(url) => OpenAiClient::with_base_url(url, key),
                None => OpenAiClient::new(key),
            })
        }
    };

    tracing::debug!(provider = client.provider_name(), "llm client ready");
    Ok(Some(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_of(result: Result<Option<Arc<dyn LlmClient>>, String>) -> Option<String> {
        result
            .unwrap()
            .map(|client| client.provider_name().to_string())
    }

    #[test]
    fn test_ollama_with_and_without_endpoint() {
        assert_eq!(provider_of(create_client("ollama", None, None)).as_deref(), Some("ollama"));
        assert_eq!(
            provider_of(create_client("Ollama", Some("http://localhost:8080"), None)).as_deref(),
            Some("ollama")
        );
    }

    #[test]
    fn test_none_provider_disables_synthesis() {
        assert_eq!(provider_of(create_client("none", None, None)), None);
        assert_eq!(provider_of(create_client("off", Some("http://ignored"), None)), None);
    }

    #[test]
    fn test_openai_key_handling() {
        let missing = create_client("openai", None, None).err().unwrap_or_default();
        assert!(missing.contains("requires API key"));
        assert!(create_client("openai", None, Some("  ")).is_err());
        assert_eq!(
            provider_of(create_client("openai", None, Some("sk-test"))).as_deref(),
            Some("openai")
        );
    }

    #[test]
    fn test_unknown_provider_is_named() {
        let err = create_client("claude", None, None).err().unwrap_or_default();
        assert_eq!(err, "Unknown provider: claude");
    }
}
