//! Optional answer synthesis. The answerer works without any provider; when
//! one is configured it receives the retrieved course and forum snippets and
//! writes the reply. OpenAI chat completions and a local Ollama runtime are
//! supported, both accepting base64 image attachments.
//!
//! # Example
//! ```no_run
//! use vta_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("What is a dataframe?", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

pub use client::{split_data_url, LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiClient};
pub use types::ProviderType;
