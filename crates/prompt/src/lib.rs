//! Prompt system for the Virtual TA.
//!
//! Structured prompt management for answer synthesis:
//! - YAML-based prompt definitions, overridable per workspace
//! - A built-in teaching-assistant prompt
//! - Handlebars template rendering

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{builtin_prompt, load_prompt, DEFAULT_ANSWER_PROMPT_ID};
pub use types::{BuiltPrompt, PromptBehavior, PromptDefinition};
