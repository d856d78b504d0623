//! Prompt loader for YAML prompt definitions.

use crate::types::PromptDefinition;
use std::path::Path;
use vta_core::{AppError, AppResult};

/// Identifier of the built-in answer prompt.
pub const DEFAULT_ANSWER_PROMPT_ID: &str = "ta.answer.default";

const DEFAULT_ANSWER_PROMPT: &str = r#"
id: ta.answer.default
title: Teaching assistant answer
apiVersion: "1.0"
behavior:
  temperature: 0.7
  maxTokens: 300
system: |
  You are a helpful Teaching Assistant for the Tools in Data Science (TDS) course at IIT Madras.
  Answer student questions based on the provided context from course materials and Discourse posts.
  Be concise, accurate, and helpful. If you're not sure about something, say so.
  Focus on practical guidance and reference the course materials when appropriate.
template: |
  Context:
  {{context}}

  {{#if attachment}}Additional context from the student:
  {{attachment}}

  {{/if}}Question: {{question}}
"#;

/// Load a prompt definition by ID.
///
/// Looks for `<workspace>/.vta/prompts/<id>.yml` first; the built-in
/// answer prompt is used when no override exists.
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = workspace_path
        .join(".vta/prompts")
        .join(format!("{}.yml", prompt_id));

    if !prompt_file.exists() {
        if prompt_id == DEFAULT_ANSWER_PROMPT_ID {
            tracing::debug!("Using built-in prompt {}", prompt_id);
            return builtin_prompt();
        }
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!("Failed to read prompt file {:?}: {}", prompt_file, e))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!("Failed to parse prompt YAML {:?}: {}", prompt_file, e))
    })?;

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// The built-in teaching-assistant answer prompt.
pub fn builtin_prompt() -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(DEFAULT_ANSWER_PROMPT)
        .map_err(|e| AppError::Prompt(format!("Built-in prompt is invalid: {}", e)))?;
    validate_prompt(&definition)?;
    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt("Prompt template cannot be empty".to_string()));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_prompt(dir: &Path, id: &str, content: &str) {
        let prompts_dir = dir.join(".vta/prompts");
        fs::create_dir_all(&prompts_dir).unwrap();
        fs::write(prompts_dir.join(format!("{}.yml", id)), content).unwrap();
    }

    #[test]
    fn test_builtin_prompt_is_valid() {
        let def = builtin_prompt().unwrap();
        assert_eq!(def.id, DEFAULT_ANSWER_PROMPT_ID);
        assert!(def.system.unwrap().contains("Teaching Assistant"));
        assert!(def.template.contains("{{question}}"));
    }

    #[test]
    fn test_default_id_falls_back_to_builtin() {
        let temp_dir = TempDir::new().unwrap();
        let def = load_prompt(temp_dir.path(), DEFAULT_ANSWER_PROMPT_ID).unwrap();
        assert_eq!(def.title, "Teaching assistant answer");
    }

    #[test]
    fn test_workspace_override_wins() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(
            temp_dir.path(),
            DEFAULT_ANSWER_PROMPT_ID,
            r#"
id: ta.answer.default
title: "Terse TA"
apiVersion: "1.1"
behavior:
  temperature: 0.1
template: "Q: {{question}}"
output:
  format: text
"#,
        );

        let def = load_prompt(temp_dir.path(), DEFAULT_ANSWER_PROMPT_ID).unwrap();
        assert_eq!(def.title, "Terse TA");
        assert_eq!(def.behavior.temperature, 0.1);
        assert!(def.system.is_none());
    }

    #[test]
    fn test_load_nonexistent_prompt() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_prompt(temp_dir.path(), "nonexistent").is_err());
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "invalid", "invalid: yaml: content:");
        assert!(load_prompt(temp_dir.path(), "invalid").is_err());
    }
}
