//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use handlebars::Handlebars;
use std::collections::HashMap;
use vta_core::{AppError, AppResult};

/// Build a prompt from a definition and input variables.
///
/// Both the system and the user templates are rendered with the same
/// variables. Missing variables render as empty strings.
///
/// # Example
/// ```no_run
/// use vta_prompt::{build_prompt, builtin_prompt};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = builtin_prompt()?;
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "How do I merge dataframes?".to_string());
/// vars.insert("context".to_string(), "Pandas merge combines two dataframes.".to_string());
///
/// let built = build_prompt(&def, &vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: &HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let user = render_template(&definition.template, variables)?;
    let system = definition
        .system
        .as_deref()
        .map(|template| render_template(template, variables))
        .transpose()?;

    Ok(BuiltPrompt {
        prompt_id: definition.id.clone(),
        system,
        user: user.trim().to_string(),
    })
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text output: no HTML escaping
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::builtin_prompt;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_simple_template() {
        let result = render_template("Question: {{question}}", &vars(&[("question", "Hello?")]));
        assert_eq!(result.unwrap(), "Question: Hello?");
    }

    #[test]
    fn test_render_does_not_escape_html() {
        let result = render_template("{{context}}", &vars(&[("context", "a < b && c > d")]));
        assert_eq!(result.unwrap(), "a < b && c > d");
    }

    #[test]
    fn test_render_template_missing_variable() {
        let result = render_template("Question: {{missing}}", &HashMap::new());
        assert_eq!(result.unwrap(), "Question: ");
    }

    #[test]
    fn test_builtin_prompt_without_attachment() {
        let def = builtin_prompt().unwrap();
        let built = build_prompt(
            &def,
            &vars(&[("question", "What is GA1?"), ("context", "GA1 is graded assignment 1.")]),
        )
        .unwrap();

        assert!(built.user.starts_with("Context:"));
        assert!(built.user.contains("GA1 is graded assignment 1."));
        assert!(built.user.ends_with("Question: What is GA1?"));
        assert!(!built.user.contains("Additional context"));
        assert!(built.system.is_some());
        assert_eq!(built.prompt_id, "ta.answer.default");
    }

    #[test]
    fn test_builtin_prompt_with_attachment() {
        let def = builtin_prompt().unwrap();
        let built = build_prompt(
            &def,
            &vars(&[
                ("question", "Why does this fail?"),
                ("context", "..."),
                ("attachment", "Traceback: KeyError 'id'"),
            ]),
        )
        .unwrap();

        assert!(built.user.contains("Additional context from the student:"));
        assert!(built.user.contains("KeyError 'id'"));
    }
}
