//! Prompt builder for rendering templates and injecting context.

use crate::types::{BuiltPrompt, PromptDefinition};
use handlebars::Handlebars;
use orbit_core::{AppError, AppResult};
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// This function:
/// 1. Adds the definition's behavior (`tone`, `style`) to the variables
/// 2. Renders the system template, if any, and the user template
/// 3. Returns a `BuiltPrompt` ready for LLM execution
///
/// Caller-supplied variables win over behavior defaults.
///
/// # Example
/// ```no_run
/// use orbit_prompt::{build_prompt, builtin};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = builtin::answer_prompt()?;
/// let mut vars = HashMap::new();
/// vars.insert("query".to_string(), "When was CollabCircle founded?".to_string());
/// vars.insert("context".to_string(), "CollabCircle was founded in 2023.".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    mut variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    variables
        .entry("tone".to_string())
        .or_insert_with(|| definition.behavior.tone.clone());
    variables
        .entry("style".to_string())
        .or_insert_with(|| definition.behavior.style.clone());

    let system = definition
        .system
        .as_deref()
        .map(|template| render_template(template, &variables))
        .transpose()?;
    let user = render_template(&definition.template, &variables)?;

    Ok(BuiltPrompt::new(
        system,
        user,
        definition.id.clone(),
        variables,
    ))
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", &variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}
