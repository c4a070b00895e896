//! Built-in prompt definitions shipped with the binary.

use crate::types::PromptDefinition;
use orbit_core::{AppError, AppResult};

/// Identifier of the answer prompt.
pub const ANSWER_PROMPT_ID: &str = "answer";

/// Reply when retrieval produced no usable context.
pub const DEFAULT_DECLINE: &str = "I'm sorry, but I couldn't find anything in the CollabCircle \
knowledge base that answers that question. Could you rephrase it, or ask about something \
covered in our documents?";

const ANSWER_PROMPT_YAML: &str = r#"
id: answer
title: Orbit answer
apiVersion: "1.0"
createdBy: orbit
behavior:
  tone: helpful, professional, and encouraging
  style: concise
system: |
  You are Orbit, the AI assistant for CollabCircle.
  Your tone is {{tone}}.
  Use only the following pieces of retrieved context to answer the question.
  If the context does not contain the answer, say so politely and do not make one up.

  Context:
  {{context}}
template: "{{query}}"
output:
  format: markdown
"#;

/// The default answer prompt.
pub fn answer_prompt() -> AppResult<PromptDefinition> {
    let mut definition: PromptDefinition = serde_yaml::from_str(ANSWER_PROMPT_YAML)
        .map_err(|e| AppError::Prompt(format!("Built-in answer prompt is invalid: {}", e)))?;
    definition.decline = Some(DEFAULT_DECLINE.to_string());
    Ok(definition)
}
