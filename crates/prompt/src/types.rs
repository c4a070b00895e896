//! Prompt types for Orbit.
//!
//! This module defines the domain entities for the prompt system.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A prompt definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Behavioral settings
    pub behavior: PromptBehavior,

    /// System message template (Handlebars). Receives `context`.
    #[serde(default)]
    pub system: Option<String>,

    /// User message template (Handlebars). Receives `query`.
    pub template: String,

    /// Reply used when no context was retrieved
    #[serde(default)]
    pub decline: Option<String>,

    /// Output specification
    pub output: PromptOutputSpec,
}

/// Behavioral settings for prompt execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptBehavior {
    /// Tone (e.g., "professional", "casual", "technical")
    pub tone: String,

    /// Style (e.g., "concise", "detailed", "conversational")
    pub style: String,
}

/// Output specification for the prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptOutputSpec {
    /// Output format (e.g., "text", "markdown", "json")
    pub format: String,
}

/// A fully built prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System message (optional)
    pub system: Option<String>,

    /// User message (required)
    pub user: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Template variables that were resolved
    #[serde(rename = "resolvedVariables")]
    pub resolved_variables: HashMap<String, String>,
}

impl BuiltPrompt {
    /// Create a new built prompt.
    pub fn new(
        system: Option<String>,
        user: String,
        source_prompt_id: String,
        resolved_variables: HashMap<String, String>,
    ) -> Self {
        Self {
            system,
            user,
            metadata: BuiltPromptMetadata {
                source_prompt_id,
                resolved_variables,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_definition_deserialization() {
        let yaml = r#"
id: answer
title: Answer
apiVersion: "1.0"
createdBy: test
behavior:
  tone: professional
  style: concise
system: "Context: {{context}}"
template: "{{query}}"
output:
  format: markdown
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.id, "answer");
        assert_eq!(def.behavior.tone, "professional");
        assert_eq!(def.system.as_deref(), Some("Context: {{context}}"));
        assert!(def.decline.is_none());
    }

    #[test]
    fn test_built_prompt_creation() {
        let mut vars = HashMap::new();
        vars.insert("query".to_string(), "test".to_string());

        let built = BuiltPrompt::new(
            Some("System message".to_string()),
            "User message".to_string(),
            "answer".to_string(),
            vars,
        );

        assert_eq!(built.system, Some("System message".to_string()));
        assert_eq!(built.user, "User message");
        assert_eq!(built.metadata.source_prompt_id, "answer");
    }
}
