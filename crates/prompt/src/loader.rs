//! Prompt loader for loading YAML prompt definitions.

use crate::builtin;
use crate::types::PromptDefinition;
use orbit_core::{AppError, AppResult};
use std::path::Path;

/// Load a prompt definition by ID from a prompts directory.
///
/// This function looks for a prompt file named `<id>.yml` in `prompts_dir`
/// (normally `<workspace>/.orbit/prompts`).
///
/// # Example
/// ```no_run
/// use orbit_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new(".orbit/prompts"), "answer")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(prompts_dir: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir.join(format!("{}.yml", prompt_id));

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// Load the answer prompt, preferring a workspace override.
///
/// A missing override falls back to the built-in Orbit persona. An override
/// that exists but fails to parse or validate is an error. An override
/// without a `decline` message inherits the built-in one.
pub fn load_answer_prompt(prompts_dir: &Path) -> AppResult<PromptDefinition> {
    let builtin = builtin::answer_prompt()?;
    let override_file = prompts_dir.join(format!("{}.yml", builtin::ANSWER_PROMPT_ID));

    if !override_file.exists() {
        tracing::debug!("No answer prompt override, using built-in");
        return Ok(builtin);
    }

    let mut definition = load_prompt(prompts_dir, builtin::ANSWER_PROMPT_ID)?;
    if definition.decline.is_none() {
        definition.decline = builtin.decline;
    }
    Ok(definition)
}

/// List all prompt IDs available in a prompts directory.
pub fn list_prompts(prompts_dir: &Path) -> AppResult<Vec<String>> {
    if !prompts_dir.exists() {
        return Ok(Vec::new());
    }

    let mut prompt_ids = Vec::new();

    for entry in walkdir::WalkDir::new(prompts_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                prompt_ids.push(stem.to_string());
            }
        }
    }

    prompt_ids.sort();
    Ok(prompt_ids)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    if let Some(system) = &def.system {
        if !system.contains("{{context}}") {
            tracing::warn!(
                "Prompt {} has a system template without {{{{context}}}}; retrieved context will not reach the model",
                def.id
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_prompt(dir: &Path, id: &str, valid: bool) -> PathBuf {
        fs::create_dir_all(dir).unwrap();

        let content = if valid {
            format!(
                r#"
id: {}
title: "Pirate Orbit"
apiVersion: "1.0"
createdBy: test
behavior:
  tone: cheerful
  style: concise
system: "Arr. Context: {{{{context}}}}"
template: "{{{{query}}}}"
output:
  format: markdown
"#,
                id
            )
        } else {
            "invalid: yaml: content:".to_string()
        };

        let file_path = dir.join(format!("{}.yml", id));
        fs::write(&file_path, content).unwrap();
        file_path
    }

    #[test]
    fn test_load_valid_prompt() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "answer", true);

        let prompt = load_prompt(temp_dir.path(), "answer").unwrap();
        assert_eq!(prompt.id, "answer");
        assert_eq!(prompt.title, "Pirate Orbit");
    }

    #[test]
    fn test_load_nonexistent_prompt() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_prompt(temp_dir.path(), "nonexistent");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "invalid", false);

        let result = load_prompt(temp_dir.path(), "invalid");
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }

    #[test]
    fn test_answer_prompt_falls_back_to_builtin() {
        let temp_dir = TempDir::new().unwrap();
        let prompt = load_answer_prompt(&temp_dir.path().join("missing")).unwrap();
        assert_eq!(prompt.title, "Orbit answer");
    }

    #[test]
    fn test_answer_prompt_override_inherits_decline() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "answer", true);

        let prompt = load_answer_prompt(temp_dir.path()).unwrap();
        assert_eq!(prompt.title, "Pirate Orbit");
        assert_eq!(prompt.decline.as_deref(), Some(builtin::DEFAULT_DECLINE));
    }

    #[test]
    fn test_list_prompts() {
        let temp_dir = TempDir::new().unwrap();
        write_prompt(temp_dir.path(), "answer", true);
        write_prompt(temp_dir.path(), "summary", true);

        let prompts = list_prompts(temp_dir.path()).unwrap();
        assert_eq!(prompts, vec!["answer".to_string(), "summary".to_string()]);
    }
}
