//! Status command handler.
//!
//! Reports whether a knowledge base is loaded, the active providers, and
//! any workspace prompt overrides.

use super::{print_json, GREETING, OFFLINE_MESSAGE};
use clap::Args;
use orbit_core::{config::AppConfig, AppResult};
use orbit_knowledge::{check_provider, index};

/// Show whether the knowledge base is loaded
#[derive(Args, Debug)]
pub struct StatusCommand {
    /// Also send a test request to the embedding provider
    #[arg(long)]
    pub check: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatusCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing status command");

        let location = config.index_path();
        let handle = index::open(&location);
        let overrides = orbit_prompt::list_prompts(&config.prompts_dir())?;
        let config_problem = config.validate().err().map(|e| e.to_string());

        let embedder_check = if self.check {
            Some(
                check_provider(&config.embedding)
                    .await
                    .map_err(|e| e.to_string()),
            )
        } else {
            None
        };

        if self.json {
            let output = serde_json::json!({
                "online": handle.is_some(),
                "index": location,
                "embeddingModel": handle.as_ref().map(|h| h.metadata().embedding_model.clone()),
                "embedding": {
                    "provider": config.embedding.provider,
                    "model": config.embedding.model,
                    "reachable": embedder_check.as_ref().map(|r| r.is_ok()),
                    "error": embedder_check.as_ref().and_then(|r| r.as_ref().err()),
                },
                "llm": {
                    "provider": config.llm.provider,
                    "model": config.llm.model,
                },
                "promptOverrides": overrides,
                "configError": config_problem,
            });
            return print_json(&output);
        }

        match &handle {
            Some(h) => {
                println!("{}", GREETING);
                println!();
                println!("Knowledge base: {}", h.location().display());
                println!(
                    "Embedding model: {} ({} dimensions)",
                    h.metadata().embedding_model,
                    h.metadata().dimensions
                );
            }
            None => {
                println!("{}", OFFLINE_MESSAGE);
                println!();
                println!("Knowledge base: {} (not found)", location.display());
            }
        }

        println!(
            "Embedder: {}/{}",
            config.embedding.provider, config.embedding.model
        );
        println!("LLM: {}/{}", config.llm.provider, config.llm.model);

        if !overrides.is_empty() {
            println!("Prompt overrides: {}", overrides.join(", "));
        }

        match embedder_check {
            Some(Ok(())) => println!("Embedder check: ok"),
            Some(Err(e)) => println!("Embedder check: failed ({})", e),
            None => {}
        }

        if let Some(problem) = config_problem {
            println!("Configuration problem: {}", problem);
        }

        Ok(())
    }
}
