//! Ask command handler.
//!
//! Answers a question from the knowledge base.

use super::print_json;
use clap::Args;
use orbit_core::{config::AppConfig, AppResult};
use orbit_knowledge::{Answer, Assistant};

/// Ask Orbit a question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    #[arg(required = true, num_args = 1..)]
    pub question: Vec<String>,

    /// Output as JSON (answer, sources and retrieved context)
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        config.validate()?;
        let assistant = Assistant::new(config)?;

        let question = self.question.join(" ");
        let handle = assistant.initialize();
        let answer = assistant.query(&question, handle.as_ref()).await?;

        tracing::debug!(
            "Answer from {} chunks, best score {:?}",
            answer.context.len(),
            answer.max_score()
        );

        if self.json {
            return print_json(&serde_json::to_value(&answer)?);
        }

        print_answer(&answer);
        Ok(())
    }
}

fn print_answer(answer: &Answer) {
    println!("{}", answer.text);

    if answer.sources.is_empty() {
        return;
    }

    println!();
    println!("Sources:");
    for source in &answer.sources {
        println!("- {} ({})", source.document, source.location);
        println!("  \"{}\"", source.snippet);
    }
}
