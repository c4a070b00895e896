//! Stats command handler.
//!
//! Handles knowledge base statistics display.

use super::print_json;
use clap::Args;
use orbit_core::{config::AppConfig, AppError, AppResult};
use orbit_knowledge::{index, IndexStats};

/// Show knowledge base statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let location = config.index_path();
        let stats = tokio::task::spawn_blocking(move || -> AppResult<IndexStats> {
            let handle = index::open(&location).ok_or(AppError::KnowledgeBaseNotInitialized)?;
            index::stats(&handle)
        })
        .await
        .map_err(|e| AppError::Other(format!("Stats task failed: {}", e)))??;

        if self.json {
            return print_json(&serde_json::to_value(&stats)?);
        }

        println!("Knowledge base: {}", stats.location.display());
        println!("Documents: {}", stats.documents_count);
        println!("Chunks: {}", stats.chunks_count);
        println!(
            "Embedding model: {} ({} dimensions)",
            stats.embedding_model, stats.dimensions
        );
        println!("Size: {}", format_bytes(stats.size_bytes));
        println!("Created: {}", stats.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
        if let Some(last) = stats.last_ingest_at {
            println!("Last ingest: {}", last.format("%Y-%m-%d %H:%M:%S UTC"));
        }

        Ok(())
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
