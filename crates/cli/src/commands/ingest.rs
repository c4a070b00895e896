//! Ingest command handler.
//!
//! Collects documents from files and directories and adds them to the
//! knowledge base in one batch.

use super::print_json;
use clap::Args;
use orbit_core::{config::AppConfig, AppError, AppResult};
use orbit_knowledge::{Assistant, Document, ProgressReporter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use walkdir::WalkDir;

/// Add documents to the knowledge base
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Files or directories to ingest (.pdf, .txt, .md, .html)
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command");

        config.validate()?;
        let assistant = Assistant::new(config)?;

        let files = collect_files(&self.paths, |path| assistant.supports(path))?;
        if files.is_empty() {
            return Err(AppError::Other(format!(
                "No supported documents found (supported: {})",
                assistant.supported_extensions().join(", ")
            )));
        }

        let documents = files
            .iter()
            .map(|path| Document::from_path(path))
            .collect::<AppResult<Vec<_>>>()?;

        let existing = assistant.initialize();
        let reporter = if self.json {
            ProgressReporter::noop()
        } else {
            progress_printer()
        };

        let handle = assistant
            .ingest_with_progress(documents, existing.as_ref(), &reporter)
            .await?;
        let stats = assistant.stats(&handle).await?;

        if self.json {
            let output = serde_json::json!({
                "documents": files,
                "index": stats.location,
                "chunksCount": stats.chunks_count,
                "documentsCount": stats.documents_count,
            });
            return print_json(&output);
        }

        println!(
            "Ingested {} documents. Knowledge base now holds {} chunks from {} documents.",
            files.len(),
            stats.chunks_count,
            stats.documents_count
        );

        Ok(())
    }
}

/// Print phase changes and per-document progress to stderr.
fn progress_printer() -> ProgressReporter {
    let last_phase = Arc::new(Mutex::new(String::new()));

    ProgressReporter::new(Arc::new(move |event| {
        let mut last = match last_phase.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let finished = event.total == Some(event.current);
        let per_document = event.phase == "extract" || event.phase == "chunk";
        if per_document || *last != event.phase || finished {
            eprintln!("{}", event.format_simple());
        }
        *last = event.phase;
    }))
}

/// Expand paths into the list of files to ingest.
///
/// Directories are walked recursively and filtered to supported types.
/// Files named explicitly are always included, so an unsupported one is
/// reported by the ingestion pipeline.
fn collect_files<F>(paths: &[PathBuf], supported: F) -> AppResult<Vec<PathBuf>>
where
    F: Fn(&Path) -> bool,
{
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let entry_path = entry.path();
                if entry_path.is_file() && supported(entry_path) {
                    files.push(entry_path.to_path_buf());
                }
            }
        } else {
            return Err(AppError::Other(format!(
                "Path not found: {}",
                path.display()
            )));
        }
    }

    tracing::debug!("Collected {} files", files.len());
    Ok(files)
}
