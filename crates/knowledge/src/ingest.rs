//! Ingestion pipeline: extract, chunk, embed, persist.
//!
//! A batch is all-or-nothing. Any extraction or embedding failure aborts it
//! before the index is touched, and the error names the offending document.

use crate::chunker::Chunker;
use crate::embeddings::EmbeddingProvider;
use crate::index::{self, IndexHandle};
use crate::parser::ExtractorRegistry;
use crate::progress::ProgressReporter;
use crate::types::{Chunk, Document, IndexEntry, PageText};
use futures::{stream, StreamExt, TryStreamExt};
use orbit_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;

/// Default number of embedding requests in flight.
const DEFAULT_CONCURRENCY: usize = 4;

/// Turns document batches into index entries.
#[derive(Clone)]
pub struct IngestionPipeline {
    extractors: ExtractorRegistry,
    chunker: Chunker,
    embedder: Arc<dyn EmbeddingProvider>,
    concurrency: usize,
    index_location: PathBuf,
    staging_root: Option<PathBuf>,
}

impl IngestionPipeline {
    pub fn new(
        extractors: ExtractorRegistry,
        chunker: Chunker,
        embedder: Arc<dyn EmbeddingProvider>,
        index_location: impl Into<PathBuf>,
    ) -> Self {
        Self {
            extractors,
            chunker,
            embedder,
            concurrency: DEFAULT_CONCURRENCY,
            index_location: index_location.into(),
            staging_root: None,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Stage uploads under `root` instead of the system temp directory.
    pub fn with_staging_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.staging_root = Some(root.into());
        self
    }

    /// Index location used when no index exists yet.
    pub fn index_location(&self) -> &Path {
        &self.index_location
    }

    /// Ingest a batch, creating the index or appending to `existing`.
    pub async fn ingest(
        &self,
        documents: Vec<Document>,
        existing: Option<&IndexHandle>,
        progress: &ProgressReporter,
    ) -> AppResult<IndexHandle> {
        if documents.is_empty() {
            return Err(AppError::ingestion("<empty batch>", "no documents supplied"));
        }

        let start = Instant::now();
        let total = documents.len() as u64;
        let names: Vec<String> = documents.iter().map(|d| d.name.clone()).collect();
        tracing::info!("Ingesting {} documents", total);

        let staging = self.staging_dir()?;
        let mut chunks: Vec<Chunk> = Vec::new();

        for (i, document) in documents.into_iter().enumerate() {
            let name = document.name.clone();
            let pages = self.extract(staging.path(), i, document).await?;
            progress.extract(i as u64 + 1, total, &name, pages.len());

            let document_chunks = self.chunker.split_pages(&name, &pages);
            tracing::debug!(
                "{}: {} pages, {} chunks",
                name,
                pages.len(),
                document_chunks.len()
            );
            progress.chunk(i as u64 + 1, total, &name, document_chunks.len());
            chunks.extend(document_chunks);
        }

        if let Err(e) = staging.close() {
            tracing::warn!("Failed to remove staging directory: {}", e);
        }

        if chunks.is_empty() {
            return Err(AppError::ingestion(
                names.join(", "),
                "no extractable text, nothing to index",
            ));
        }

        tracing::info!("Embedding {} chunks", chunks.len());
        let entries = self.embed(chunks, progress).await?;

        let location = existing
            .map(|handle| handle.location().to_path_buf())
            .unwrap_or_else(|| self.index_location.clone());
        progress.persist(entries.len() as u64, &location.display().to_string());

        let model = self.embedder.model_name().to_string();
        let entry_count = entries.len();
        let span = tracing::Span::current();
        let handle = tokio::task::spawn_blocking(move || {
            span.in_scope(|| index::create_from(&entries, &location, &model))
        })
        .await
        .map_err(|e| AppError::ingestion(names.join(", "), format!("index writer failed: {}", e)))??;

        tracing::info!(
            "Ingested {} documents ({} chunks) into {} in {:.2}s",
            total,
            entry_count,
            handle.location().display(),
            start.elapsed().as_secs_f64()
        );

        Ok(handle)
    }

    /// Private directory for staged uploads, removed on drop.
    fn staging_dir(&self) -> AppResult<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("orbit-ingest-");

        let dir = match &self.staging_root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };

        tracing::debug!("Staging uploads in {}", dir.path().display());
        Ok(dir)
    }

    /// Stage one document to disk, extract its pages, delete the staged file.
    async fn extract(
        &self,
        staging: &Path,
        ordinal: usize,
        document: Document,
    ) -> AppResult<Vec<PageText>> {
        let Document { name, bytes } = document;

        let extractor = self.extractors.for_path(Path::new(&name)).ok_or_else(|| {
            AppError::ingestion(
                &name,
                format!(
                    "unsupported file type (supported: {})",
                    self.extractors.extensions().join(", ")
                ),
            )
        })?;

        let file_name = Path::new(&name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let staged = staging.join(format!("{:04}-{}", ordinal, file_name));

        tracing::debug!("Extracting {} with {} extractor", name, extractor.name());

        let span = tracing::Span::current();
        tokio::task::spawn_blocking(move || -> AppResult<Vec<PageText>> {
            let _entered = span.enter();
            std::fs::write(&staged, &bytes)?;
            let result = extractor.extract(&staged);
            if let Err(e) = std::fs::remove_file(&staged) {
                tracing::warn!("Failed to remove staged file {}: {}", staged.display(), e);
            }
            result
        })
        .await
        .map_err(|e| AppError::ingestion(&name, format!("extraction task failed: {}", e)))?
        .map_err(|e| AppError::ingestion(&name, e))
    }

    /// Embed chunks with bounded concurrency, preserving order.
    async fn embed(
        &self,
        chunks: Vec<Chunk>,
        progress: &ProgressReporter,
    ) -> AppResult<Vec<IndexEntry>> {
        let total = chunks.len() as u64;
        let model = self.embedder.model_name().to_string();
        let embedder = &self.embedder;
        let mut done = 0u64;

        stream::iter(chunks)
            .map(|chunk| async move {
                let embedding = embedder
                    .embed(&chunk.text)
                    .await
                    .map_err(|e| AppError::ingestion(chunk.source.clone(), e))?;
                Ok::<_, AppError>(IndexEntry { chunk, embedding })
            })
            .buffered(self.concurrency)
            .inspect_ok(|_| {
                done += 1;
                progress.embed(done, total, &model);
            })
            .try_collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::trigram::TrigramProvider;
    use crate::parser::TextExtractor;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Splits a file into pages on form feeds.
    struct PagedExtractor;

    impl TextExtractor for PagedExtractor {
        fn name(&self) -> &'static str {
            "paged"
        }

        fn extract(&self, path: &Path) -> AppResult<Vec<PageText>> {
            let text = std::fs::read_to_string(path)?;
            Ok(text
                .split('\u{c}')
                .enumerate()
                .map(|(i, page)| PageText::new(i as u32 + 1, page))
                .collect())
        }
    }

    /// Fails for any text containing "poison".
    #[derive(Debug)]
    struct PoisonedEmbedder;

    #[async_trait]
    impl EmbeddingProvider for PoisonedEmbedder {
        fn provider_name(&self) -> &str {
            "poisoned"
        }

        fn model_name(&self) -> &str {
            "poisoned-v1"
        }

        fn dimensions(&self) -> usize {
            4
        }

        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            texts
                .iter()
                .map(|t| {
                    if t.contains("poison") {
                        Err(AppError::Embedding("refused".to_string()))
                    } else {
                        Ok(vec![1.0, 0.0, 0.0, 0.0])
                    }
                })
                .collect()
        }
    }

    fn pipeline(temp: &TempDir, embedder: Arc<dyn EmbeddingProvider>) -> IngestionPipeline {
        let mut extractors = ExtractorRegistry::default();
        extractors.register("paged", Arc::new(PagedExtractor));

        IngestionPipeline::new(
            extractors,
            Chunker::new(20, 5).unwrap(),
            embedder,
            temp.path().join("chroma_db"),
        )
        .with_staging_root(temp.path().join("staging"))
    }

    fn staging_is_empty(temp: &TempDir) -> bool {
        let root = temp.path().join("staging");
        !root.exists() || std::fs::read_dir(root).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_positions_continue_across_pages() {
        let temp = TempDir::new().unwrap();
        let pipeline = pipeline(&temp, Arc::new(TrigramProvider::new(64)));

        let text = format!("{}\u{c}{}", "a".repeat(30), "b".repeat(30));
        let handle = pipeline
            .ingest(
                vec![Document::new("guide.paged", text)],
                None,
                &ProgressReporter::noop(),
            )
            .await
            .unwrap();

        let chunks = index::list_chunks(&handle).unwrap();
        let positions: Vec<u32> = chunks.iter().map(|c| c.position).collect();
        let expected: Vec<u32> = (0..chunks.len() as u32).collect();
        assert_eq!(positions, expected);
        assert_eq!(chunks.first().unwrap().page, 1);
        assert_eq!(chunks.last().unwrap().page, 2);
        assert!(staging_is_empty(&temp));
    }

    #[tokio::test]
    async fn test_unsupported_extension_names_document() {
        let temp = TempDir::new().unwrap();
        let pipeline = pipeline(&temp, Arc::new(TrigramProvider::new(64)));

        let err = pipeline
            .ingest(
                vec![
                    Document::new("ok.txt", "fine"),
                    Document::new("slides.pptx", vec![1u8, 2, 3]),
                ],
                None,
                &ProgressReporter::noop(),
            )
            .await
            .unwrap_err();

        match err {
            AppError::Ingestion { document, reason } => {
                assert_eq!(document, "slides.pptx");
                assert!(reason.contains("unsupported"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!temp.path().join("chroma_db").exists());
        assert!(staging_is_empty(&temp));
    }

    #[tokio::test]
    async fn test_embedding_failure_aborts_batch() {
        let temp = TempDir::new().unwrap();
        let pipeline = pipeline(&temp, Arc::new(PoisonedEmbedder));

        let err = pipeline
            .ingest(
                vec![
                    Document::new("clean.txt", "nothing wrong here"),
                    Document::new("bad.txt", "this one is poison"),
                ],
                None,
                &ProgressReporter::noop(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Ingestion { ref document, .. } if document == "bad.txt"));
        assert!(index::open(&temp.path().join("chroma_db")).is_none());
    }

    #[tokio::test]
    async fn test_empty_batch_and_empty_text() {
        let temp = TempDir::new().unwrap();
        let pipeline = pipeline(&temp, Arc::new(TrigramProvider::new(64)));

        let err = pipeline
            .ingest(vec![], None, &ProgressReporter::noop())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Ingestion { .. }));

        let err = pipeline
            .ingest(
                vec![Document::new("blank.txt", "")],
                None,
                &ProgressReporter::noop(),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nothing to index"));
        assert!(!temp.path().join("chroma_db").exists());
    }

    #[tokio::test]
    async fn test_progress_phases_in_order() {
        let temp = TempDir::new().unwrap();
        let pipeline = pipeline(&temp, Arc::new(TrigramProvider::new(64)));

        let phases = Arc::new(Mutex::new(Vec::new()));
        let captured = phases.clone();
        let reporter = ProgressReporter::new(Arc::new(move |event| {
            let mut phases = captured.lock().unwrap();
            if phases.last() != Some(&event.phase) {
                phases.push(event.phase);
            }
        }));

        pipeline
            .ingest(
                vec![Document::new("notes.md", "# Title\n\nSome short notes.")],
                None,
                &reporter,
            )
            .await
            .unwrap();

        assert_eq!(
            *phases.lock().unwrap(),
            vec!["extract", "chunk", "embed", "persist"]
        );
    }
}
