//! Orbit knowledge base.
//!
//! Document ingestion and retrieval-augmented answering over a persistent
//! SQLite vector index:
//! - `parser`: text extraction by file extension
//! - `chunker`: overlapping fixed-size segments
//! - `embeddings`: text to vector providers
//! - `index`: the persistent vector index
//! - `ingest`: extract, chunk, embed, persist
//! - `rag`: retrieve, then generate
//!
//! [`Assistant`] wires these together from configuration and exposes the
//! boundary calls. The index handle is a plain value owned by the caller.

pub mod chunker;
pub mod embeddings;
pub mod index;
pub mod ingest;
pub mod parser;
pub mod progress;
pub mod rag;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use chunker::Chunker;
pub use embeddings::{check_provider, create_provider, EmbeddingProvider};
pub use index::{IndexHandle, IndexMetadata};
pub use ingest::IngestionPipeline;
pub use parser::{ExtractorRegistry, TextExtractor};
pub use progress::{ProgressCallback, ProgressEvent, ProgressReporter};
pub use rag::{Answer, Generator, QueryPipeline, Retriever, SourceRef};
pub use types::{Chunk, Document, IndexEntry, IndexStats, PageText, ScoredChunk};

use orbit_core::{AppConfig, AppError, AppResult};
use orbit_llm::{create_client, LlmClient};
use orbit_prompt::load_answer_prompt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The assistant: ingestion and query pipelines built once from configuration.
#[derive(Clone)]
pub struct Assistant {
    extractors: ExtractorRegistry,
    embedder: Arc<dyn EmbeddingProvider>,
    ingestion: IngestionPipeline,
    query: QueryPipeline,
    index_location: PathBuf,
}

impl Assistant {
    /// Build the assistant with the embedder and LLM named in `config`.
    ///
    /// No network request is made here.
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let embedder = create_provider(&config.embedding)?;
        let api_key = config.resolve_api_key();
        let llm = create_client(&config.llm, api_key.as_deref())?;
        Self::with_components(config, embedder, llm)
    }

    /// Build the assistant around explicit providers.
    pub fn with_components(
        config: &AppConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmClient>,
    ) -> AppResult<Self> {
        let chunker = Chunker::from_settings(&config.chunking)?;
        let prompt = load_answer_prompt(&config.prompts_dir())?;
        let extractors = ExtractorRegistry::default();
        let index_location = config.index_path();

        let ingestion = IngestionPipeline::new(
            extractors.clone(),
            chunker,
            embedder.clone(),
            index_location.clone(),
        )
        .with_concurrency(config.embedding.concurrency);

        let retriever = Retriever::new(embedder.clone(), config.retrieval.min_relevance_score);
        let generator = Generator::new(llm, prompt, &config.llm);
        let query = QueryPipeline::new(retriever, generator, config.retrieval.top_k);

        tracing::debug!(
            "Assistant ready (embedder={}/{}, index={})",
            embedder.provider_name(),
            embedder.model_name(),
            index_location.display()
        );

        Ok(Self {
            extractors,
            embedder,
            ingestion,
            query,
            index_location,
        })
    }

    /// Stage uploads under `root` instead of the system temp directory.
    pub fn with_staging_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.ingestion = self.ingestion.with_staging_root(root);
        self
    }

    /// Open the persisted index, if there is one.
    pub fn initialize(&self) -> Option<IndexHandle> {
        let handle = index::open(&self.index_location);
        match &handle {
            Some(h) => tracing::info!(
                "Knowledge base loaded from {} (model {})",
                h.location().display(),
                h.metadata().embedding_model
            ),
            None => tracing::info!(
                "No knowledge base at {}",
                self.index_location.display()
            ),
        }
        handle
    }

    /// Ingest a batch of documents into a new or existing index.
    pub async fn ingest(
        &self,
        documents: Vec<Document>,
        existing: Option<&IndexHandle>,
    ) -> AppResult<IndexHandle> {
        self.ingest_with_progress(documents, existing, &ProgressReporter::noop())
            .await
    }

    pub async fn ingest_with_progress(
        &self,
        documents: Vec<Document>,
        existing: Option<&IndexHandle>,
        progress: &ProgressReporter,
    ) -> AppResult<IndexHandle> {
        self.ingestion.ingest(documents, existing, progress).await
    }

    /// Answer a question from the indexed documents.
    pub async fn query(&self, text: &str, handle: Option<&IndexHandle>) -> AppResult<Answer> {
        self.query.query(text, handle).await
    }

    pub async fn stats(&self, handle: &IndexHandle) -> AppResult<IndexStats> {
        let handle = handle.clone();
        tokio::task::spawn_blocking(move || index::stats(&handle))
            .await
            .map_err(|e| AppError::Other(format!("Stats task failed: {}", e)))?
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// File extensions the ingestion pipeline accepts.
    pub fn supported_extensions(&self) -> Vec<String> {
        self.extractors.extensions()
    }

    pub fn supports(&self, path: &Path) -> bool {
        self.extractors.supports(path)
    }

    pub fn index_location(&self) -> &Path {
        &self.index_location
    }
}
