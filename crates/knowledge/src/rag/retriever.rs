//! Query-time retrieval: embed the question, search the index.

use crate::embeddings::EmbeddingProvider;
use crate::index::{self, IndexHandle};
use crate::types::ScoredChunk;
use orbit_core::{AppError, AppResult};
use std::sync::Arc;

/// Embeds queries and returns the most similar stored chunks.
#[derive(Debug, Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    min_relevance_score: f32,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, min_relevance_score: f32) -> Self {
        Self {
            embedder,
            min_relevance_score,
        }
    }

    pub fn min_relevance_score(&self) -> f32 {
        self.min_relevance_score
    }

    /// Top-`k` chunks for `query`, dropping those below the relevance floor.
    pub async fn retrieve(
        &self,
        query: &str,
        handle: Option<&IndexHandle>,
        k: usize,
    ) -> AppResult<Vec<ScoredChunk>> {
        let handle = handle.ok_or(AppError::IndexUnavailable)?;

        let query_embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to embed query: {}", e)))?;

        let search_handle = handle.clone();
        let span = tracing::Span::current();
        let results = tokio::task::spawn_blocking(move || {
            span.in_scope(|| index::similarity_search(&search_handle, &query_embedding, k))
        })
        .await
        .map_err(|e| AppError::Retrieval(format!("Search task failed: {}", e)))??;

        let found = results.len();
        let relevant: Vec<ScoredChunk> = results
            .into_iter()
            .filter(|c| c.score >= self.min_relevance_score)
            .collect();

        tracing::info!(
            "Retrieved {} relevant chunks of {} (threshold {:.2}, best {:.3})",
            relevant.len(),
            found,
            self.min_relevance_score,
            relevant.first().map(|c| c.score).unwrap_or(0.0)
        );

        Ok(relevant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::trigram::TrigramProvider;
    use crate::types::{Chunk, IndexEntry};
    use tempfile::TempDir;

    async fn build_index(temp: &TempDir, embedder: &TrigramProvider, texts: &[&str]) -> IndexHandle {
        let mut entries = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            entries.push(IndexEntry {
                chunk: Chunk {
                    text: text.to_string(),
                    source: "notes.txt".to_string(),
                    page: 1,
                    position: i as u32,
                    start: 0,
                    end: text.chars().count(),
                    hash: format!("{}", i),
                },
                embedding: embedder.embed(text).await.unwrap(),
            });
        }
        index::create_from(&entries, &temp.path().join("chroma_db"), embedder.model_name()).unwrap()
    }

    #[tokio::test]
    async fn test_retrieve_without_index() {
        let retriever = Retriever::new(Arc::new(TrigramProvider::new(64)), 0.2);
        let err = retriever.retrieve("anything", None, 4).await.unwrap_err();
        assert!(matches!(err, AppError::IndexUnavailable));
    }

    #[tokio::test]
    async fn test_retrieve_ranks_matching_chunk_first() {
        let temp = TempDir::new().unwrap();
        let embedder = TrigramProvider::new(512);
        let handle = build_index(
            &temp,
            &embedder,
            &[
                "Mentors review student projects every Friday.",
                "CollabCircle was founded in 2023 by university students.",
                "Membership requires a valid student email.",
            ],
        )
        .await;

        let retriever = Retriever::new(Arc::new(embedder), 0.0);
        let results = retriever
            .retrieve("When was CollabCircle founded?", Some(&handle), 2)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[0].chunk.text.contains("2023"));
    }

    #[tokio::test]
    async fn test_relevance_floor_drops_unrelated_chunks() {
        let temp = TempDir::new().unwrap();
        let embedder = TrigramProvider::new(512);
        let handle = build_index(&temp, &embedder, &["Mentors review projects weekly."]).await;

        let retriever = Retriever::new(Arc::new(embedder), 0.99);
        let results = retriever
            .retrieve("zebra xylophone quartz", Some(&handle), 4)
            .await
            .unwrap();

        assert!(results.is_empty());
    }
}
