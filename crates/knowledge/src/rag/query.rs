//! Query pipeline: retrieve, then generate.

use crate::index::IndexHandle;
use crate::rag::generator::Generator;
use crate::rag::retriever::Retriever;
use crate::rag::types::Answer;
use orbit_core::{AppError, AppResult};
use std::time::Instant;

#[derive(Clone)]
pub struct QueryPipeline {
    retriever: Retriever,
    generator: Generator,
    top_k: usize,
}

impl QueryPipeline {
    pub fn new(retriever: Retriever, generator: Generator, top_k: usize) -> Self {
        Self {
            retriever,
            generator,
            top_k,
        }
    }

    /// Answer `query` against the index. No retries, no caching.
    pub async fn query(&self, query: &str, handle: Option<&IndexHandle>) -> AppResult<Answer> {
        let handle = handle.ok_or(AppError::KnowledgeBaseNotInitialized)?;
        let start = Instant::now();

        tracing::info!("Answering query: {}", query);

        let context = self
            .retriever
            .retrieve(query, Some(handle), self.top_k)
            .await?;
        let text = self.generator.answer(query, &context).await?;

        tracing::info!(
            "Answered from {} chunks in {:.2}s",
            context.len(),
            start.elapsed().as_secs_f64()
        );

        Ok(Answer::new(text, context))
    }
}
