//! Embedding provider trait and factory.

use super::providers::{ollama::OllamaProvider, trigram::TrigramProvider};
use orbit_core::config::EmbeddingSettings;
use orbit_core::{AppError, AppResult};
use orbit_llm::{ClientOptions, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "trigram", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}

/// Create an embedding provider based on configuration.
pub fn create_provider(settings: &EmbeddingSettings) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match settings.provider.as_str() {
        "trigram" => Ok(Arc::new(TrigramProvider::new(settings.dimensions))),

        "ollama" => Ok(Arc::new(OllamaProvider::new(settings)?)),

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: ollama, trigram",
            settings.provider
        ))),
    }
}

/// Send one test embedding request to the configured provider.
///
/// Ollama is probed without retries so an unreachable server fails fast.
pub async fn check_provider(settings: &EmbeddingSettings) -> AppResult<()> {
    match settings.provider.as_str() {
        "ollama" => {
            let options = ClientOptions::new(settings.endpoint.as_str())
                .with_timeout(Duration::from_secs(settings.timeout_secs))
                .with_retry(RetryPolicy::none());
            OllamaProvider::with_options(options, &settings.model, settings.dimensions)?
                .verify_connection()
                .await
        }
        _ => create_provider(settings)?
            .embed("test connection")
            .await
            .map(|_| ()),
    }
}
