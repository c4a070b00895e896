//! Ollama Embedding Provider
//!
//! Provides semantic embeddings via Ollama's local API. The default model,
//! `all-minilm`, is all-MiniLM-L6-v2 with 384 dimensions.
//!
//! # Features
//! - Local-first (no API costs, privacy-preserving)
//! - Bounded retry with exponential backoff on transient failures
//! - Configurable request timeout
//!
//! # Example
//! ```no_run
//! use orbit_core::config::EmbeddingSettings;
//! use orbit_knowledge::embeddings::EmbeddingProvider;
//! use orbit_knowledge::embeddings::providers::ollama::OllamaProvider;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = OllamaProvider::new(&EmbeddingSettings::default())?;
//! let embedding = provider.embed("Hello world").await?;
//! assert_eq!(embedding.len(), 384);
//! # Ok(())
//! # }
//! ```

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use orbit_core::config::EmbeddingSettings;
use orbit_core::{AppError, AppResult};
use orbit_llm::{AttemptError, ClientOptions, RetryPolicy};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const EMBEDDING_ENDPOINT: &str = "/api/embeddings";

/// Ollama embedding provider using local API
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    options: ClientOptions,
    /// Model name (e.g., "all-minilm")
    model: String,
    /// Expected embedding dimensions
    dimensions: usize,
}

/// Request payload for Ollama embeddings API
#[derive(Debug, Clone, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// Response from Ollama embeddings API
#[derive(Debug, Clone, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Error response from Ollama API
#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaProvider {
    /// Create a provider from configuration. No request is made.
    pub fn new(settings: &EmbeddingSettings) -> AppResult<Self> {
        let options = ClientOptions::new(settings.endpoint.as_str())
            .with_timeout(Duration::from_secs(settings.timeout_secs))
            .with_retry(RetryPolicy::new(settings.max_retries));

        Self::with_options(options, &settings.model, settings.dimensions)
    }

    pub fn with_options(
        options: ClientOptions,
        model: impl Into<String>,
        dimensions: usize,
    ) -> AppResult<Self> {
        let client = options.http_client().map_err(|e| {
            AppError::Config(format!("Failed to create HTTP client for Ollama: {}", e))
        })?;

        Ok(Self {
            client,
            options,
            model: model.into(),
            dimensions,
        })
    }

    /// Verify Ollama is reachable and the model returns the expected dimensions.
    #[instrument(skip(self), fields(model = %self.model))]
    pub async fn verify_connection(&self) -> AppResult<()> {
        debug!("Verifying Ollama connection at {}", self.options.endpoint);

        self.embed("test connection").await.map_err(|e| {
            AppError::Embedding(format!(
                "Ollama not available at {} ({}). Ensure Ollama is running and model '{}' is installed. Run: ollama pull {}",
                self.options.endpoint, e, self.model, self.model
            ))
        })?;

        debug!("Ollama connection verified, model '{}' ready", self.model);
        Ok(())
    }

    /// Embed single text (one attempt)
    async fn embed_once(&self, text: &str) -> Result<Vec<f32>, AttemptError> {
        let url = format!("{}{}", self.options.endpoint, EMBEDDING_ENDPOINT);

        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(AttemptError::from_transport)?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|e| e.error)
                .unwrap_or(error_text);

            return Err(AttemptError::from_status(status, &message));
        }

        let response_body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AttemptError::Fatal(format!("Failed to parse Ollama response: {}", e)))?;

        if response_body.embedding.len() != self.dimensions {
            return Err(AttemptError::Fatal(format!(
                "Unexpected embedding dimensions: got {}, expected {}",
                response_body.embedding.len(),
                self.dimensions
            )));
        }

        Ok(response_body.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    #[instrument(skip(self, text), fields(text_len = text.len(), provider = "ollama", model = %self.model))]
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        // Whitespace-only chunks are kept by the chunker; give them a neutral vector
        if text.trim().is_empty() {
            return Ok(vec![0.0; self.dimensions]);
        }

        self.options
            .retry
            .run("Ollama embedding", || self.embed_once(text))
            .await
            .map_err(|e| AppError::Embedding(format!("Ollama API error: {}", e)))
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "ollama", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        // Ollama's embeddings endpoint takes one prompt per request
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
