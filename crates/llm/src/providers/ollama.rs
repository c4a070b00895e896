//! Ollama LLM provider implementation.
//!
//! This module provides integration with Ollama, a local LLM runtime.
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use crate::retry::AttemptError;
use crate::types::{ClientOptions, OLLAMA_DEFAULT_ENDPOINT};
use orbit_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    options: OllamaOptions,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Ollama API response format.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    model: String,
    response: String,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Ollama LLM client.
pub struct OllamaClient {
    options: ClientOptions,

    /// HTTP client
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(options: ClientOptions) -> AppResult<Self> {
        let client = options
            .http_client()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { options, client })
    }

    /// Create a client for the default local endpoint.
    pub fn local() -> AppResult<Self> {
        Self::new(ClientOptions::new(OLLAMA_DEFAULT_ENDPOINT))
    }

    /// Convert LlmRequest to Ollama format.
    fn to_ollama_request(&self, request: &LlmRequest) -> OllamaRequest {
        OllamaRequest {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            system: request.system.clone(),
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
            stream: false,
        }
    }

    /// Convert Ollama response to LlmResponse.
    fn convert_response(&self, response: OllamaResponse) -> LlmResponse {
        let usage = LlmUsage::new(
            response.prompt_eval_count.unwrap_or(0),
            response.eval_count.unwrap_or(0),
        );

        LlmResponse {
            content: response.response,
            model: response.model,
            usage,
            finish_reason: response.done_reason,
        }
    }

    async fn attempt(&self, body: &OllamaRequest) -> Result<OllamaResponse, AttemptError> {
        let url = format!("{}/api/generate", self.options.endpoint);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(AttemptError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AttemptError::from_status(status, &error_text));
        }

        response
            .json::<OllamaResponse>()
            .await
            .map_err(|e| AttemptError::Fatal(format!("Failed to parse Ollama response: {}", e)))
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!("Sending completion request to Ollama");
        tracing::debug!("Request: {:?}", request);

        let ollama_request = self.to_ollama_request(request);
        let ollama_response = self
            .options
            .retry
            .run("Ollama completion", || self.attempt(&ollama_request))
            .await
            .map_err(|e| AppError::Llm(format!("Ollama API error: {}", e)))?;

        tracing::info!("Received completion from Ollama");
        tracing::debug!("Response: {:?}", ollama_response);

        Ok(self.convert_response(ollama_response))
    }
}
