//! Google Gemini provider.
//!
//! Uses the `generateContent` REST method:
//! https://ai.google.dev/api/generate-content

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use crate::retry::AttemptError;
use crate::types::ClientOptions;
use orbit_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

/// Gemini LLM client.
pub struct GeminiClient {
    options: ClientOptions,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(options: ClientOptions, api_key: impl Into<String>) -> AppResult<Self> {
        let client = options
            .http_client()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            options,
            api_key: api_key.into(),
            client,
        })
    }

    fn to_gemini_request(&self, request: &LlmRequest) -> GenerateContentRequest {
        GenerateContentRequest {
            system_instruction: request.system.as_ref().map(|system| Content {
                role: None,
                parts: vec![Part {
                    text: system.clone(),
                }],
            }),
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: request.prompt.clone(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        }
    }

    fn convert_response(
        &self,
        model: &str,
        response: GenerateContentResponse,
    ) -> Result<LlmResponse, AttemptError> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AttemptError::Fatal("Gemini returned no candidates".to_string()))?;

        let content = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let usage = response
            .usage_metadata
            .map(|u| LlmUsage::new(u.prompt_token_count, u.candidates_token_count))
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            model: response.model_version.unwrap_or_else(|| model.to_string()),
            usage,
            finish_reason: candidate.finish_reason,
        })
    }

    async fn attempt(
        &self,
        model: &str,
        body: &GenerateContentRequest,
    ) -> Result<LlmResponse, AttemptError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.options.endpoint, model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
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

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AttemptError::Fatal(format!("Failed to parse Gemini response: {}", e)))?;

        self.convert_response(model, parsed)
    }
}

#[async_trait::async_trait]
impl LlmClient for GeminiClient {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!("Sending completion request to Gemini ({})", request.model);

        let body = self.to_gemini_request(request);
        let response = self
            .options
            .retry
            .run("Gemini completion", || self.attempt(&request.model, &body))
            .await
            .map_err(|e| AppError::Llm(format!("Gemini API error: {}", e)))?;

        tracing::info!(
            "Received completion from Gemini ({} tokens)",
            response.usage.total_tokens
        );
        Ok(response)
    }
}
