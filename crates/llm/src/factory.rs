//! LLM provider factory.
//!
//! This module provides a factory for creating LLM clients based on
//! application configuration. It handles provider resolution and secret
//! injection.

use std::sync::Arc;
use std::time::Duration;

use orbit_core::config::LlmSettings;
use orbit_core::{AppError, AppResult};

use crate::client::LlmClient;
use crate::providers::{GeminiClient, OllamaClient};
use crate::retry::RetryPolicy;
use crate::types::{ClientOptions, ProviderType};

/// Create an LLM client from the configured settings.
///
/// This function performs the following:
/// 1. Matches the provider string to a known provider type
/// 2. Checks that required secrets are present
/// 3. Creates the client with the configured timeout and retry policy
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown, the API key is
/// missing for a provider that needs one, or the HTTP client cannot be built.
pub fn create_client(
    settings: &LlmSettings,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider = ProviderType::parse(&settings.provider)
        .ok_or_else(|| AppError::Config(format!("Unknown LLM provider: {}", settings.provider)))?;

    let endpoint = settings
        .endpoint
        .as_deref()
        .unwrap_or_else(|| provider.default_endpoint());
    let options = ClientOptions::new(endpoint)
        .with_timeout(Duration::from_secs(settings.timeout_secs))
        .with_retry(RetryPolicy::new(settings.max_retries));

    tracing::debug!(
        "Creating {} client (model={}, endpoint={})",
        provider.as_str(),
        settings.model,
        options.endpoint
    );

    let api_key = api_key.map(str::trim).filter(|k| !k.is_empty());
    if provider.requires_api_key() && api_key.is_none() {
        return Err(AppError::Config(format!(
            "{} provider requires API key (set {})",
            provider.as_str(),
            settings.api_key_env
        )));
    }

    match provider {
        ProviderType::Gemini => Ok(Arc::new(GeminiClient::new(
            options,
            api_key.unwrap_or_default(),
        )?)),
        ProviderType::Ollama => Ok(Arc::new(OllamaClient::new(options)?)),
    }
}
