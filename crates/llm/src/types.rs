//! LLM provider types.
//!
//! Provider identification and the per-client connection options.

use std::time::Duration;

use crate::retry::RetryPolicy;

/// Default Gemini REST endpoint.
pub const GEMINI_DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Default local Ollama endpoint.
pub const OLLAMA_DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Provider type enum for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    Gemini,
    Ollama,
}

impl ProviderType {
    /// Parse provider type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" => Some(Self::Gemini),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
        }
    }

    /// Endpoint used when the configuration leaves it unset.
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::Gemini => GEMINI_DEFAULT_ENDPOINT,
            Self::Ollama => OLLAMA_DEFAULT_ENDPOINT,
        }
    }

    /// Whether the provider needs an API key.
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::Gemini)
    }
}

/// Connection options shared by every HTTP-backed client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Base URL, without trailing slash
    pub endpoint: String,

    /// Per-request timeout
    pub timeout: Duration,

    /// Retry policy for transient failures
    pub retry: RetryPolicy,
}

impl ClientOptions {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint: String = endpoint.into();
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Build a reqwest client honoring the timeout.
    pub fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder().timeout(self.timeout).build()
    }
}
