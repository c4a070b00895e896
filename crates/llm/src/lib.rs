//! LLM integration crate for Orbit.
//!
//! This crate provides a provider-agnostic abstraction for interacting with
//! Large Language Models (LLMs). It supports multiple providers through a
//! unified trait-based interface.
//!
//! # Providers
//! - **Gemini**: Google Generative Language API (default)
//! - **Ollama**: Local LLM runtime
//!
//! # Example
//! ```no_run
//! use orbit_llm::{ClientOptions, LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new(ClientOptions::new("http://localhost:11434"))?;
//! let request = LlmRequest::new("Hello, world!", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod retry;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{GeminiClient, OllamaClient};
pub use retry::{AttemptError, RetryPolicy};
pub use types::{ClientOptions, ProviderType};
