//! Concrete LLM provider clients.

mod gemini;
mod ollama;

pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
