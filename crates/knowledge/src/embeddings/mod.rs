//! Embedding providers.
//!
//! Maps text to fixed-dimension vectors. Identical text under the same model
//! yields identical vectors.

pub mod provider;
pub mod providers;

pub use provider::{check_provider, create_provider, EmbeddingProvider};
