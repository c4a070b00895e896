//! Trigram embedding provider using character trigram-based content-aware embeddings.

use crate::embeddings::provider::EmbeddingProvider;
use orbit_core::AppResult;
use std::collections::{BTreeMap, HashSet};
use unicode_segmentation::UnicodeSegmentation;

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them",
];

/// Trigram-based embedding provider for local, offline operation.
///
/// Generates deterministic embeddings based on text content using
/// character trigrams and word frequencies. While not semantically
/// accurate like neural embedding models, it produces consistent,
/// content-dependent vectors suitable for development and tests.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
    stop_words: HashSet<&'static str>,
}

impl TrigramProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
            stop_words: STOP_WORDS.iter().copied().collect(),
        }
    }

    fn generate_trigram_embedding(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0; self.dimensions];

        let lower = text.to_lowercase();

        // Ordered map keeps float accumulation order stable across runs
        let mut word_freq: BTreeMap<&str, u32> = BTreeMap::new();
        for word in lower
            .unicode_words()
            .filter(|w| !self.stop_words.contains(w) && w.len() > 2)
        {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                let trigram_hash = trigram
                    .bytes()
                    .fold(0u64, |acc, b| acc.wrapping_mul(37).wrapping_add(b as u64));

                let dim_idx = (trigram_hash as usize) % self.dimensions;
                embedding[dim_idx] += (*freq as f32).sqrt();
            }

            // Also encode whole word
            let word_hash = word
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            let base_dim = (word_hash as usize) % self.dimensions;
            embedding[base_dim] += *freq as f32;
        }

        // Normalize to unit vector
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| self.generate_trigram_embedding(text))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[tokio::test]
    async fn test_trigram_provider_dimensions() {
        let provider = TrigramProvider::new(384);
        assert_eq!(provider.dimensions(), 384);
        assert_eq!(provider.provider_name(), "trigram");
        assert_eq!(provider.model_name(), "trigram-v1");
    }

    #[tokio::test]
    async fn test_trigram_provider_embed_batch() {
        let provider = TrigramProvider::new(384);
        let texts = vec![
            "hello world".to_string(),
            "test embedding".to_string(),
            "rust programming".to_string(),
        ];

        let embeddings = provider.embed_batch(&texts).await.unwrap();

        assert_eq!(embeddings.len(), 3);
        for embedding in &embeddings {
            assert_eq!(embedding.len(), 384);
            assert!((norm(embedding) - 1.0).abs() < 0.001);
        }
    }

    #[tokio::test]
    async fn test_trigram_provider_deterministic() {
        let provider = TrigramProvider::new(384);
        let text = "CollabCircle was founded in 2023 by three students.";

        let embedding1 = provider.embed(text).await.unwrap();
        let embedding2 = TrigramProvider::new(384).embed(text).await.unwrap();

        assert_eq!(embedding1, embedding2);
    }

    #[tokio::test]
    async fn test_trigram_provider_different_texts() {
        let provider = TrigramProvider::new(384);

        let embedding1 = provider.embed("hello world").await.unwrap();
        let embedding2 = provider.embed("goodbye world").await.unwrap();

        assert_ne!(embedding1, embedding2);
    }

    #[tokio::test]
    async fn test_punctuation_does_not_change_words() {
        let provider = TrigramProvider::new(384);

        let a = provider.embed("founded 2023.").await.unwrap();
        let b = provider.embed("Founded 2023?").await.unwrap();

        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_trigram_provider_empty_text() {
        let provider = TrigramProvider::new(384);
        let embedding = provider.embed("   ").await.unwrap();

        assert_eq!(embedding.len(), 384);
        assert!(embedding.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_trigram_provider_utf8_safety() {
        let provider = TrigramProvider::new(384);

        let text = "Gamedex é um aplicativo 🎮 brasileiro para gerenciar jogos!";
        let embedding = provider.embed(text).await.unwrap();

        assert_eq!(embedding.len(), 384);
        assert!((norm(&embedding) - 1.0).abs() < 0.001);
    }
}
