//! Text chunking with configurable size and overlap.
//!
//! Windows are measured in extended grapheme clusters, so a user-perceived
//! character is never split across chunks. Text is never trimmed: every
//! unit of the input lands in at least one chunk.

use crate::types::{Chunk, PageText};
use orbit_core::config::ChunkingSettings;
use orbit_core::{AppError, AppResult};
use sha2::{Digest, Sha256};
use unicode_segmentation::UnicodeSegmentation;

/// Fixed-window chunker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    max_length: usize,
    overlap: usize,
}

impl Chunker {
    /// Create a chunker. Requires `max_length > 0` and `overlap < max_length`.
    pub fn new(max_length: usize, overlap: usize) -> AppResult<Self> {
        if max_length == 0 {
            return Err(AppError::Config(
                "chunking.maxLength must be greater than 0".to_string(),
            ));
        }
        if overlap >= max_length {
            return Err(AppError::Config(format!(
                "chunking.overlap ({}) must be less than chunking.maxLength ({})",
                overlap, max_length
            )));
        }
        Ok(Self {
            max_length,
            overlap,
        })
    }

    pub fn from_settings(settings: &ChunkingSettings) -> AppResult<Self> {
        Self::new(settings.max_length, settings.overlap)
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split one page into chunks.
    ///
    /// `first_position` is the document-wide position of the first chunk, so
    /// positions stay continuous when a document spans several pages.
    pub fn split(&self, source: &str, page: &PageText, first_position: u32) -> Vec<Chunk> {
        let text = page.text.as_str();
        if text.is_empty() {
            return vec![];
        }

        // Byte offset of every grapheme, plus the end of the text.
        let mut bounds: Vec<usize> = text.grapheme_indices(true).map(|(i, _)| i).collect();
        let units = bounds.len();
        bounds.push(text.len());

        let step = self.max_length - self.overlap;
        let mut chunks = Vec::new();
        let mut position = first_position;
        let mut start = 0;

        loop {
            let end = (start + self.max_length).min(units);
            let segment = &text[bounds[start]..bounds[end]];

            chunks.push(Chunk {
                text: segment.to_string(),
                source: source.to_string(),
                page: page.page,
                position,
                start,
                end,
                hash: hash_text(segment),
            });

            if end == units {
                break;
            }
            position += 1;
            start += step;
        }

        tracing::debug!(
            "Chunked {} page {} into {} chunks ({} units, size: {}, overlap: {})",
            source,
            page.page,
            chunks.len(),
            units,
            self.max_length,
            self.overlap
        );

        chunks
    }

    /// Split every page of a document, numbering chunks continuously.
    pub fn split_pages(&self, source: &str, pages: &[PageText]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for page in pages {
            let next = chunks.len() as u32;
            chunks.extend(self.split(source, page, next));
        }
        chunks
    }
}

fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
