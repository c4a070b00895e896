//! RAG response types.

use crate::types::ScoredChunk;
use serde::{Deserialize, Serialize};

/// Maximum snippet length for source references, in characters.
pub const MAX_SNIPPET_LENGTH: usize = 150;

/// A single source reference used to answer a query.
///
/// This is the user-facing representation of where information came from.
/// Scores and unit offsets are left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Document name (e.g., "CollabCircle_Handbook.pdf")
    pub document: String,

    /// Human-readable location within the document, e.g. "page 2"
    pub location: String,

    /// Short snippet showing the relevant evidence (truncated if needed)
    pub snippet: String,
}

/// Answer to a query.
///
/// `text` is the generator output, unmodified. `context` holds the chunks
/// that were handed to the generator, best first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,

    /// Deduplicated references to the retrieved context
    pub sources: Vec<SourceRef>,

    pub context: Vec<ScoredChunk>,
}

impl Answer {
    pub fn new(text: String, context: Vec<ScoredChunk>) -> Self {
        let sources = map_chunks_to_sources(&context);
        Self {
            text,
            sources,
            context,
        }
    }

    /// Highest similarity among the retrieved chunks.
    pub fn max_score(&self) -> Option<f32> {
        self.context.first().map(|c| c.score)
    }
}

/// Map chunks to human-readable source references.
pub fn map_chunks_to_sources(chunks: &[ScoredChunk]) -> Vec<SourceRef> {
    let mut sources: Vec<SourceRef> = Vec::new();

    for scored in chunks {
        let chunk = &scored.chunk;
        let location = format!("page {}", chunk.page);

        // Deduplicate by (document, location); the first chunk is the best one
        if sources
            .iter()
            .any(|s| s.document == chunk.source && s.location == location)
        {
            continue;
        }

        sources.push(SourceRef {
            document: chunk.source.clone(),
            location,
            snippet: truncate_snippet(&chunk.text, MAX_SNIPPET_LENGTH),
        });
    }

    sources
}

/// Truncate to at most `max_chars` characters, preferring a word boundary.
pub fn truncate_snippet(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    let cut = match text.char_indices().nth(max_chars) {
        Some((byte, _)) => byte,
        None => return text.to_string(),
    };

    let truncated = &text[..cut];
    match truncated.rfind(char::is_whitespace) {
        Some(last_space) if last_space > 0 => format!("{}...", truncated[..last_space].trim_end()),
        _ => format!("{}...", truncated),
    }
}
