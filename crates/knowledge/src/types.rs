//! Knowledge system type definitions.

use chrono::{DateTime, Utc};
use orbit_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// An uploaded document: a filename and its raw bytes.
///
/// Read once during ingestion and never retained.
#[derive(Clone)]
pub struct Document {
    /// File name; its extension selects the extractor
    pub name: String,

    /// Raw file content
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a document from disk, named after its file name.
    pub fn from_path(path: &Path) -> AppResult<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| AppError::Other(format!("Not a file path: {}", path.display())))?;
        let bytes = std::fs::read(path)?;
        Ok(Self { name, bytes })
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("name", &self.name)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Text of a single page. Non-paginated formats produce one page numbered 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// 1-based page number
    pub page: u32,

    pub text: String,
}

impl PageText {
    pub fn new(page: u32, text: impl Into<String>) -> Self {
        Self {
            page,
            text: text.into(),
        }
    }
}

/// A contiguous segment of a document's text.
///
/// Offsets and lengths are counted in extended grapheme clusters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Segment text
    pub text: String,

    /// Name of the originating document
    pub source: String,

    /// Page the segment was taken from
    pub page: u32,

    /// Order of the chunk within its document, across pages
    pub position: u32,

    /// First unit of the segment within the page text
    pub start: usize,

    /// One past the last unit of the segment within the page text
    pub end: usize,

    /// SHA-256 of the text, hex encoded
    pub hash: String,
}

/// A chunk together with its embedding, as stored in the index.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// A chunk returned by similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,

    /// Cosine similarity with the query
    pub score: f32,
}

/// Statistics for a vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Index directory
    pub location: PathBuf,

    /// Number of stored chunks
    pub chunks_count: u64,

    /// Number of distinct documents
    pub documents_count: u64,

    /// Embedding model the index was built with
    pub embedding_model: String,

    /// Embedding dimension
    pub dimensions: usize,

    /// Size of the index directory in bytes
    pub size_bytes: u64,

    /// When the index was created
    pub created_at: DateTime<Utc>,

    /// Last successful ingestion
    pub last_ingest_at: Option<DateTime<Utc>>,
}
