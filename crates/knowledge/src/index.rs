//! SQLite-backed persistent vector index.
//!
//! An index is a directory holding `index.sqlite`. A new index is built in a
//! sibling staging directory and renamed into place, so readers see either
//! no index or a complete one. Later batches are appended inside a single
//! transaction. Stored entries are never updated or deleted.

use crate::types::{Chunk, IndexEntry, IndexStats, ScoredChunk};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use orbit_core::{AppError, AppResult};
use rusqlite::{params, Connection, OpenFlags, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Database file inside the index directory.
pub const INDEX_FILE: &str = "index.sqlite";

/// On-disk format version.
pub const SCHEMA_VERSION: u32 = 1;

/// How long a writer waits for another writer's lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS index_meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS ingests (
        id TEXT PRIMARY KEY,
        ingested_at TEXT NOT NULL,
        documents INTEGER NOT NULL,
        chunks INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS entries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        ingest_id TEXT NOT NULL REFERENCES ingests(id),
        source TEXT NOT NULL,
        page INTEGER NOT NULL,
        position INTEGER NOT NULL,
        start_unit INTEGER NOT NULL,
        end_unit INTEGER NOT NULL,
        text TEXT NOT NULL,
        hash TEXT NOT NULL,
        embedding BLOB NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_entries_source ON entries(source);
"#;

/// Facts recorded when the index was created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub schema_version: u32,
    pub embedding_model: String,
    pub dimensions: usize,
    pub created_at: DateTime<Utc>,
}

/// Reference to an existing index.
///
/// Holds only the location and a metadata snapshot; every operation opens
/// its own connection.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHandle {
    location: PathBuf,
    metadata: IndexMetadata,
}

impl IndexHandle {
    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    fn db_path(&self) -> PathBuf {
        self.location.join(INDEX_FILE)
    }
}

/// Open the index at `location`, if there is a usable one.
///
/// Absence is not an error. A directory that holds an unreadable index is
/// logged and reported as absent.
pub fn open(location: &Path) -> Option<IndexHandle> {
    let db_path = location.join(INDEX_FILE);
    if !location.is_dir() || !db_path.is_file() {
        tracing::debug!("No index at {}", location.display());
        return None;
    }

    match connect(&db_path).and_then(|conn| read_metadata(&conn)) {
        Ok(metadata) => {
            tracing::debug!(
                "Opened index at {} (model={}, dimensions={})",
                location.display(),
                metadata.embedding_model,
                metadata.dimensions
            );
            Some(IndexHandle {
                location: location.to_path_buf(),
                metadata,
            })
        }
        Err(e) => {
            tracing::warn!(
                "Ignoring unreadable index at {}: {}",
                location.display(),
                e
            );
            None
        }
    }
}

/// Persist a batch of entries at `location`.
///
/// Creates the index when none exists, otherwise appends to it. Either the
/// whole batch becomes visible or none of it does. Failures are reported as
/// `AppError::Ingestion` naming the documents of the batch.
pub fn create_from(
    entries: &[IndexEntry],
    location: &Path,
    embedding_model: &str,
) -> AppResult<IndexHandle> {
    let batch = batch_label(entries);
    create_or_append(entries, location, embedding_model).map_err(|e| as_ingestion(&batch, e))
}

fn create_or_append(
    entries: &[IndexEntry],
    location: &Path,
    embedding_model: &str,
) -> AppResult<IndexHandle> {
    let dimensions = batch_dimensions(entries)?;

    if let Some(handle) = open(location) {
        return append(&handle, entries, embedding_model, dimensions);
    }

    ensure_location_free(location)?;

    let parent = location
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let name = location
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "index".to_string());
    let staging = tempfile::Builder::new()
        .prefix(&format!(".{}.staging-", name))
        .tempdir_in(parent)?;

    let metadata = IndexMetadata {
        schema_version: SCHEMA_VERSION,
        embedding_model: embedding_model.to_string(),
        dimensions,
        // Stored with microsecond precision
        created_at: Utc::now().trunc_subsecs(6),
    };

    tracing::debug!("Building new index in {}", staging.path().display());
    build_index(&staging.path().join(INDEX_FILE), &metadata, entries)?;

    match fs::rename(staging.path(), location) {
        Ok(()) => {
            tracing::info!(
                "Created index at {} with {} entries",
                location.display(),
                entries.len()
            );
            Ok(IndexHandle {
                location: location.to_path_buf(),
                metadata,
            })
        }
        Err(rename_err) => match open(location) {
            // Another writer created the index first
            Some(handle) => {
                tracing::warn!(
                    "Index appeared at {} while building; appending instead",
                    location.display()
                );
                drop(staging);
                append(&handle, entries, embedding_model, dimensions)
            }
            None => Err(AppError::Other(format!(
                "Failed to move index into {}: {}",
                location.display(),
                rename_err
            ))),
        },
    }
}

fn build_index(db_path: &Path, metadata: &IndexMetadata, entries: &[IndexEntry]) -> AppResult<()> {
    let mut conn = Connection::open(db_path).map_err(storage_err("Failed to create index"))?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
        .map_err(storage_err("Failed to enable WAL"))?;
    configure(&conn)?;
    conn.execute_batch(SCHEMA)
        .map_err(storage_err("Failed to create tables"))?;

    let tx = conn
        .transaction()
        .map_err(storage_err("Failed to begin transaction"))?;
    write_metadata(&tx, metadata)?;
    insert_batch(&tx, entries)?;
    tx.commit().map_err(storage_err("Failed to commit index"))?;

    // Closing the last connection checkpoints the WAL into the main file
    conn.close()
        .map_err(|(_, e)| AppError::Other(format!("Failed to close index: {}", e)))
}

fn append(
    handle: &IndexHandle,
    entries: &[IndexEntry],
    embedding_model: &str,
    dimensions: usize,
) -> AppResult<IndexHandle> {
    let mut conn = connect(&handle.db_path())?;
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(storage_err("Failed to lock index for writing"))?;

    let metadata = read_metadata(&tx)?;
    if metadata.embedding_model != embedding_model || metadata.dimensions != dimensions {
        return Err(AppError::Other(format!(
            "Embedding mismatch: index uses '{}' ({} dimensions), batch uses '{}' ({} dimensions)",
            metadata.embedding_model, metadata.dimensions, embedding_model, dimensions
        )));
    }

    insert_batch(&tx, entries)?;
    tx.commit().map_err(storage_err("Failed to commit batch"))?;

    tracing::info!(
        "Appended {} entries to index at {}",
        entries.len(),
        handle.location.display()
    );

    Ok(IndexHandle {
        location: handle.location.clone(),
        metadata,
    })
}

/// Top-`k` entries by cosine similarity with `query_embedding`.
///
/// Sorted by descending score; equal scores keep insertion order.
pub fn similarity_search(
    handle: &IndexHandle,
    query_embedding: &[f32],
    k: usize,
) -> AppResult<Vec<ScoredChunk>> {
    if k == 0 {
        return Ok(Vec::new());
    }

    if query_embedding.len() != handle.metadata.dimensions {
        return Err(AppError::Retrieval(format!(
            "Query embedding has {} dimensions, index expects {}",
            query_embedding.len(),
            handle.metadata.dimensions
        )));
    }

    search(handle, query_embedding, k).map_err(|e| match e {
        AppError::Retrieval(_) => e,
        other => AppError::Retrieval(other.to_string()),
    })
}

fn search(handle: &IndexHandle, query_embedding: &[f32], k: usize) -> AppResult<Vec<ScoredChunk>> {
    let conn = connect(&handle.db_path())?;

    let mut stmt = conn
        .prepare("SELECT id, embedding FROM entries ORDER BY id")
        .map_err(storage_err("Failed to prepare query"))?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?)))
        .map_err(storage_err("Failed to query entries"))?;

    let mut scores: Vec<(i64, f32)> = Vec::new();
    for row in rows {
        let (id, bytes) = row.map_err(storage_err("Failed to read entry"))?;
        let embedding = bytes_to_embedding(&bytes)?;
        scores.push((id, cosine_similarity(query_embedding, &embedding)));
    }

    scores.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    scores.truncate(k);

    let mut fetch = conn
        .prepare(
            "SELECT source, page, position, start_unit, end_unit, text, hash
             FROM entries WHERE id = ?1",
        )
        .map_err(storage_err("Failed to prepare query"))?;

    let mut results = Vec::with_capacity(scores.len());
    for (id, score) in scores {
        let chunk = fetch
            .query_row([id], row_to_chunk)
            .map_err(storage_err("Failed to load entry"))?;
        results.push(ScoredChunk { chunk, score });
    }

    tracing::debug!(
        "Retrieved {} chunks (requested top-{})",
        results.len(),
        k
    );

    Ok(results)
}

/// All stored chunks in insertion order.
pub fn list_chunks(handle: &IndexHandle) -> AppResult<Vec<Chunk>> {
    let conn = connect(&handle.db_path())?;
    let mut stmt = conn
        .prepare(
            "SELECT source, page, position, start_unit, end_unit, text, hash
             FROM entries ORDER BY id",
        )
        .map_err(storage_err("Failed to prepare query"))?;

    let chunks = stmt
        .query_map([], row_to_chunk)
        .map_err(storage_err("Failed to query entries"))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(storage_err("Failed to read entry"))?;

    Ok(chunks)
}

/// Statistics for the index.
pub fn stats(handle: &IndexHandle) -> AppResult<IndexStats> {
    let conn = connect(&handle.db_path())?;

    let chunks_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))
        .map_err(storage_err("Failed to count entries"))?;

    let documents_count: i64 = conn
        .query_row("SELECT COUNT(DISTINCT source) FROM entries", [], |row| {
            row.get(0)
        })
        .map_err(storage_err("Failed to count documents"))?;

    let last_ingest: Option<String> = conn
        .query_row("SELECT MAX(ingested_at) FROM ingests", [], |row| row.get(0))
        .map_err(storage_err("Failed to read ingest history"))?;

    let last_ingest_at = last_ingest.as_deref().map(parse_timestamp).transpose()?;

    Ok(IndexStats {
        location: handle.location.clone(),
        chunks_count: chunks_count as u64,
        documents_count: documents_count as u64,
        embedding_model: handle.metadata.embedding_model.clone(),
        dimensions: handle.metadata.dimensions,
        size_bytes: directory_size(&handle.location)?,
        created_at: handle.metadata.created_at,
        last_ingest_at,
    })
}

fn connect(db_path: &Path) -> AppResult<Connection> {
    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(storage_err("Failed to open index"))?;
    configure(&conn)?;
    Ok(conn)
}

fn configure(conn: &Connection) -> AppResult<()> {
    conn.busy_timeout(BUSY_TIMEOUT)
        .map_err(storage_err("Failed to set busy timeout"))?;
    conn.pragma_update(None, "synchronous", "FULL")
        .map_err(storage_err("Failed to set synchronous mode"))?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(storage_err("Failed to enable foreign keys"))?;
    Ok(())
}

fn write_metadata(conn: &Connection, metadata: &IndexMetadata) -> AppResult<()> {
    let values = [
        ("schema_version", metadata.schema_version.to_string()),
        ("embedding_model", metadata.embedding_model.clone()),
        ("dimensions", metadata.dimensions.to_string()),
        ("created_at", format_timestamp(&metadata.created_at)),
    ];

    for (key, value) in values {
        conn.execute(
            "INSERT INTO index_meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .map_err(storage_err("Failed to write index metadata"))?;
    }

    Ok(())
}

fn read_metadata(conn: &Connection) -> AppResult<IndexMetadata> {
    let mut stmt = conn
        .prepare("SELECT key, value FROM index_meta")
        .map_err(storage_err("Failed to read index metadata"))?;
    let values: HashMap<String, String> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(storage_err("Failed to read index metadata"))?
        .collect::<Result<_, _>>()
        .map_err(storage_err("Failed to read index metadata"))?;

    let get = |key: &str| {
        values
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| AppError::Other(format!("Index metadata is missing '{}'", key)))
    };

    let schema_version: u32 = get("schema_version")?
        .parse()
        .map_err(|_| AppError::Other("Index metadata has an invalid schema_version".to_string()))?;
    if schema_version != SCHEMA_VERSION {
        return Err(AppError::Other(format!(
            "Unsupported index schema version {} (expected {})",
            schema_version, SCHEMA_VERSION
        )));
    }

    let dimensions: usize = get("dimensions")?
        .parse()
        .map_err(|_| AppError::Other("Index metadata has invalid dimensions".to_string()))?;

    Ok(IndexMetadata {
        schema_version,
        embedding_model: get("embedding_model")?.to_string(),
        dimensions,
        created_at: parse_timestamp(get("created_at")?)?,
    })
}

fn insert_batch(conn: &Connection, entries: &[IndexEntry]) -> AppResult<()> {
    let ingest_id = uuid::Uuid::new_v4().to_string();
    let documents: BTreeSet<&str> = entries.iter().map(|e| e.chunk.source.as_str()).collect();

    conn.execute(
        "INSERT INTO ingests (id, ingested_at, documents, chunks) VALUES (?1, ?2, ?3, ?4)",
        params![
            ingest_id,
            format_timestamp(&Utc::now()),
            documents.len() as i64,
            entries.len() as i64,
        ],
    )
    .map_err(storage_err("Failed to record ingest"))?;

    let mut stmt = conn
        .prepare(
            "INSERT INTO entries
                (ingest_id, source, page, position, start_unit, end_unit, text, hash, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .map_err(storage_err("Failed to prepare insert"))?;

    for entry in entries {
        let chunk = &entry.chunk;
        stmt.execute(params![
            ingest_id,
            chunk.source,
            chunk.page as i64,
            chunk.position as i64,
            chunk.start as i64,
            chunk.end as i64,
            chunk.text,
            chunk.hash,
            embedding_to_bytes(&entry.embedding),
        ])
        .map_err(storage_err("Failed to insert entry"))?;
    }

    tracing::debug!(
        "Inserted {} entries from {} documents (ingest {})",
        entries.len(),
        documents.len(),
        ingest_id
    );

    Ok(())
}

fn row_to_chunk(row: &rusqlite::Row<'_>) -> rusqlite::Result<Chunk> {
    Ok(Chunk {
        source: row.get(0)?,
        page: row.get::<_, i64>(1)? as u32,
        position: row.get::<_, i64>(2)? as u32,
        start: row.get::<_, i64>(3)? as usize,
        end: row.get::<_, i64>(4)? as usize,
        text: row.get(5)?,
        hash: row.get(6)?,
    })
}

/// Embedding dimension shared by every entry in the batch.
fn batch_dimensions(entries: &[IndexEntry]) -> AppResult<usize> {
    let first = entries
        .first()
        .ok_or_else(|| AppError::Other("Nothing to index".to_string()))?;
    let dimensions = first.embedding.len();

    if dimensions == 0 {
        return Err(AppError::Other("Embeddings are empty".to_string()));
    }
    if let Some(bad) = entries.iter().find(|e| e.embedding.len() != dimensions) {
        return Err(AppError::ingestion(
            bad.chunk.source.clone(),
            format!(
                "embedding has {} dimensions, expected {}",
                bad.embedding.len(),
                dimensions
            ),
        ));
    }

    Ok(dimensions)
}

/// Refuse to build over something that is not an index.
fn ensure_location_free(location: &Path) -> AppResult<()> {
    if !location.exists() {
        return Ok(());
    }

    if location.is_dir() && fs::read_dir(location)?.next().is_none() {
        // An empty directory is replaced by the staged index
        fs::remove_dir(location)?;
        return Ok(());
    }

    Err(AppError::Other(format!(
        "{} exists but does not contain a valid index",
        location.display()
    )))
}

fn directory_size(location: &Path) -> AppResult<u64> {
    let mut total = 0;
    for entry in fs::read_dir(location)? {
        let metadata = entry?.metadata()?;
        if metadata.is_file() {
            total += metadata.len();
        }
    }
    Ok(total)
}

/// Document names of a batch, for error messages.
fn batch_label(entries: &[IndexEntry]) -> String {
    let names: BTreeSet<&str> = entries.iter().map(|e| e.chunk.source.as_str()).collect();
    if names.is_empty() {
        "<empty batch>".to_string()
    } else {
        names.into_iter().collect::<Vec<_>>().join(", ")
    }
}

fn as_ingestion(batch: &str, err: AppError) -> AppError {
    match err {
        e @ AppError::Ingestion { .. } => e,
        other => AppError::ingestion(batch, other),
    }
}

fn storage_err(context: &'static str) -> impl Fn(rusqlite::Error) -> AppError {
    move |e| AppError::Other(format!("{}: {}", context, e))
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Other(format!("Invalid timestamp '{}': {}", value, e)))
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Other(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Calculate cosine similarity between two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(source: &str, position: u32, text: &str, embedding: Vec<f32>) -> IndexEntry {
        IndexEntry {
            chunk: Chunk {
                text: text.to_string(),
                source: source.to_string(),
                page: 1,
                position,
                start: 0,
                end: text.chars().count(),
                hash: format!("hash-{}-{}", source, position),
            },
            embedding,
        }
    }

    fn staging_leftovers(parent: &Path) -> Vec<String> {
        fs::read_dir(parent)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.contains(".staging-"))
            .collect()
    }

    #[test]
    fn test_open_absent() {
        let temp = TempDir::new().unwrap();
        assert!(open(&temp.path().join("chroma_db")).is_none());
        // An empty directory is not an index either
        assert!(open(temp.path()).is_none());
    }

    #[test]
    fn test_open_unreadable_index_is_absent() {
        let temp = TempDir::new().unwrap();
        let location = temp.path().join("chroma_db");
        fs::create_dir_all(&location).unwrap();
        fs::write(location.join(INDEX_FILE), b"definitely not sqlite").unwrap();

        assert!(open(&location).is_none());
    }

    #[test]
    fn test_create_then_open() {
        let temp = TempDir::new().unwrap();
        let location = temp.path().join("chroma_db");

        let handle = create_from(
            &[entry("a.txt", 0, "alpha", vec![1.0, 0.0, 0.0])],
            &location,
            "test-model",
        )
        .unwrap();

        assert_eq!(handle.metadata().embedding_model, "test-model");
        assert_eq!(handle.metadata().dimensions, 3);
        assert!(staging_leftovers(temp.path()).is_empty());

        let reopened = open(&location).unwrap();
        assert_eq!(reopened, handle);
        assert_eq!(stats(&reopened).unwrap().chunks_count, 1);
    }

    #[test]
    fn test_append_keeps_existing_entries() {
        let temp = TempDir::new().unwrap();
        let location = temp.path().join("chroma_db");

        create_from(
            &[
                entry("a.txt", 0, "alpha", vec![1.0, 0.0]),
                entry("a.txt", 1, "beta", vec![0.0, 1.0]),
            ],
            &location,
            "m",
        )
        .unwrap();
        let before = list_chunks(&open(&location).unwrap()).unwrap();

        let handle = create_from(&[entry("b.txt", 0, "gamma", vec![1.0, 1.0])], &location, "m")
            .unwrap();
        let after = list_chunks(&handle).unwrap();

        assert_eq!(after.len(), 3);
        assert_eq!(&after[..2], &before[..]);

        let stats = stats(&handle).unwrap();
        assert_eq!(stats.documents_count, 2);
        assert!(stats.last_ingest_at.is_some());
        assert!(stats.size_bytes > 0);
    }

    #[test]
    fn test_model_mismatch_is_rejected() {
        let temp = TempDir::new().unwrap();
        let location = temp.path().join("chroma_db");
        create_from(&[entry("a.txt", 0, "alpha", vec![1.0, 0.0])], &location, "m1").unwrap();

        let err = create_from(&[entry("b.txt", 0, "beta", vec![1.0, 0.0])], &location, "m2")
            .unwrap_err();
        match err {
            AppError::Ingestion { document, reason } => {
                assert_eq!(document, "b.txt");
                assert!(reason.contains("mismatch"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = create_from(
            &[entry("c.txt", 0, "gamma", vec![1.0, 0.0, 0.0])],
            &location,
            "m1",
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Ingestion { .. }));

        assert_eq!(stats(&open(&location).unwrap()).unwrap().chunks_count, 1);
    }

    #[test]
    fn test_refuses_to_overwrite_foreign_directory() {
        let temp = TempDir::new().unwrap();
        let location = temp.path().join("chroma_db");
        fs::create_dir_all(&location).unwrap();
        fs::write(location.join("notes.txt"), "keep me").unwrap();

        let result = create_from(&[entry("a.txt", 0, "alpha", vec![1.0])], &location, "m");
        assert!(matches!(result, Err(AppError::Ingestion { .. })));
        assert_eq!(
            fs::read_to_string(location.join("notes.txt")).unwrap(),
            "keep me"
        );
        assert!(staging_leftovers(temp.path()).is_empty());
    }

    #[test]
    fn test_empty_directory_becomes_index() {
        let temp = TempDir::new().unwrap();
        let location = temp.path().join("chroma_db");
        fs::create_dir_all(&location).unwrap();

        create_from(&[entry("a.txt", 0, "alpha", vec![1.0])], &location, "m").unwrap();
        assert!(open(&location).is_some());
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        let temp = TempDir::new().unwrap();
        let location = temp.path().join("chroma_db");

        assert!(matches!(
            create_from(&[], &location, "m"),
            Err(AppError::Ingestion { .. })
        ));
        assert!(!location.exists());
    }

    #[test]
    fn test_similarity_search_orders_and_truncates() {
        let temp = TempDir::new().unwrap();
        let location = temp.path().join("chroma_db");
        let handle = create_from(
            &[
                entry("a.txt", 0, "east", vec![1.0, 0.0]),
                entry("a.txt", 1, "north", vec![0.0, 1.0]),
                entry("a.txt", 2, "north-east", vec![1.0, 1.0]),
            ],
            &location,
            "m",
        )
        .unwrap();

        let results = similarity_search(&handle, &[1.0, 0.0], 2).unwrap();
        let texts: Vec<&str> = results.iter().map(|r| r.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["east", "north-east"]);
        assert!((results[0].score - 1.0).abs() < 1e-6);
        assert!(results[0].score >= results[1].score);

        assert!(similarity_search(&handle, &[1.0, 0.0], 0).unwrap().is_empty());
        assert_eq!(similarity_search(&handle, &[1.0, 0.0], 10).unwrap().len(), 3);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let temp = TempDir::new().unwrap();
        let location = temp.path().join("chroma_db");
        let handle = create_from(
            &[
                entry("a.txt", 0, "first", vec![0.5, 0.5]),
                entry("a.txt", 1, "second", vec![0.5, 0.5]),
                entry("a.txt", 2, "third", vec![0.5, 0.5]),
            ],
            &location,
            "m",
        )
        .unwrap();

        for _ in 0..3 {
            let results = similarity_search(&handle, &[1.0, 1.0], 2).unwrap();
            let texts: Vec<&str> = results.iter().map(|r| r.chunk.text.as_str()).collect();
            assert_eq!(texts, vec!["first", "second"]);
        }
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let temp = TempDir::new().unwrap();
        let location = temp.path().join("chroma_db");
        let handle = create_from(&[entry("a.txt", 0, "x", vec![1.0, 0.0])], &location, "m")
            .unwrap();

        assert!(matches!(
            similarity_search(&handle, &[1.0, 0.0, 0.0], 3),
            Err(AppError::Retrieval(_))
        ));
    }

    #[test]
    fn test_concurrent_creation_keeps_both_batches() {
        let temp = TempDir::new().unwrap();
        let location = temp.path().join("chroma_db");

        let workers: Vec<_> = (0..2)
            .map(|i| {
                let location = location.clone();
                std::thread::spawn(move || {
                    let source = format!("doc-{}.txt", i);
                    let batch: Vec<IndexEntry> = (0..5)
                        .map(|p| entry(&source, p, "text", vec![1.0, p as f32]))
                        .collect();
                    create_from(&batch, &location, "m")
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap().unwrap();
        }

        let handle = open(&location).unwrap();
        let stats = stats(&handle).unwrap();
        assert_eq!(stats.chunks_count, 10);
        assert_eq!(stats.documents_count, 2);
        assert!(staging_leftovers(temp.path()).is_empty());
    }

    #[test]
    fn test_embedding_round_trip_and_cosine() {
        let embedding = vec![0.25, -1.5, 3.0];
        assert_eq!(
            bytes_to_embedding(&embedding_to_bytes(&embedding)).unwrap(),
            embedding
        );
        assert!(bytes_to_embedding(&[0, 1, 2]).is_err());

        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 0.001);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
