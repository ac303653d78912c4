//! Persistent chunk store with brute-force vector search
//!
//! Chunks and their embeddings live in one SQLite database inside the index
//! directory, so the vector index and the chunk metadata cannot drift apart:
//! a search hit is always backed by a chunk record. Embeddings are held in
//! memory in insertion order and scored by dot product (vectors are unit
//! length, so dot product is cosine similarity).

use parking_lot::{Mutex, RwLock};
use rusqlite::{params, Connection};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::Chunk;

const DB_FILENAME: &str = "chunks.db";

/// Chunk store and vector index over one persisted collection
pub struct ChunkStore {
    conn: Mutex<Connection>,
    /// All entries in insertion order; similarity ties resolve to the earlier entry
    entries: RwLock<Vec<Entry>>,
    dimensions: usize,
}

impl std::fmt::Debug for ChunkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStore")
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

struct Entry {
    chunk: Chunk,
    embedding: Vec<f32>,
}

impl ChunkStore {
    /// Create the store (or open it if it already exists) for ingestion
    ///
    /// An existing store must have been created with the same dimensionality.
    pub fn create<P: AsRef<Path>>(dir: P, dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::store("embedding dimensionality must be positive"));
        }
        std::fs::create_dir_all(dir.as_ref())?;
        let conn = Connection::open(db_path(dir.as_ref()))?;
        Self::migrate(&conn)?;

        match Self::stored_dimensions(&conn)? {
            Some(stored) if stored != dimensions => {
                return Err(Error::store(format!(
                    "store was created with {} dimensions, provider produces {}",
                    stored, dimensions
                )));
            }
            Some(_) => {}
            None => {
                conn.execute(
                    "INSERT INTO meta (key, value) VALUES ('dimensions', ?1)",
                    params![dimensions as i64],
                )?;
            }
        }

        Self::load(conn, dimensions)
    }

    /// Open an existing store for querying
    ///
    /// Fails when the index directory or database is missing; serving without
    /// an index is a startup error, not a degraded mode.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let path = db_path(dir.as_ref());
        if !path.exists() {
            return Err(Error::store(format!(
                "index not found at {}",
                dir.as_ref().display()
            )));
        }
        let conn = Connection::open(&path)?;
        Self::migrate(&conn)?;
        let dimensions = Self::stored_dimensions(&conn)?
            .ok_or_else(|| Error::store("index is missing its dimension record"))?;
        Self::load(conn, dimensions)
    }

    fn migrate(conn: &Connection) -> Result<()> {
        // WAL allows concurrent read-open by other processes while the
        // ingestion job appends.
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chunks (
                rowid INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL,
                source TEXT NOT NULL,
                seq INTEGER NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source);
            "#,
        )?;
        Ok(())
    }

    fn stored_dimensions(conn: &Connection) -> Result<Option<usize>> {
        let mut stmt = conn.prepare("SELECT value FROM meta WHERE key = 'dimensions'")?;
        let mut rows = stmt.query([])?;
        match rows.next()? {
            Some(row) => {
                let value: i64 = row.get(0)?;
                Ok(Some(value as usize))
            }
            None => Ok(None),
        }
    }

    fn load(conn: Connection, dimensions: usize) -> Result<Self> {
        let mut entries = Vec::new();
        {
            let mut stmt = conn.prepare(
                "SELECT id, source, seq, content, embedding FROM chunks ORDER BY rowid",
            )?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let id: String = row.get(0)?;
                let source: String = row.get(1)?;
                let seq: i64 = row.get(2)?;
                let content: String = row.get(3)?;
                let blob: Vec<u8> = row.get(4)?;

                let embedding = decode_embedding(&blob, dimensions).ok_or_else(|| {
                    Error::store(format!(
                        "corrupt embedding for chunk {} (source {})",
                        id, source
                    ))
                })?;

                entries.push(Entry {
                    chunk: Chunk {
                        id,
                        text: content,
                        source,
                        sequence_no: seq as u32,
                    },
                    embedding,
                });
            }
        }

        tracing::debug!(chunks = entries.len(), dimensions, "chunk store loaded");
        Ok(Self {
            conn: Mutex::new(conn),
            entries: RwLock::new(entries),
            dimensions,
        })
    }

    /// Embedding dimensionality of this store
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of stored chunks
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check whether the store holds no chunks
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Durably append chunks with their embeddings
    ///
    /// Does not deduplicate by content; source-level filtering is the
    /// ingestion pipeline's job. A count or dimensionality mismatch fails the
    /// whole batch before anything is written.
    pub fn upsert(&self, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<()> {
        if chunks.len() != vectors.len() {
            return Err(Error::ingestion(format!(
                "chunk/vector count mismatch: {} chunks, {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }
        for (chunk, vector) in chunks.iter().zip(vectors) {
            if chunk.text.is_empty() {
                return Err(Error::ingestion(format!(
                    "empty chunk text in source {}",
                    chunk.source
                )));
            }
            if vector.len() != self.dimensions {
                return Err(Error::ingestion(format!(
                    "embedding for chunk {} has {} dimensions, store expects {}",
                    chunk.id,
                    vector.len(),
                    self.dimensions
                )));
            }
        }

        {
            let mut conn = self.conn.lock();
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO chunks (id, source, seq, content, embedding)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for (chunk, vector) in chunks.iter().zip(vectors) {
                    stmt.execute(params![
                        chunk.id,
                        chunk.source,
                        chunk.sequence_no as i64,
                        chunk.text,
                        encode_embedding(vector),
                    ])?;
                }
            }
            tx.commit()?;
        }

        let mut entries = self.entries.write();
        for (chunk, vector) in chunks.iter().zip(vectors) {
            entries.push(Entry {
                chunk: chunk.clone(),
                embedding: vector.clone(),
            });
        }
        Ok(())
    }

    /// Nearest-neighbor search by descending similarity
    ///
    /// Ties break by insertion order. Returns all entries when fewer than `k`
    /// exist.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<(Chunk, f32)>> {
        if k == 0 {
            return Err(Error::store("query k must be at least 1"));
        }
        if vector.len() != self.dimensions {
            return Err(Error::store(format!(
                "query vector has {} dimensions, store expects {}",
                vector.len(),
                self.dimensions
            )));
        }

        let entries = self.entries.read();
        let mut scored: Vec<(usize, f32)> = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, dot(vector, &entry.embedding)))
            .collect();
        // Stable sort preserves insertion order among equal similarities.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| (entries[i].chunk.clone(), score))
            .collect())
    }

    /// Source names of all ingested documents
    pub fn list_sources(&self) -> BTreeSet<String> {
        self.entries
            .read()
            .iter()
            .map(|entry| entry.chunk.source.clone())
            .collect()
    }
}

fn db_path(dir: &Path) -> PathBuf {
    dir.join(DB_FILENAME)
}

fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

fn decode_embedding(blob: &[u8], dimensions: usize) -> Option<Vec<f32>> {
    if blob.len() != dimensions * 4 {
        return None;
    }
    Some(
        blob.chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
    )
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
