//! In-memory vector index using SQLite and sqlite-vec
use rusqlite::{Connection, params};
use sqlite_vec::sqlite3_vec_init;
use std::sync::Once;
use thiserror::Error;
use tracing::{debug, info};

use crate::splitter::Chunk;

pub mod search;

pub use search::RetrievedChunk;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{chunks} chunks but {embeddings} embeddings")]
    LengthMismatch { chunks: usize, embeddings: usize },
}

fn schema_sql(dimensions: usize) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS chunks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page INTEGER NOT NULL,
    content TEXT NOT NULL
);

CREATE VIRTUAL TABLE IF NOT EXISTS vec_chunks USING vec0(
    embedding FLOAT[{dimensions}]
);
"#
    )
}

static INIT_VEC: Once = Once::new();

/// Initialize the sqlite-vec extension. Safe to call multiple times.
fn init_sqlite_vec() {
    INIT_VEC.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite3_vec_init as *const (),
        )));
    });
}

/// Chunks and their embeddings, held in a private in-memory SQLite database.
///
/// Rows are only ever appended; chunk ids follow insertion order.
pub struct VectorIndex {
    pub(crate) conn: Connection,
    dimensions: usize,
    len: usize,
}

impl VectorIndex {
    /// Open an empty in-memory index for vectors of `dimensions` components.
    pub fn open_in_memory(dimensions: usize) -> Result<Self, IndexError> {
        init_sqlite_vec();
        let conn = Connection::open_in_memory()?;

        let vec_version: String = conn.query_row("SELECT vec_version()", [], |row| row.get(0))?;
        debug!("sqlite-vec version: {}", vec_version);

        conn.execute_batch(&schema_sql(dimensions))?;
        info!("Vector index initialized ({dimensions} dimensions)");

        Ok(Self {
            conn,
            dimensions,
            len: 0,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of chunks stored.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends chunks with their embeddings in a single transaction.
    pub fn insert_batch(
        &mut self,
        chunks: &[Chunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), IndexError> {
        if chunks.len() != embeddings.len() {
            return Err(IndexError::LengthMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }

        let tx = self.conn.transaction()?;
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            tx.execute(
                "INSERT INTO chunks (page, content) VALUES (?, ?)",
                params![chunk.page, chunk.text],
            )?;
            let chunk_id = tx.last_insert_rowid();

            tx.execute(
                "INSERT INTO vec_chunks (rowid, embedding) VALUES (?, ?)",
                params![chunk_id, serialize_vector(embedding)],
            )?;
        }
        tx.commit()?;

        self.len += chunks.len();
        Ok(())
    }
}

/// Helper to serialize a float32 vector into bytes for vec0 virtual table
pub fn serialize_vector(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}
