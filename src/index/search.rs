use super::{IndexError, VectorIndex, serialize_vector};
use rusqlite::params;
use serde::Serialize;

/// One chunk returned by a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub page: u32,
    /// Cosine similarity to the query, `1.0 - cosine distance`.
    pub similarity: f64,
}

impl AsRef<str> for RetrievedChunk {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

fn map_search_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RetrievedChunk> {
    let distance: f64 = row.get(2)?;
    Ok(RetrievedChunk {
        text: row.get(0)?,
        page: row.get(1)?,
        similarity: 1.0 - distance,
    })
}

impl VectorIndex {
    /// Exact nearest-neighbour search by cosine distance over every stored
    /// chunk. Equal distances keep insertion order.
    pub fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, IndexError> {
        if top_k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                c.content,
                c.page,
                vec_distance_cosine(v.embedding, ?) AS distance
            FROM vec_chunks v
            JOIN chunks c ON v.rowid = c.id
            ORDER BY distance ASC, c.id ASC
            LIMIT ?
            "#,
        )?;
        let rows = stmt.query_map(
            params![serialize_vector(query_vector), top_k as i64],
            map_search_row,
        )?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }

        Ok(results)
    }
}
