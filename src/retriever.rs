//! Query-time top-k retrieval over the index built at startup.
use thiserror::Error;
use tracing::debug;

use crate::embedder::{Embedder, EmbeddingError, check_embedding};
use crate::index::{IndexError, RetrievedChunk, VectorIndex};

/// Default number of chunks handed to the model.
pub const DEFAULT_TOP_K: usize = 4;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Owns the index and the embedder used to build it.
pub struct Retriever {
    index: VectorIndex,
    embedder: Box<dyn Embedder>,
    top_k: usize,
}

impl Retriever {
    pub fn new(index: VectorIndex, embedder: Box<dyn Embedder>, top_k: usize) -> Self {
        Self {
            index,
            embedder,
            top_k,
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Returns up to `top_k` chunks closest to `query`, nearest first.
    ///
    /// An empty index yields an empty context without calling the embedder.
    pub fn retrieve(&self, query: &str) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        if self.index.is_empty() {
            debug!("Index is empty, returning no context");
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query)?;
        check_embedding(&query_vector, self.index.dimensions())?;

        let results = self.index.search(&query_vector, self.top_k)?;
        debug!("Retrieved {} of {} chunks", results.len(), self.index.len());
        Ok(results)
    }
}
