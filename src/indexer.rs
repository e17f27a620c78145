//! Builds the in-memory vector index from split chunks.
use thiserror::Error;
use tracing::{debug, info};

use crate::embedder::{Embedder, EmbeddingError, check_embedding};
use crate::index::{IndexError, VectorIndex};
use crate::splitter::Chunk;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

pub struct Indexer<'a, E: Embedder + ?Sized> {
    pub embedder: &'a E,
    pub dimensions: usize,
    pub batch_size: usize,
}

impl<'a, E: Embedder + ?Sized> Indexer<'a, E> {
    pub fn new(embedder: &'a E, dimensions: usize, batch_size: usize) -> Self {
        Self {
            embedder,
            dimensions,
            // A zero batch size would make `chunks()` panic
            batch_size: batch_size.max(1),
        }
    }

    /// Embeds every chunk and stores it, in order, in a fresh index.
    ///
    /// The first embedding failure aborts the build; nothing is retried.
    pub fn build(&self, chunks: &[Chunk]) -> Result<VectorIndex, BuildError> {
        let mut index = VectorIndex::open_in_memory(self.dimensions)?;

        for (n, batch) in chunks.chunks(self.batch_size).enumerate() {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();

            let vectors = self.embedder.embed_batch(&texts)?;
            for vector in &vectors {
                check_embedding(vector, self.dimensions)?;
            }

            index.insert_batch(batch, &vectors)?;
            debug!("Indexed batch {} ({} chunks)", n + 1, batch.len());
        }

        info!("Indexed {} chunks", index.len());
        Ok(index)
    }
}
