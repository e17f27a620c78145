/// Mock embedder for tests and offline runs.
///
/// Produces deterministic bag-of-words vectors: each lowercase word is hashed
/// into a bucket, so texts sharing words end up close under cosine distance.
use std::hash::{DefaultHasher, Hash, Hasher};

use super::{Embedder, EmbeddingError};

/// A mock embedder that hashes words into a fixed number of buckets.
pub struct MockEmbedder {
    pub dimensions: usize,
}

impl MockEmbedder {
    /// Create a new `MockEmbedder` with the given dimensionality.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn bucket(&self, word: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        word.hash(&mut hasher);
        (hasher.finish() % self.dimensions as u64) as usize
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self { dimensions: 768 }
    }
}

impl Embedder for MockEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if self.dimensions == 0 {
            return Err(EmbeddingError::InvalidResponse(
                "mock embedder configured with zero dimensions".to_string(),
            ));
        }

        let mut embedding = vec![0.0f32; self.dimensions];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            embedding[self.bucket(&word.to_lowercase())] += 1.0;
        }

        // Texts without words still need a non-zero vector for cosine distance
        if embedding.iter().all(|v| *v == 0.0) {
            embedding[0] = 1.0;
        }

        // L2 normalize
        let norm_sq: f32 = embedding.iter().map(|v| v * v).sum();
        let inv = 1.0 / norm_sq.sqrt();
        for v in &mut embedding {
            *v *= inv;
        }

        Ok(embedding)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
