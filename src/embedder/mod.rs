/// Embedder trait and shared types for text embedding.
///
/// Chunks are embedded as documents while building the index; queries are
/// embedded one at a time with [`Embedder::embed`]. Providers may use a
/// different task type for the two.
pub mod gemini;
pub mod mock;

use thiserror::Error;

/// Errors that can occur during embedding operations.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Request(String),

    #[error("embedding provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Trait for text embedding implementations.
///
/// All implementations must be `Send + Sync` to allow use from the web
/// layer's blocking pool.
pub trait Embedder: Send + Sync {
    /// Embed a single query string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed multiple document texts into vectors, one per input, in order.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Return the dimensionality of the embedding vectors.
    fn dimensions(&self) -> usize;
}

/// Checks that `vector` has exactly `expected` components.
pub fn check_dimensions(vector: &[f32], expected: usize) -> Result<(), EmbeddingError> {
    if vector.len() == expected {
        Ok(())
    } else {
        Err(EmbeddingError::DimensionMismatch {
            expected,
            actual: vector.len(),
        })
    }
}

/// Checks the dimension count and that the vector has a direction.
///
/// Cosine distance is undefined for zero or non-finite vectors, so they are
/// rejected before they reach the index.
pub fn check_embedding(vector: &[f32], expected: usize) -> Result<(), EmbeddingError> {
    check_dimensions(vector, expected)?;
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(EmbeddingError::InvalidResponse(
            "embedding contains non-finite values".to_string(),
        ));
    }
    if vector.iter().all(|v| *v == 0.0) {
        return Err(EmbeddingError::InvalidResponse(
            "embedding is the zero vector".to_string(),
        ));
    }
    Ok(())
}
