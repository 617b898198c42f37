// Embeddings module
// Text-to-vector providers consumed by the index builder and the search service

pub mod openai;

use thiserror::Error;

use crate::http::HttpError;

pub use openai::EmbeddingClient;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("API key environment variable {0} is not set")]
    MissingApiKey(String),

    #[error("Embedding request failed: {0}")]
    Request(#[from] HttpError),

    #[error("Failed to decode embedding response: {0}")]
    Decode(String),

    #[error("Embedding count mismatch: requested {expected}, received {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Embedding dimension mismatch: expected {expected}, received {actual}")]
    Dimension { expected: usize, actual: usize },
}

/// Turns a batch of texts into vectors of a fixed dimensionality.
///
/// Implementations return exactly one vector per input text, in input order.
pub trait TextEmbedder: Send + Sync {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

impl<T: TextEmbedder + ?Sized> TextEmbedder for &T {
    #[inline]
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        (**self).embed(texts)
    }
}

impl<T: TextEmbedder + ?Sized> TextEmbedder for Box<T> {
    #[inline]
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        (**self).embed(texts)
    }
}

impl<T: TextEmbedder + ?Sized> TextEmbedder for std::sync::Arc<T> {
    #[inline]
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        (**self).embed(texts)
    }
}
