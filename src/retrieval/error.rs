use std::path::PathBuf;
use thiserror::Error;

use crate::embeddings::EmbeddingError;

pub type Result<T, E = RetrievalError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Empty input: {0}")]
    EmptyInput(&'static str),

    #[error("Dimension mismatch{}: expected {expected}, got {actual}", position_suffix(.position))]
    DimensionMismatch {
        expected: usize,
        actual: usize,
        position: Option<usize>,
    },

    #[error("Non-finite vector component{}", position_suffix(.position))]
    NonFinite { position: Option<usize> },

    #[error("Invalid k: must be at least 1")]
    InvalidK,

    #[error("Position {position} out of range for table with {len} rows")]
    OutOfRange { position: usize, len: usize },

    #[error("Bundle not found: {}", .path.display())]
    BundleNotFound { path: PathBuf },

    #[error("Corrupt bundle {}: {reason}", .path.display())]
    CorruptBundle { path: PathBuf, reason: String },

    #[error("Index and metadata are misaligned: {vectors} vectors, {rows} metadata rows")]
    Alignment { vectors: usize, rows: usize },

    #[error("Embedding provider error: {0}")]
    EmbeddingProvider(#[from] EmbeddingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[allow(clippy::ref_option, reason = "thiserror passes fields by reference")]
fn position_suffix(position: &Option<usize>) -> String {
    position.map_or_else(String::new, |p| format!(" at position {}", p))
}

impl RetrievalError {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptBundle {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
