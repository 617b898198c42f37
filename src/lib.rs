use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] retrieval::RetrievalError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] embeddings::EmbeddingError),

    #[error("Answer generation error: {0}")]
    Llm(#[from] llm::LlmError),

    #[error("Conversation memory error: {0}")]
    Memory(#[from] memory::MemoryError),

    #[error("Indexing error: {0}")]
    Indexer(#[from] indexer::IndexerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod assistant;
pub mod commands;
pub mod config;
pub mod embeddings;
mod http;
pub mod indexer;
pub mod llm;
pub mod memory;
pub mod retrieval;

pub use http::HttpError;
