use tracing::info;

use super::distance::DistanceMetric;
use super::error::{Result, RetrievalError};
use super::index::FlatIndex;

/// Builds a [`FlatIndex`] from one batch of embeddings.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexBuilder {
    metric: DistanceMetric,
}

impl IndexBuilder {
    #[inline]
    pub fn new(metric: DistanceMetric) -> Self {
        Self { metric }
    }

    /// Index every vector in input order; position `i` holds `embeddings[i]`.
    ///
    /// The dimensionality is taken from the first vector and every other vector
    /// must match it.
    #[inline]
    pub fn build(&self, embeddings: &[Vec<f32>]) -> Result<FlatIndex> {
        let first = embeddings
            .first()
            .ok_or(RetrievalError::EmptyInput("embedding batch has no vectors"))?;
        if first.is_empty() {
            return Err(RetrievalError::EmptyInput("embedding vectors have no components"));
        }

        let mut index = FlatIndex::new(first.len(), self.metric)?;
        index.add(embeddings)?;

        info!(
            "Indexed {} vectors ({} dimensions, {})",
            index.len(),
            index.dimension(),
            self.metric
        );
        Ok(index)
    }
}
