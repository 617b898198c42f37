
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

use super::bundle;
use super::error::{Result, RetrievalError};
use super::index::FlatIndex;
use super::metadata::MetadataTable;
use crate::embeddings::{EmbeddingError, TextEmbedder};

/// One ranked match joined with its metadata row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub distance: f32,
    pub doc: String,
    pub table: String,
    pub column: String,
}

/// What to search with: raw text routed through an embedder, or a vector the
/// caller already has.
#[derive(Debug, Clone, Copy)]
pub enum Query<'a> {
    Text(&'a str),
    Vector(&'a [f32]),
}

/// An index and the metadata table aligned with it, immutable once built.
#[derive(Debug, Clone)]
pub struct SearchContext {
    index: FlatIndex,
    metadata: MetadataTable,
}

impl SearchContext {
    #[inline]
    pub fn new(index: FlatIndex, metadata: MetadataTable) -> Result<Self> {
        if index.len() != metadata.len() {
            return Err(RetrievalError::Alignment {
                vectors: index.len(),
                rows: metadata.len(),
            });
        }
        Ok(Self { index, metadata })
    }

    /// Load a context from a bundle written by [`bundle::save`].
    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        let (index, metadata) = bundle::load(path)?;
        Self::new(index, metadata)
    }

    #[inline]
    pub fn save(&self, path: &Path) -> Result<()> {
        bundle::save(&self.index, &self.metadata, path)
    }

    #[inline]
    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    #[inline]
    pub fn metadata(&self) -> &MetadataTable {
        &self.metadata
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Top-`k` matches for `query`, ascending by distance.
    ///
    /// Text queries are embedded with exactly one call to `embedder` carrying
    /// a single-element batch. Provider failures are returned unchanged as
    /// [`RetrievalError::EmbeddingProvider`].
    #[inline]
    pub fn search(
        &self,
        query: Query<'_>,
        k: usize,
        embedder: &dyn TextEmbedder,
    ) -> Result<Vec<SearchResult>> {
        match query {
            Query::Vector(vector) => self.search_vector(vector, k),
            Query::Text(text) => {
                if k == 0 {
                    return Err(RetrievalError::InvalidK);
                }
                let vector = embed_one(embedder, text)?;
                self.search_vector(&vector, k)
            }
        }
    }

    /// Top-`k` matches for a vector that is already embedded.
    #[inline]
    pub fn search_vector(&self, vector: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let neighbors = self.index.search(vector, k)?;

        let results = neighbors
            .into_iter()
            .map(|neighbor| {
                let row = self.metadata.row(neighbor.position).map_err(|_| {
                    RetrievalError::Alignment {
                        vectors: self.index.len(),
                        rows: self.metadata.len(),
                    }
                })?;
                Ok(SearchResult {
                    distance: neighbor.distance,
                    doc: row.doc.clone(),
                    table: row.table_name.clone(),
                    column: row.column_name.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("Search returned {} results (k={})", results.len(), k);
        Ok(results)
    }
}

fn embed_one(embedder: &dyn TextEmbedder, text: &str) -> Result<Vec<f32>> {
    let mut vectors = embedder.embed(&[text.to_string()])?;
    if vectors.len() != 1 {
        return Err(EmbeddingError::CountMismatch {
            expected: 1,
            actual: vectors.len(),
        }
        .into());
    }
    Ok(vectors.swap_remove(0))
}

/// Shared handle to the live [`SearchContext`].
///
/// Searches take a snapshot (a cloned `Arc`) and run without holding the lock.
/// A rebuild constructs a fresh context and swaps it in with
/// [`SharedContext::replace`]; searches already running keep the old one.
#[derive(Debug)]
pub struct SharedContext {
    current: RwLock<Arc<SearchContext>>,
}

impl SharedContext {
    #[inline]
    pub fn new(context: SearchContext) -> Self {
        Self {
            current: RwLock::new(Arc::new(context)),
        }
    }

    #[inline]
    pub fn snapshot(&self) -> Arc<SearchContext> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Install `context` for new searches and return the one it replaced.
    #[inline]
    pub fn replace(&self, context: SearchContext) -> Arc<SearchContext> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(context))
    }

    #[inline]
    pub fn search(
        &self,
        query: Query<'_>,
        k: usize,
        embedder: &dyn TextEmbedder,
    ) -> Result<Vec<SearchResult>> {
        self.snapshot().search(query, k, embedder)
    }
}
