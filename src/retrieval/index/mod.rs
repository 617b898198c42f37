
use std::cmp::Ordering;
use tracing::debug;

use super::distance::DistanceMetric;
use super::error::{Result, RetrievalError};

/// A stored vector's position and its distance from a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

/// Exact nearest-neighbour index over a flat block of vectors.
///
/// Vectors are identified only by their 0-based insertion position, which is
/// the join key with the metadata table. Storage is one contiguous buffer of
/// `len * dimension` floats.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    metric: DistanceMetric,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Create an empty index; `dimension` must be at least 1.
    #[inline]
    pub fn new(dimension: usize, metric: DistanceMetric) -> Result<Self> {
        if dimension == 0 {
            return Err(RetrievalError::EmptyInput("index dimension must be at least 1"));
        }
        Ok(Self {
            dimension,
            metric,
            data: Vec::new(),
        })
    }

    /// Rebuild an index from its raw row-major block.
    pub(crate) fn from_raw(dimension: usize, metric: DistanceMetric, data: Vec<f32>) -> Self {
        debug_assert!(dimension > 0 && data.len() % dimension == 0);
        Self {
            dimension,
            metric,
            data,
        }
    }

    /// Append vectors, extending positions in input order.
    ///
    /// Every vector is checked before anything is appended, so a rejected
    /// batch leaves the index untouched. Components must be finite.
    #[inline]
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        for (position, vector) in vectors.iter().enumerate() {
            if vector.len() != self.dimension {
                return Err(RetrievalError::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                    position: Some(position),
                });
            }
            if !all_finite(vector) {
                return Err(RetrievalError::NonFinite {
                    position: Some(position),
                });
            }
        }

        self.data.reserve(vectors.len() * self.dimension);
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    /// Return the `k` stored vectors closest to `query`, ascending by distance.
    ///
    /// Equal distances are ordered by ascending position. When `k` exceeds the
    /// number of stored vectors every vector is returned; this is not an error.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if k == 0 {
            return Err(RetrievalError::InvalidK);
        }
        if query.len() != self.dimension {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
                position: None,
            });
        }
        if !all_finite(query) {
            return Err(RetrievalError::NonFinite { position: None });
        }

        let mut neighbors: Vec<Neighbor> = self
            .rows()
            .enumerate()
            .map(|(position, vector)| Neighbor {
                position,
                distance: self.metric.distance(query, vector),
            })
            .collect();

        if k < neighbors.len() {
            neighbors.select_nth_unstable_by(k - 1, rank);
            neighbors.truncate(k);
        }
        neighbors.sort_unstable_by(rank);

        debug!(
            "Scanned {} vectors, returning {} neighbors",
            self.len(),
            neighbors.len()
        );
        Ok(neighbors)
    }

    /// Vector stored at `position`, if any.
    #[inline]
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        let end = start.checked_add(self.dimension)?;
        self.data.get(start..end)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Raw row-major vector block.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dimension)
    }
}

fn all_finite(vector: &[f32]) -> bool {
    vector.iter().all(|x| x.is_finite())
}

/// Total order on neighbours: distance first, then position.
///
/// Finite inputs can still overflow to a NaN distance (cosine over huge
/// norms), so NaN sorts after every real distance, infinity included.
fn rank(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance
        .is_nan()
        .cmp(&b.distance.is_nan())
        .then_with(|| a.distance.total_cmp(&b.distance))
        .then_with(|| a.position.cmp(&b.position))
}
