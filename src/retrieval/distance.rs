use serde::{Deserialize, Serialize};
use std::fmt;

/// Metric used to rank stored vectors against a query. Lower is closer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Sum of squared component differences (flat L2 ranking).
    #[default]
    SquaredEuclidean,
    /// `1 - cos(a, b)`. A zero-norm operand is treated as orthogonal.
    Cosine,
}

impl DistanceMetric {
    /// Callers must pass slices of equal length.
    #[inline]
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());
        match self {
            Self::SquaredEuclidean => squared_euclidean(a, b),
            Self::Cosine => cosine_distance(a, b),
        }
    }

    pub(crate) const fn code(self) -> u8 {
        match self {
            Self::SquaredEuclidean => 0,
            Self::Cosine => 1,
        }
    }

    pub(crate) const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::SquaredEuclidean),
            1 => Some(Self::Cosine),
            _ => None,
        }
    }
}

impl fmt::Display for DistanceMetric {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SquaredEuclidean => write!(f, "squared_euclidean"),
            Self::Cosine => write!(f, "cosine"),
        }
    }
}

fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot = x.mul_add(*y, dot);
        norm_a = x.mul_add(*x, norm_a);
        norm_b = y.mul_add(*y, norm_b);
    }

    let denom = (norm_a * norm_b).sqrt();
    if denom == 0.0 {
        return 1.0;
    }
    1.0 - dot / denom
}
