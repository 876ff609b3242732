//! Exact inner-product search over unit-normalized vectors.
//!
//! For L2-normalized vectors the dot product is the cosine similarity, which is
//! the only metric the search paths use.

use crate::error::{ImageError, ImageResult};

/// Dot product of two equal-length vectors.
#[inline]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vector length mismatch");

    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// L2-normalize in place. A zero vector is left unchanged.
pub fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// L2-normalized copy of `v`.
pub fn normalized(v: &[f32]) -> Vec<f32> {
    let mut out = v.to_vec();
    normalize(&mut out);
    out
}

/// Flat row-major matrix of normalized vectors.
///
/// Row `i` keeps the position its vector had in the input to [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct SimilarityIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl SimilarityIndex {
    pub fn empty(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Normalize and load `vectors`; every one must have length `dimension`.
    pub fn build<I>(dimension: usize, vectors: I) -> ImageResult<Self>
    where
        I: IntoIterator<Item = Vec<f32>>,
    {
        let vectors = vectors.into_iter();
        let mut data = Vec::with_capacity(vectors.size_hint().0 * dimension);

        for (row, mut vector) in vectors.enumerate() {
            if vector.len() != dimension {
                return Err(ImageError::Internal(format!(
                    "row {} has {} dimensions, index expects {}",
                    row,
                    vector.len(),
                    dimension
                )));
            }
            normalize(&mut vector);
            data.extend_from_slice(&vector);
        }

        Ok(Self { dimension, data })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn row(&self, row: usize) -> Option<&[f32]> {
        let start = row.checked_mul(self.dimension)?;
        self.data
            .get(start..start + self.dimension)
            .filter(|_| self.dimension > 0)
    }

    /// Score every row against the normalized `query`, returning `(score, row)`
    /// pairs for the `top_k` best in descending order.
    ///
    /// Equal scores keep insertion order. An empty index or `top_k == 0` yields
    /// an empty list; `top_k` beyond the row count yields every row.
    pub fn query(&self, query: &[f32], top_k: usize) -> ImageResult<Vec<(f32, usize)>> {
        if self.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(ImageError::Internal(format!(
                "query has {} dimensions, index expects {}",
                query.len(),
                self.dimension
            )));
        }

        let query = normalized(query);
        let mut scored: Vec<(f32, usize)> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(row, v)| (dot_product(v, &query), row))
            .collect();

        // sort_by is stable, so ties stay in row order
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(top_k);
        Ok(scored)
    }
}
