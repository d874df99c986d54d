//! Batched search output.

use serde::{Deserialize, Serialize};

/// Row-major `[num_queries x k]` distances and corpus indices.
///
/// Row `i` holds the neighbors of query `i`, best-first. `k` is the requested
/// `top_k` clamped to the corpus size, so every row has the same width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    distances: Vec<f32>,
    indices: Vec<u32>,
    num_queries: usize,
    k: usize,
}

impl SearchResults {
    /// Assemble from per-query `(distance, id)` lists, each exactly `k` long.
    pub(crate) fn from_rows(rows: Vec<Vec<(f32, u32)>>, k: usize) -> Self {
        let num_queries = rows.len();
        let mut distances = Vec::with_capacity(num_queries * k);
        let mut indices = Vec::with_capacity(num_queries * k);
        for row in rows {
            debug_assert_eq!(row.len(), k);
            for (d, id) in row {
                distances.push(d);
                indices.push(id);
            }
        }
        Self {
            distances,
            indices,
            num_queries,
            k,
        }
    }

    pub(crate) fn empty(k: usize) -> Self {
        Self {
            distances: Vec::new(),
            indices: Vec::new(),
            num_queries: 0,
            k,
        }
    }

    pub fn num_queries(&self) -> usize {
        self.num_queries
    }

    /// Neighbors per query.
    pub fn k(&self) -> usize {
        self.k
    }

    /// `(num_queries, k)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.num_queries, self.k)
    }

    pub fn row_distances(&self, i: usize) -> &[f32] {
        &self.distances[i * self.k..(i + 1) * self.k]
    }

    pub fn row_indices(&self, i: usize) -> &[u32] {
        &self.indices[i * self.k..(i + 1) * self.k]
    }

    pub fn distances(&self) -> &[f32] {
        &self.distances
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Nested `(distances, indices)`, one inner `Vec` per query.
    pub fn to_nested(&self) -> (Vec<Vec<f32>>, Vec<Vec<u32>>) {
        let distances = (0..self.num_queries)
            .map(|i| self.row_distances(i).to_vec())
            .collect();
        let indices = (0..self.num_queries)
            .map(|i| self.row_indices(i).to_vec())
            .collect();
        (distances, indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_are_contiguous() {
        let r = SearchResults::from_rows(
            vec![vec![(0.1, 3), (0.2, 1)], vec![(0.5, 0), (0.9, 2)]],
            2,
        );
        assert_eq!(r.shape(), (2, 2));
        assert_eq!(r.row_indices(1), &[0, 2]);
        assert_eq!(r.row_distances(0), &[0.1, 0.2]);
        let (d, i) = r.to_nested();
        assert_eq!(i, vec![vec![3, 1], vec![0, 2]]);
        assert_eq!(d[1], vec![0.5, 0.9]);
    }
}
