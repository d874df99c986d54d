//! Brute-force exact search over f32 vectors.
//!
//! The baseline the quantized index is measured against: every query is
//! compared with every corpus row using the exact f32 kernels.

use ordered_float::OrderedFloat;
use rayon::prelude::*;

use super::distance::DistanceMetric;
use super::results::SearchResults;
use super::{check_corpus_dim, check_query_dim, effective_top_k, topk, VectorIndex};
use crate::batch::FloatBatch;
use crate::error::{LpqError, Result};

/// Exact index over a float corpus.
#[derive(Debug, Clone)]
pub struct FloatIndex {
    metric: DistanceMetric,
    corpus: Option<FloatBatch>,
}

impl FloatIndex {
    pub fn new(metric: DistanceMetric) -> Self {
        Self {
            metric,
            corpus: None,
        }
    }

    /// The stored corpus, if `add` has been called.
    pub fn corpus(&self) -> Option<&FloatBatch> {
        self.corpus.as_ref()
    }
}

impl VectorIndex for FloatIndex {
    type Batch = FloatBatch;

    fn metric(&self) -> DistanceMetric {
        self.metric
    }

    fn len(&self) -> usize {
        self.corpus.as_ref().map_or(0, |c| c.rows())
    }

    fn dim(&self) -> Option<usize> {
        self.corpus.as_ref().map(|c| c.dim())
    }

    /// Store a copy of `vectors`, replacing any previous corpus.
    fn add(&mut self, vectors: &FloatBatch) -> Result<()> {
        if vectors.is_empty() {
            return Err(LpqError::EmptyInput);
        }
        check_corpus_dim(vectors.dim())?;
        vectors.ensure_finite()?;

        if let Some(old) = &self.corpus {
            tracing::debug!(previous = old.rows(), "Replacing float corpus");
        }
        self.corpus = Some(vectors.clone());
        tracing::debug!(
            rows = vectors.rows(),
            dim = vectors.dim(),
            metric = %self.metric,
            "Float corpus indexed"
        );
        Ok(())
    }

    fn search(&self, queries: &FloatBatch, top_k: usize) -> Result<SearchResults> {
        let corpus = self.corpus.as_ref().ok_or(LpqError::NotIndexed)?;
        let k = effective_top_k(top_k, corpus.rows())?;
        if queries.is_empty() {
            return Ok(SearchResults::empty(k));
        }
        check_query_dim(corpus.dim(), queries.dim())?;

        let metric = self.metric;
        let n = corpus.rows();
        let rows: Vec<Vec<(f32, u32)>> = (0..queries.rows())
            .into_par_iter()
            .map(|qi| {
                let query = queries.row(qi);
                topk::select(n, k, |ci| {
                    OrderedFloat(metric.key_f32(query, corpus.row(ci)))
                })
                .into_iter()
                .map(|(key, id)| (metric.key_to_distance(key.0), id))
                .collect()
            })
            .collect();

        tracing::debug!(queries = queries.rows(), k, "Float search completed");
        Ok(SearchResults::from_rows(rows, k))
    }
}
