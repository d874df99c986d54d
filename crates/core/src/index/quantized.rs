//! Brute-force exact search over i8-quantized vectors.
//!
//! Per corpus row the only O(D) work is an integer kernel: `Σ(a - b)²` when
//! queries share the corpus's parameters, `Σ a·b` otherwise. Row sums `Σq` and
//! `Σq²` are computed once per corpus row at `add` time and once per query,
//! and the real-valued distance is reconstructed from these integers in a
//! single floating-point step (see [`crate::quantization::scalar`]).

use ordered_float::OrderedFloat;
use rayon::prelude::*;

use super::distance::DistanceMetric;
use super::results::SearchResults;
use super::{check_corpus_dim, check_query_dim, effective_top_k, topk, VectorIndex};
use crate::error::{LpqError, Result};
use crate::quantization::scalar::{
    dot_product_ref, euclidean_distance_sq_ref, QuantizedRef, RowStats,
};
use crate::quantization::simd::{dot_i8, squared_diff_i8};
use crate::quantization::{QuantizationParams, QuantizedBatch};

#[derive(Debug, Clone)]
struct QuantizedCorpus {
    batch: QuantizedBatch,
    stats: Vec<RowStats>,
}

impl QuantizedCorpus {
    #[inline]
    fn row_ref(&self, i: usize) -> QuantizedRef<'_> {
        QuantizedRef::new(self.batch.row(i), self.batch.params(), self.stats[i])
    }
}

/// How a query is scored against the corpus.
#[derive(Debug, Clone, Copy)]
enum Kernel {
    /// Euclidean with shared parameters: rank by the exact integer
    /// `Σ(a - b)²`, report `sqrt(key) * scale`.
    SharedEuclidean { scale: f64 },
    /// Euclidean with per-side parameters: reconstruct `|a|² + |b|² - 2a·b`.
    MixedEuclidean,
    /// Angular: reconstruct the real dot product, rank by its negation.
    Dot,
}

/// Exact index over an i8-quantized corpus.
#[derive(Debug, Clone)]
pub struct QuantizedIndex {
    metric: DistanceMetric,
    corpus: Option<QuantizedCorpus>,
}

impl QuantizedIndex {
    pub fn new(metric: DistanceMetric) -> Self {
        Self {
            metric,
            corpus: None,
        }
    }

    /// Parameters of the stored corpus, if `add` has been called.
    /// Quantizing queries with these puts them on the corpus's grid.
    pub fn params(&self) -> Option<&QuantizationParams> {
        self.corpus.as_ref().map(|c| c.batch.params())
    }

    pub fn corpus(&self) -> Option<&QuantizedBatch> {
        self.corpus.as_ref().map(|c| &c.batch)
    }

    fn kernel(&self, corpus: &QuantizationParams, queries: &QuantizationParams) -> Kernel {
        match self.metric {
            DistanceMetric::Euclidean if corpus == queries => Kernel::SharedEuclidean {
                scale: corpus.scale as f64,
            },
            DistanceMetric::Euclidean => Kernel::MixedEuclidean,
            DistanceMetric::Angular => Kernel::Dot,
        }
    }
}

impl VectorIndex for QuantizedIndex {
    type Batch = QuantizedBatch;

    fn metric(&self) -> DistanceMetric {
        self.metric
    }

    fn len(&self) -> usize {
        self.corpus.as_ref().map_or(0, |c| c.batch.rows())
    }

    fn dim(&self) -> Option<usize> {
        self.corpus.as_ref().map(|c| c.batch.dim())
    }

    /// Store a copy of `vectors` and its row sums, replacing any previous corpus.
    fn add(&mut self, vectors: &QuantizedBatch) -> Result<()> {
        if vectors.is_empty() {
            return Err(LpqError::EmptyInput);
        }
        check_corpus_dim(vectors.dim())?;

        let stats: Vec<RowStats> = (0..vectors.rows())
            .into_par_iter()
            .map(|i| RowStats::of(vectors.row(i)))
            .collect();

        if let Some(old) = &self.corpus {
            tracing::debug!(previous = old.batch.rows(), "Replacing quantized corpus");
        }
        self.corpus = Some(QuantizedCorpus {
            batch: vectors.clone(),
            stats,
        });
        tracing::debug!(
            rows = vectors.rows(),
            dim = vectors.dim(),
            metric = %self.metric,
            scale = vectors.params().scale,
            "Quantized corpus indexed"
        );
        Ok(())
    }

    fn search(&self, queries: &QuantizedBatch, top_k: usize) -> Result<SearchResults> {
        let corpus = self.corpus.as_ref().ok_or(LpqError::NotIndexed)?;
        let k = effective_top_k(top_k, corpus.batch.rows())?;
        if queries.is_empty() {
            return Ok(SearchResults::empty(k));
        }
        check_query_dim(corpus.batch.dim(), queries.dim())?;

        let kernel = self.kernel(corpus.batch.params(), queries.params());
        if matches!(kernel, Kernel::MixedEuclidean) {
            tracing::debug!(
                corpus_scale = corpus.batch.params().scale,
                query_scale = queries.params().scale,
                "Queries quantized with their own parameters"
            );
        }

        let n = corpus.batch.rows();
        let q_params = queries.params();
        let rows: Vec<Vec<(f32, u32)>> = (0..queries.rows())
            .into_par_iter()
            .map(|qi| {
                let codes = queries.row(qi);
                let q_ref = QuantizedRef::new(codes, q_params, RowStats::of(codes));
                match kernel {
                    Kernel::SharedEuclidean { scale } => {
                        topk::select(n, k, |ci| squared_diff_i8(codes, corpus.batch.row(ci)))
                            .into_iter()
                            .map(|(key, id)| (((key as f64).sqrt() * scale) as f32, id))
                            .collect()
                    }
                    Kernel::MixedEuclidean => topk::select(n, k, |ci| {
                        let c_ref = corpus.row_ref(ci);
                        OrderedFloat(euclidean_distance_sq_ref(
                            q_ref,
                            c_ref,
                            dot_i8(codes, c_ref.codes),
                        ))
                    })
                    .into_iter()
                    .map(|(key, id)| (key.0.max(0.0).sqrt() as f32, id))
                    .collect(),
                    Kernel::Dot => topk::select(n, k, |ci| {
                        let c_ref = corpus.row_ref(ci);
                        OrderedFloat(-dot_product_ref(q_ref, c_ref, dot_i8(codes, c_ref.codes)))
                    })
                    .into_iter()
                    .map(|(key, id)| ((-key.0) as f32, id))
                    .collect(),
                }
            })
            .collect();

        tracing::debug!(queries = queries.rows(), k, "Quantized search completed");
        Ok(SearchResults::from_rows(rows, k))
    }
}
