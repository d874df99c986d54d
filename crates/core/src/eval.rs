//! Recall and run metrics for benchmarking the exact indexes.
//!
//! Ground truth rows may be wider than the computed ones (ann-benchmarks ships
//! 100 neighbors per query); only the first `k` true neighbors count, so
//! `recall = Σ_i |truth_i[..k] ∩ computed_i| / (num_queries * k)`.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::batch::FloatBatch;
use crate::error::{LpqError, Result};
use crate::index::{DistanceMetric, FloatIndex, SearchResults, VectorIndex};

/// Fraction of the first `k` true neighbors found among `predicted[..k]`.
pub fn recall_at_k(predicted: &[u32], ground_truth: &[u32], k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    let truth: HashSet<u32> = ground_truth.iter().take(k).copied().collect();
    let found = predicted
        .iter()
        .take(k)
        .filter(|id| truth.contains(id))
        .count();
    found as f64 / k as f64
}

/// Mean recall over all queries of `computed` against `ground_truth`.
///
/// `ground_truth` must have one row per query, each at least `computed.k()`
/// wide. Only the first `K = computed.k()` ids of each truth row count, so the
/// score is `hits / (Nq * K)`. A wider truth row (100 ids for `K = 10`) is
/// truncated, not intersected in full: an id ranked 11th in truth is a miss.
pub fn recall(computed: &SearchResults, ground_truth: &[Vec<u32>]) -> Result<f64> {
    let num_queries = computed.num_queries();
    if ground_truth.len() != num_queries {
        return Err(LpqError::InvalidInput(format!(
            "ground truth has {} rows, results have {}",
            ground_truth.len(),
            num_queries
        )));
    }
    let k = computed.k();
    if num_queries == 0 || k == 0 {
        return Ok(0.0);
    }
    if let Some((i, row)) = ground_truth.iter().enumerate().find(|(_, r)| r.len() < k) {
        return Err(LpqError::InvalidInput(format!(
            "ground truth row {} has {} neighbors, need at least {}",
            i,
            row.len(),
            k
        )));
    }

    let total: f64 = ground_truth
        .iter()
        .enumerate()
        .map(|(i, truth)| recall_at_k(computed.row_indices(i), truth, k))
        .sum();
    Ok(total / num_queries as f64)
}

/// Exact float neighbors of `queries` in `corpus`, for datasets shipped
/// without ground truth.
pub fn ground_truth(
    corpus: &FloatBatch,
    queries: &FloatBatch,
    metric: DistanceMetric,
    k: usize,
) -> Result<Vec<Vec<u32>>> {
    let mut index = FloatIndex::new(metric);
    index.add(corpus)?;
    let (_, indices) = index.search(queries, k)?.to_nested();
    Ok(indices)
}

/// Metrics of one benchmark run, in the shape the metric sink records them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub dataset: String,
    pub algorithm: String,
    pub metric: DistanceMetric,
    pub top_k: usize,
    pub num_vectors: usize,
    pub num_queries: usize,
    /// Seconds spent in quantization plus `add`.
    pub indexing_time: f64,
    /// Seconds spent in `search`.
    pub querying_time: f64,
    pub queries_per_second: f64,
    pub recall: f64,
}

impl RunMetrics {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dataset: impl Into<String>,
        algorithm: impl Into<String>,
        metric: DistanceMetric,
        top_k: usize,
        num_vectors: usize,
        num_queries: usize,
        indexing_time: Duration,
        querying_time: Duration,
        recall: f64,
    ) -> Self {
        let querying_secs = querying_time.as_secs_f64();
        let queries_per_second = if querying_secs > 0.0 {
            num_queries as f64 / querying_secs
        } else {
            0.0
        };
        Self {
            dataset: dataset.into(),
            algorithm: algorithm.into(),
            metric,
            top_k,
            num_vectors,
            num_queries,
            indexing_time: indexing_time.as_secs_f64(),
            querying_time: querying_secs,
            queries_per_second,
            recall,
        }
    }
}
