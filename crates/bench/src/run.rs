//! One benchmark run: index a dataset with one variant, search its queries,
//! score the results.

use std::time::Instant;

use clap::ValueEnum;
use lpq_core::eval::{ground_truth, recall, RunMetrics};
use lpq_core::{DistanceMetric, ExactSearchIndex, LowPrecisionQuantizer, QuantizerConfig};
use serde::Serialize;

use crate::dataset::{Dataset, Result};

/// Which exact index to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Float,
    Int8,
}

impl Variant {
    /// Name recorded in [`RunMetrics::algorithm`].
    pub fn algorithm(&self) -> &'static str {
        match self {
            Variant::Float => "lpq-exact-float",
            Variant::Int8 => "lpq-exact-int8",
        }
    }

    pub fn is_quantized(&self) -> bool {
        matches!(self, Variant::Int8)
    }
}

/// How queries are quantized for the int8 variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryParams {
    /// Reuse the corpus's scale and zero point.
    Corpus,
    /// Fit fresh parameters to the query batch.
    Independent,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOptions {
    pub top_k: usize,
    pub bit_width: u32,
    pub query_params: QueryParams,
}

/// Normalize rows in place when the dataset is angular.
///
/// Queries are normalized along with the corpus: the ranking is unchanged and
/// the queries stay inside the corpus's quantization range.
pub fn prepare(dataset: &mut Dataset) {
    if dataset.spec.metric == DistanceMetric::Angular {
        dataset.train.normalize_rows();
        dataset.test.normalize_rows();
        tracing::debug!(dataset = %dataset.spec.name, "Normalized rows");
    }
}

/// The dataset's true neighbors, computed with the float index if it ships
/// none. Rows are at least `top_k` wide.
pub fn true_neighbors(dataset: &Dataset, top_k: usize) -> Result<Vec<Vec<u32>>> {
    if let Some(neighbors) = &dataset.neighbors {
        return Ok(neighbors.clone());
    }
    let t0 = Instant::now();
    let truth = ground_truth(&dataset.train, &dataset.test, dataset.spec.metric, top_k)?;
    tracing::info!(
        dataset = %dataset.spec.name,
        elapsed_secs = t0.elapsed().as_secs_f64(),
        "Computed ground truth"
    );
    Ok(truth)
}

/// Index `dataset.train` with `variant`, search `dataset.test`, and score
/// against `truth`.
pub fn run(
    dataset: &Dataset,
    variant: Variant,
    options: &RunOptions,
    truth: &[Vec<u32>],
) -> Result<RunMetrics> {
    let metric = dataset.spec.metric;
    let quantizer = if variant.is_quantized() {
        Some(LowPrecisionQuantizer::new(QuantizerConfig::with_bit_width(
            options.bit_width,
        ))?)
    } else {
        None
    };
    let mut index = match quantizer {
        Some(q) => ExactSearchIndex::with_quantizer(metric, q),
        None => ExactSearchIndex::new(metric, false),
    };

    let t0 = Instant::now();
    index.add(&dataset.train)?;
    let indexing_time = t0.elapsed();

    // Float queries given to a quantized index inherit the corpus parameters.
    let t0 = Instant::now();
    let results = match (&quantizer, options.query_params) {
        (Some(q), QueryParams::Independent) => {
            index.search(&q.quantize_vectors(&dataset.test)?, options.top_k)?
        }
        _ => index.search(&dataset.test, options.top_k)?,
    };
    let querying_time = t0.elapsed();

    let r = recall(&results, truth)?;
    let metrics = RunMetrics::new(
        dataset.spec.name.clone(),
        variant.algorithm(),
        metric,
        results.k(),
        dataset.train.rows(),
        dataset.test.rows(),
        indexing_time,
        querying_time,
        r,
    );
    tracing::info!(
        dataset = %metrics.dataset,
        algorithm = %metrics.algorithm,
        recall = metrics.recall,
        indexing_time = metrics.indexing_time,
        querying_time = metrics.querying_time,
        qps = metrics.queries_per_second,
        "recall@{}",
        metrics.top_k
    );
    Ok(metrics)
}
