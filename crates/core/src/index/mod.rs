//! Exact (brute-force) nearest-neighbor search.
//!
//! Two variants share one contract: [`FloatIndex`] scans f32 vectors,
//! [`QuantizedIndex`] scans i8 codes with integer kernels. Both implement
//! [`VectorIndex`]; [`ExactSearchIndex`] picks one at construction time from a
//! `quantize` flag and converts mismatched inputs at the boundary.
//!
//! Contract shared by both:
//! - `add` stores a copy of the batch and replaces any previous corpus.
//! - `search` before `add` fails with `NotIndexed`.
//! - `top_k == 0` (or above `MAX_K`) fails with `InvalidTopK`; a `top_k`
//!   larger than the corpus is clamped to the corpus size.
//! - Results are best-first; equal distances keep ascending corpus order.

/// Distance metrics: euclidean and angular.
pub mod distance;
/// Float-domain exact index.
pub mod float;
/// Quantized-domain exact index.
pub mod quantized;
/// Batched search results.
pub mod results;
/// Bounded top-k selection with deterministic tie-breaking.
pub mod topk;

pub use distance::DistanceMetric;
pub use float::FloatIndex;
pub use quantized::QuantizedIndex;
pub use results::SearchResults;

use crate::batch::{Batch, FloatBatch};
use crate::config::{QuantizerConfig, MAX_DIMENSION, MAX_K};
use crate::error::{LpqError, Result};
use crate::quantization::{LowPrecisionQuantizer, QuantizationParams, QuantizedBatch};

/// Capability shared by the exact index variants.
///
/// `add` takes `&mut self`, `search` takes `&self`: a populated index can be
/// searched from many threads at once, while replacing the corpus requires
/// exclusive access.
pub trait VectorIndex: Send + Sync {
    /// Batch type the index stores and is queried with.
    type Batch;

    fn metric(&self) -> DistanceMetric;

    /// Number of indexed vectors (0 before `add`).
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Corpus dimension, `None` before `add`.
    fn dim(&self) -> Option<usize>;

    /// Replace the corpus with a copy of `vectors`.
    fn add(&mut self, vectors: &Self::Batch) -> Result<()>;

    /// Top-`top_k` neighbors of every query row.
    fn search(&self, queries: &Self::Batch, top_k: usize) -> Result<SearchResults>;
}

/// Validate `top_k` and clamp it to the corpus size.
pub(crate) fn effective_top_k(top_k: usize, corpus_size: usize) -> Result<usize> {
    if top_k == 0 || top_k > MAX_K {
        return Err(LpqError::InvalidTopK { top_k, max: MAX_K });
    }
    Ok(top_k.min(corpus_size))
}

pub(crate) fn check_corpus_dim(dim: usize) -> Result<()> {
    if dim > MAX_DIMENSION {
        return Err(LpqError::InvalidInput(format!(
            "dimension {} exceeds maximum {}",
            dim, MAX_DIMENSION
        )));
    }
    Ok(())
}

pub(crate) fn check_query_dim(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(LpqError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

/// Borrowed input batch in either representation.
#[derive(Debug, Clone, Copy)]
pub enum BatchRef<'a> {
    Float(&'a FloatBatch),
    Quantized(&'a QuantizedBatch),
}

impl<'a> From<&'a FloatBatch> for BatchRef<'a> {
    fn from(b: &'a FloatBatch) -> Self {
        BatchRef::Float(b)
    }
}

impl<'a> From<&'a QuantizedBatch> for BatchRef<'a> {
    fn from(b: &'a QuantizedBatch) -> Self {
        BatchRef::Quantized(b)
    }
}

/// Exact search index, float or quantized, chosen at construction.
#[derive(Debug, Clone)]
pub enum ExactSearchIndex {
    Float(FloatIndex),
    /// `quantizer` encodes float corpora handed to `add`.
    Quantized {
        index: QuantizedIndex,
        quantizer: LowPrecisionQuantizer,
    },
}

impl ExactSearchIndex {
    /// Float index, or a quantized one with the default 8-bit quantizer.
    pub fn new(metric: DistanceMetric, quantize: bool) -> Self {
        if quantize {
            Self::with_quantizer(metric, LowPrecisionQuantizer::default())
        } else {
            ExactSearchIndex::Float(FloatIndex::new(metric))
        }
    }

    /// Quantized index that encodes float corpora with `quantizer`.
    pub fn with_quantizer(metric: DistanceMetric, quantizer: LowPrecisionQuantizer) -> Self {
        ExactSearchIndex::Quantized {
            index: QuantizedIndex::new(metric),
            quantizer,
        }
    }

    /// Build from a metric name such as `"euclidean"` or `"angular"`.
    pub fn with_metric_name(metric: &str, quantize: bool) -> Result<Self> {
        Ok(Self::new(metric.parse()?, quantize))
    }

    pub fn is_quantized(&self) -> bool {
        matches!(self, ExactSearchIndex::Quantized { .. })
    }

    pub fn metric(&self) -> DistanceMetric {
        match self {
            ExactSearchIndex::Float(idx) => idx.metric(),
            ExactSearchIndex::Quantized { index, .. } => index.metric(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ExactSearchIndex::Float(idx) => idx.len(),
            ExactSearchIndex::Quantized { index, .. } => index.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dim(&self) -> Option<usize> {
        match self {
            ExactSearchIndex::Float(idx) => idx.dim(),
            ExactSearchIndex::Quantized { index, .. } => index.dim(),
        }
    }

    /// Replace the corpus.
    ///
    /// A quantized batch given to a float index is dequantized first; a float
    /// batch given to a quantized index is quantized with fresh parameters by
    /// the index's quantizer.
    pub fn add<'a>(&mut self, vectors: impl Into<BatchRef<'a>>) -> Result<()> {
        match (self, vectors.into()) {
            (ExactSearchIndex::Float(idx), BatchRef::Float(b)) => idx.add(b),
            (ExactSearchIndex::Float(idx), BatchRef::Quantized(b)) => idx.add(&b.dequantize()),
            (ExactSearchIndex::Quantized { index, .. }, BatchRef::Quantized(b)) => index.add(b),
            (ExactSearchIndex::Quantized { index, quantizer }, BatchRef::Float(b)) => {
                if b.is_empty() {
                    return Err(LpqError::EmptyInput);
                }
                let quantized = quantizer.quantize_vectors(b)?;
                index.add(&quantized)
            }
        }
    }

    /// Search with queries in either representation.
    ///
    /// Float queries against a quantized index are quantized with the
    /// corpus's parameters; quantized queries against a float index are
    /// dequantized.
    pub fn search<'a>(
        &self,
        queries: impl Into<BatchRef<'a>>,
        top_k: usize,
    ) -> Result<SearchResults> {
        match (self, queries.into()) {
            (ExactSearchIndex::Float(idx), BatchRef::Float(q)) => idx.search(q, top_k),
            (ExactSearchIndex::Float(idx), BatchRef::Quantized(q)) => {
                idx.search(&q.dequantize(), top_k)
            }
            (ExactSearchIndex::Quantized { index, .. }, BatchRef::Quantized(q)) => {
                index.search(q, top_k)
            }
            (ExactSearchIndex::Quantized { index, .. }, BatchRef::Float(q)) => {
                let params = index.params().ok_or(LpqError::NotIndexed)?;
                if q.is_empty() {
                    return index.search(&empty_like(params), top_k);
                }
                let quantizer =
                    LowPrecisionQuantizer::new(QuantizerConfig::with_bit_width(params.bit_width))?;
                index.search(&quantizer.quantize_with(q, params)?, top_k)
            }
        }
    }
}

fn empty_like(params: &QuantizationParams) -> QuantizedBatch {
    QuantizedBatch::from_parts_unchecked(Batch::empty(), *params)
}
