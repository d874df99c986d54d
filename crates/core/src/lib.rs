//! # lpq-core
//!
//! Low-precision vector quantization and exact nearest-neighbor search.
//!
//! [`LowPrecisionQuantizer`] compresses f32 batches to i8 codes with one
//! affine map per batch. [`ExactSearchIndex`] scans a corpus by brute force,
//! either over the original floats or over the quantized codes with integer
//! kernels, so the accuracy cost of quantization can be measured against an
//! exact baseline.
//!
//! No async dependencies; the Python bindings and the benchmark driver both
//! build on this crate.

/// Dense row-major vector batches.
pub mod batch;
/// Global configuration constants: limits, defaults, and tuning parameters.
pub mod config;
/// Error type shared by the quantizer and the indexes.
pub mod error;
/// Recall computation and benchmark run metrics.
pub mod eval;
/// Exact search indexes: float and quantized variants, metrics, and top-k selection.
pub mod index;
/// Low-precision quantization: f32 → i8 with per-batch scale and zero point.
pub mod quantization;

pub use batch::{Batch, FloatBatch};
pub use config::QuantizerConfig;
pub use error::{LpqError, Result};
pub use index::{
    DistanceMetric, ExactSearchIndex, FloatIndex, QuantizedIndex, SearchResults, VectorIndex,
};
pub use quantization::{LowPrecisionQuantizer, QuantizationParams, QuantizedBatch};
