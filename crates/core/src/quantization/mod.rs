//! Low-precision quantization for exact search.
//!
//! Compresses f32 batches to i8 codes with one affine map (scale + zero point)
//! per batch, a 4× memory reduction. Includes the integer kernels the quantized
//! index runs on and the closed-form reconstruction of real-valued distances
//! from integer sums.

/// The quantizer: fits parameters and encodes batches.
pub mod quantizer;
/// Affine parameters, quantized batches and integer distance kernels.
pub mod scalar;
/// SIMD-accelerated distance kernels (AVX2 / scalar fallback).
pub mod simd;

pub use quantizer::LowPrecisionQuantizer;
pub use scalar::{QuantizationParams, QuantizedBatch};
