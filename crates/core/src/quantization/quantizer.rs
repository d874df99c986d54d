//! The low-precision quantizer.
//!
//! Holds nothing but its bit width. Each [`LowPrecisionQuantizer::quantize_vectors`]
//! call fits fresh parameters to the batch it is given; use
//! [`LowPrecisionQuantizer::quantize_with`] to push queries through the
//! corpus's mapping instead.

use rayon::prelude::*;

use super::scalar::{QuantizationParams, QuantizedBatch};
use crate::batch::FloatBatch;
use crate::config::QuantizerConfig;
use crate::error::{LpqError, Result};

/// Affine f32 → i8 quantizer with a fixed bit width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LowPrecisionQuantizer {
    config: QuantizerConfig,
}

impl Default for LowPrecisionQuantizer {
    fn default() -> Self {
        Self {
            config: QuantizerConfig::default(),
        }
    }
}

impl LowPrecisionQuantizer {
    pub fn new(config: QuantizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn bit_width(&self) -> u32 {
        self.config.bit_width
    }

    pub fn config(&self) -> &QuantizerConfig {
        &self.config
    }

    /// Derive the batch's parameters from its global min and max.
    pub fn fit(&self, vectors: &FloatBatch) -> Result<QuantizationParams> {
        if vectors.is_empty() {
            return Err(LpqError::InvalidInput("cannot quantize an empty batch".into()));
        }
        vectors.ensure_finite()?;

        let (min, max) = vectors
            .as_slice()
            .par_iter()
            .fold(
                || (f32::MAX, f32::MIN),
                |(lo, hi), &v| (lo.min(v), hi.max(v)),
            )
            .reduce(
                || (f32::MAX, f32::MIN),
                |(lo_a, hi_a), (lo_b, hi_b)| (lo_a.min(lo_b), hi_a.max(hi_b)),
            );

        QuantizationParams::from_range(min, max, self.config.bit_width)
    }

    /// Quantize a batch with parameters fitted to that same batch.
    pub fn quantize_vectors(&self, vectors: &FloatBatch) -> Result<QuantizedBatch> {
        let params = self.fit(vectors)?;
        let quantized = self.encode(vectors, params);
        tracing::debug!(
            rows = vectors.rows(),
            dim = vectors.dim(),
            scale = params.scale,
            zero_point = params.zero_point,
            bit_width = params.bit_width,
            "Quantized batch"
        );
        Ok(quantized)
    }

    /// Quantize a batch with existing parameters, typically the corpus's.
    /// Values outside the parameters' range saturate at the end codes.
    pub fn quantize_with(
        &self,
        vectors: &FloatBatch,
        params: &QuantizationParams,
    ) -> Result<QuantizedBatch> {
        if vectors.is_empty() {
            return Err(LpqError::InvalidInput("cannot quantize an empty batch".into()));
        }
        if params.bit_width != self.config.bit_width {
            return Err(LpqError::InvalidConfig(format!(
                "parameters use bit_width {}, quantizer uses {}",
                params.bit_width, self.config.bit_width
            )));
        }
        params.validate()?;
        vectors.ensure_finite()?;
        Ok(self.encode(vectors, *params))
    }

    /// Reconstruct f32 values. Each element is within `scale / 2` of the
    /// original when it lay inside the fitted range.
    pub fn dequantize(&self, quantized: &QuantizedBatch) -> FloatBatch {
        quantized.dequantize()
    }

    fn encode(&self, vectors: &FloatBatch, params: QuantizationParams) -> QuantizedBatch {
        let codes = vectors.par_map(|v| params.quantize(v));
        QuantizedBatch::from_parts_unchecked(codes, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(rows: Vec<Vec<f32>>) -> FloatBatch {
        FloatBatch::from_rows(rows).unwrap()
    }

    #[test]
    fn test_fit_uses_global_range() {
        let q = LowPrecisionQuantizer::default();
        let b = batch(vec![vec![-1.0, 0.5], vec![3.0, 0.0]]);
        let p = q.fit(&b).unwrap();
        assert_eq!(p.zero_point, -1.0);
        assert!((p.scale - 4.0 / 255.0).abs() < 1e-7);
    }

    #[test]
    fn test_quantize_preserves_shape() {
        let q = LowPrecisionQuantizer::default();
        let b = batch(vec![vec![0.1, 0.2, 0.3]; 5]);
        let out = q.quantize_vectors(&b).unwrap();
        assert_eq!(out.shape(), b.shape());
    }

    #[test]
    fn test_empty_batch_rejected() {
        let q = LowPrecisionQuantizer::default();
        let err = q.quantize_vectors(&batch(Vec::new())).unwrap_err();
        assert!(matches!(err, LpqError::InvalidInput(_)), "got {err:?}");
    }

    #[test]
    fn test_non_finite_rejected() {
        let q = LowPrecisionQuantizer::default();
        let b = batch(vec![vec![1.0, f32::INFINITY]]);
        assert!(q.quantize_vectors(&b).is_err());
    }

    #[test]
    fn test_constant_batch() {
        let q = LowPrecisionQuantizer::default();
        let b = batch(vec![vec![4.2; 6]; 3]);
        let out = q.quantize_vectors(&b).unwrap();
        assert!(out.params().is_degenerate());
        assert!(out.codes().as_slice().iter().all(|&c| c == -128));
        assert!(out.dequantize().as_slice().iter().all(|&v| v == 4.2));
    }

    #[test]
    fn test_bit_width_limits_codes() {
        let q = LowPrecisionQuantizer::new(QuantizerConfig::with_bit_width(4)).unwrap();
        let b = batch(vec![(0..32).map(|i| i as f32).collect()]);
        let out = q.quantize_vectors(&b).unwrap();
        assert!(out.codes().as_slice().iter().all(|&c| (-8..=7).contains(&c)));
        assert_eq!(out.row(0)[0], -8);
        assert_eq!(out.row(0)[31], 7);
    }

    #[test]
    fn test_invalid_bit_width() {
        assert!(LowPrecisionQuantizer::new(QuantizerConfig::with_bit_width(12)).is_err());
    }

    #[test]
    fn test_quantize_with_saturates_outside_range() {
        let q = LowPrecisionQuantizer::default();
        let corpus = batch(vec![vec![0.0, 1.0]]);
        let p = q.fit(&corpus).unwrap();
        let queries = batch(vec![vec![-2.0, 3.0]]);
        let out = q.quantize_with(&queries, &p).unwrap();
        assert_eq!(out.row(0), &[-128, 127]);
        assert_eq!(out.params(), &p);
    }

    #[test]
    fn test_quantize_with_rejects_foreign_bit_width() {
        let q8 = LowPrecisionQuantizer::default();
        let q4 = LowPrecisionQuantizer::new(QuantizerConfig::with_bit_width(4)).unwrap();
        let b = batch(vec![vec![0.0, 1.0]]);
        let p = q4.fit(&b).unwrap();
        assert!(matches!(
            q8.quantize_with(&b, &p),
            Err(LpqError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_large_batch_matches_elementwise() {
        let q = LowPrecisionQuantizer::default();
        let rows: Vec<Vec<f32>> = (0..700)
            .map(|i| vec![i as f32, -(i as f32), 0.5])
            .collect();
        let b = batch(rows);
        let out = q.quantize_vectors(&b).unwrap();
        let p = out.params();
        for i in [0, 255, 256, 511, 699] {
            for j in 0..3 {
                assert_eq!(out.row(i)[j], p.quantize(b.row(i)[j]), "row {i} col {j}");
            }
        }
    }
}
