//! Affine scalar quantization: f32 → i8 with one scale/zero-point per batch.
//!
//! A batch's parameters come from its global min and max. With `b` bits,
//! `scale = (max - min) / (2^b - 1)` and `zero_point = min`, and a value maps to
//! `q = round((v - zero_point) / scale) + q_min`, so `min` lands on `q_min` and
//! `max` on `q_max`. The inverse is `v ≈ (q - q_min) * scale + zero_point`.
//!
//! Integer kernels use i32 inner accumulators in fixed-size chunks for
//! auto-vectorization and i64 outer accumulation.

use serde::{Deserialize, Serialize};

use crate::batch::{Batch, FloatBatch};
use crate::config::{QuantizerConfig, DEFAULT_BIT_WIDTH, INT_CHUNK};
use crate::error::{LpqError, Result};

/// Affine mapping shared by every element of one quantized batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantizationParams {
    /// Real-valued width of one quantization step. Zero for constant input.
    pub scale: f32,
    /// Real value represented by the lowest code `q_min`.
    pub zero_point: f32,
    /// Bits per code.
    pub bit_width: u32,
}

impl QuantizationParams {
    /// Fit parameters to the closed range `[min, max]`.
    ///
    /// When `max == min` the scale is zero and every value quantizes to `q_min`,
    /// which dequantizes back to the constant exactly.
    pub fn from_range(min: f32, max: f32, bit_width: u32) -> Result<Self> {
        QuantizerConfig::with_bit_width(bit_width).validate()?;
        let range = max as f64 - min as f64;
        let levels = ((1u32 << bit_width) - 1) as f64;
        let scale = if range > 0.0 {
            (range / levels) as f32
        } else {
            0.0
        };
        let params = Self {
            scale,
            zero_point: min,
            bit_width,
        };
        params.validate()?;
        Ok(params)
    }

    /// Check the bit width is supported and the affine map is finite with a
    /// non-negative scale. Every other method assumes this holds.
    pub fn validate(&self) -> Result<()> {
        QuantizerConfig::with_bit_width(self.bit_width).validate()?;
        if !self.scale.is_finite() || self.scale < 0.0 || !self.zero_point.is_finite() {
            return Err(LpqError::InvalidConfig(format!(
                "invalid quantization parameters: scale={}, zero_point={}",
                self.scale, self.zero_point
            )));
        }
        Ok(())
    }

    /// Smallest representable code, `-2^(b-1)`.
    #[inline]
    pub fn q_min(&self) -> i32 {
        -(1i32 << (self.bit_width - 1))
    }

    /// Largest representable code, `2^(b-1) - 1`.
    #[inline]
    pub fn q_max(&self) -> i32 {
        (1i32 << (self.bit_width - 1)) - 1
    }

    pub fn is_degenerate(&self) -> bool {
        self.scale == 0.0
    }

    /// Quantize one value, saturating outside the fitted range.
    #[inline]
    pub fn quantize(&self, value: f32) -> i8 {
        let q_min = self.q_min();
        if self.scale == 0.0 {
            return q_min as i8;
        }
        let steps = ((value as f64 - self.zero_point as f64) / self.scale as f64).round();
        let q = (steps + q_min as f64).clamp(q_min as f64, self.q_max() as f64);
        q as i8
    }

    /// Reconstruct the real value of one code. Lossy.
    #[inline]
    pub fn dequantize(&self, code: i8) -> f32 {
        ((code as i32 - self.q_min()) as f64 * self.scale as f64 + self.zero_point as f64) as f32
    }

    /// Additive term of the affine map written as `v = scale * q + offset`.
    /// The quantized distance reconstruction works in this form.
    #[inline]
    pub fn offset(&self) -> f64 {
        self.zero_point as f64 - self.scale as f64 * self.q_min() as f64
    }
}

impl Default for QuantizationParams {
    fn default() -> Self {
        Self {
            scale: 0.0,
            zero_point: 0.0,
            bit_width: DEFAULT_BIT_WIDTH,
        }
    }
}

/// A batch of i8 codes together with the parameters that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedBatch {
    codes: Batch<i8>,
    params: QuantizationParams,
}

impl QuantizedBatch {
    /// Pair existing codes with their parameters.
    /// Fails if the parameters are invalid or a code lies outside their
    /// representable range.
    pub fn from_parts(codes: Batch<i8>, params: QuantizationParams) -> Result<Self> {
        params.validate()?;
        let (lo, hi) = (params.q_min(), params.q_max());
        if let Some(&bad) = codes
            .as_slice()
            .iter()
            .find(|&&c| (c as i32) < lo || (c as i32) > hi)
        {
            return Err(LpqError::InvalidInput(format!(
                "code {} outside [{}, {}] for bit_width {}",
                bad, lo, hi, params.bit_width
            )));
        }
        Ok(Self { codes, params })
    }

    /// Used by the quantizer, whose output is in range by construction.
    pub(crate) fn from_parts_unchecked(codes: Batch<i8>, params: QuantizationParams) -> Self {
        Self { codes, params }
    }

    pub fn codes(&self) -> &Batch<i8> {
        &self.codes
    }

    pub fn params(&self) -> &QuantizationParams {
        &self.params
    }

    pub fn rows(&self) -> usize {
        self.codes.rows()
    }

    pub fn dim(&self) -> usize {
        self.codes.dim()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.codes.shape()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    #[inline]
    pub fn row(&self, i: usize) -> &[i8] {
        self.codes.row(i)
    }

    /// Map every code back to f32 with this batch's parameters.
    pub fn dequantize(&self) -> FloatBatch {
        self.codes.map(|c| self.params.dequantize(c))
    }
}

/// Per-row integer sums used to reconstruct real-valued distances:
/// `Σq` and `Σq²`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowStats {
    pub sum: i64,
    pub sum_sq: i64,
}

impl RowStats {
    pub fn of(codes: &[i8]) -> Self {
        let mut sum = 0i64;
        let mut sum_sq = 0i64;

        let full_chunks = codes.len() / INT_CHUNK;
        for c in 0..full_chunks {
            let base = c * INT_CHUNK;
            let mut cs = 0i32;
            let mut css = 0i32;
            for j in 0..INT_CHUNK {
                let q = codes[base + j] as i32;
                cs += q;
                css += q * q;
            }
            sum += cs as i64;
            sum_sq += css as i64;
        }

        for &q in &codes[full_chunks * INT_CHUNK..] {
            let q = q as i64;
            sum += q;
            sum_sq += q * q;
        }

        Self { sum, sum_sq }
    }
}

/// Lightweight view of one quantized row with its affine map and row sums.
#[derive(Debug, Clone, Copy)]
pub struct QuantizedRef<'a> {
    pub codes: &'a [i8],
    pub scale: f64,
    pub offset: f64,
    pub stats: RowStats,
}

impl<'a> QuantizedRef<'a> {
    pub fn new(codes: &'a [i8], params: &QuantizationParams, stats: RowStats) -> Self {
        Self {
            codes,
            scale: params.scale as f64,
            offset: params.offset(),
            stats,
        }
    }

    /// Squared L2 norm of the reconstructed row:
    /// `Σ(s·q + o)² = s²·Σq² + 2·s·o·Σq + n·o²`.
    pub fn norm_sq(&self) -> f64 {
        let n = self.codes.len() as f64;
        self.scale * self.scale * self.stats.sum_sq as f64
            + 2.0 * self.scale * self.offset * self.stats.sum as f64
            + n * self.offset * self.offset
    }
}

/// Integer dot product `Σ a_i·b_i` with chunked i32 accumulation.
pub fn dot_i8_scalar(a: &[i8], b: &[i8]) -> i64 {
    debug_assert_eq!(a.len(), b.len());

    let len = a.len();
    let mut dot = 0i64;

    let full_chunks = len / INT_CHUNK;
    for c in 0..full_chunks {
        let base = c * INT_CHUNK;
        let mut cd = 0i32;
        for j in 0..INT_CHUNK {
            cd += a[base + j] as i32 * b[base + j] as i32;
        }
        dot += cd as i64;
    }

    for i in (full_chunks * INT_CHUNK)..len {
        dot += a[i] as i64 * b[i] as i64;
    }
    dot
}

/// Integer squared difference `Σ (a_i - b_i)²` with chunked i32 accumulation.
/// 32 differences of at most 255 squared sum to 2,080,800, well inside i32.
pub fn squared_diff_i8_scalar(a: &[i8], b: &[i8]) -> i64 {
    debug_assert_eq!(a.len(), b.len());

    let len = a.len();
    let mut sum = 0i64;

    let full_chunks = len / INT_CHUNK;
    for c in 0..full_chunks {
        let base = c * INT_CHUNK;
        let mut cs = 0i32;
        for j in 0..INT_CHUNK {
            let d = a[base + j] as i32 - b[base + j] as i32;
            cs += d * d;
        }
        sum += cs as i64;
    }

    for i in (full_chunks * INT_CHUNK)..len {
        let d = a[i] as i64 - b[i] as i64;
        sum += d * d;
    }
    sum
}

/// Real-valued dot product of two quantized rows, reconstructed from integer
/// sums in one floating-point step:
/// `Σ(sa·a + oa)(sb·b + ob) = sa·sb·Σab + sa·ob·Σa + sb·oa·Σb + n·oa·ob`.
pub fn dot_product_ref(a: QuantizedRef<'_>, b: QuantizedRef<'_>, int_dot: i64) -> f64 {
    let n = a.codes.len() as f64;
    a.scale * b.scale * int_dot as f64
        + a.scale * b.offset * a.stats.sum as f64
        + b.scale * a.offset * b.stats.sum as f64
        + n * a.offset * b.offset
}

/// Real-valued squared L2 distance of two quantized rows with independent
/// parameters: `|a|² + |b|² - 2·a·b`, clamped at zero against cancellation.
pub fn euclidean_distance_sq_ref(a: QuantizedRef<'_>, b: QuantizedRef<'_>, int_dot: i64) -> f64 {
    (a.norm_sq() + b.norm_sq() - 2.0 * dot_product_ref(a, b, int_dot)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(min: f32, max: f32) -> QuantizationParams {
        QuantizationParams::from_range(min, max, 8).unwrap()
    }

    #[test]
    fn test_endpoints_map_to_code_range() {
        let p = params(-1.0, 1.0);
        assert_eq!(p.quantize(-1.0), -128);
        assert_eq!(p.quantize(1.0), 127);
        assert_eq!(p.q_min(), -128);
        assert_eq!(p.q_max(), 127);
    }

    #[test]
    fn test_out_of_range_saturates() {
        let p = params(0.0, 1.0);
        assert_eq!(p.quantize(-5.0), -128);
        assert_eq!(p.quantize(5.0), 127);
    }

    #[test]
    fn test_round_trip_within_half_step() {
        let p = params(-3.0, 7.0);
        for i in 0..=1000 {
            let v = -3.0 + 10.0 * i as f32 / 1000.0;
            let back = p.dequantize(p.quantize(v));
            assert!(
                (back - v).abs() <= p.scale / 2.0 + 1e-5,
                "v={v}, back={back}, scale={}",
                p.scale
            );
        }
    }

    #[test]
    fn test_degenerate_range() {
        let p = params(2.5, 2.5);
        assert!(p.is_degenerate());
        assert_eq!(p.quantize(2.5), -128);
        assert_eq!(p.dequantize(-128), 2.5);
    }

    #[test]
    fn test_low_bit_width_range() {
        let p = QuantizationParams::from_range(0.0, 15.0, 4).unwrap();
        assert_eq!(p.q_min(), -8);
        assert_eq!(p.q_max(), 7);
        assert!((p.scale - 1.0).abs() < 1e-6);
        assert_eq!(p.quantize(0.0), -8);
        assert_eq!(p.quantize(15.0), 7);
        assert_eq!(p.quantize(6.0), -2);
    }

    #[test]
    fn test_offset_form_matches_dequantize() {
        let p = params(-0.7, 1.3);
        for code in [-128i8, -1, 0, 64, 127] {
            let affine = p.scale as f64 * code as f64 + p.offset();
            assert!((affine as f32 - p.dequantize(code)).abs() < 1e-5);
        }
    }

    #[test]
    fn test_from_parts_rejects_out_of_range_codes() {
        let codes = Batch::from_rows(vec![vec![0i8, 9]]).unwrap();
        let p = QuantizationParams::from_range(0.0, 1.0, 4).unwrap();
        assert!(QuantizedBatch::from_parts(codes, p).is_err());
    }

    #[test]
    fn test_from_parts_rejects_invalid_params() {
        let codes = || Batch::from_rows(vec![vec![0i8, 1]]).unwrap();
        for bit_width in [0, 1, 9, 32, 64] {
            let p = QuantizationParams {
                scale: 1.0,
                zero_point: 0.0,
                bit_width,
            };
            assert!(
                matches!(
                    QuantizedBatch::from_parts(codes(), p),
                    Err(LpqError::InvalidConfig(_))
                ),
                "bit_width={bit_width} should be rejected"
            );
        }
        for (scale, zero_point) in [(-1.0, 0.0), (f32::NAN, 0.0), (1.0, f32::INFINITY)] {
            let p = QuantizationParams {
                scale,
                zero_point,
                bit_width: 8,
            };
            assert!(QuantizedBatch::from_parts(codes(), p).is_err());
        }
    }

    #[test]
    fn test_from_range_rejects_unsupported_bit_width() {
        assert!(QuantizationParams::from_range(0.0, 1.0, 0).is_err());
        assert!(QuantizationParams::from_range(0.0, 1.0, 40).is_err());
        assert!(QuantizationParams::from_range(0.0, f32::MAX, 8).is_ok());
    }

    #[test]
    fn test_deserialized_params_are_validated() {
        let p: QuantizationParams =
            serde_json::from_str(r#"{"scale":1.0,"zero_point":0.0,"bit_width":0}"#).unwrap();
        let codes = Batch::from_rows(vec![vec![0i8]]).unwrap();
        assert!(QuantizedBatch::from_parts(codes, p).is_err());
    }

    #[test]
    fn test_integer_kernels() {
        let a: Vec<i8> = (0..70).map(|i| (i % 17) as i8 - 8).collect();
        let b: Vec<i8> = (0..70).map(|i| (i % 11) as i8 * 3 - 15).collect();
        let dot: i64 = a.iter().zip(&b).map(|(&x, &y)| x as i64 * y as i64).sum();
        let sq: i64 = a
            .iter()
            .zip(&b)
            .map(|(&x, &y)| (x as i64 - y as i64).pow(2))
            .sum();
        assert_eq!(dot_i8_scalar(&a, &b), dot);
        assert_eq!(squared_diff_i8_scalar(&a, &b), sq);

        let stats = RowStats::of(&a);
        assert_eq!(stats.sum, a.iter().map(|&x| x as i64).sum::<i64>());
        assert_eq!(stats.sum_sq, a.iter().map(|&x| (x as i64).pow(2)).sum::<i64>());
    }

    #[test]
    fn test_extreme_codes_do_not_overflow() {
        let a = vec![-128i8; 4096];
        assert_eq!(dot_i8_scalar(&a, &a), 4096 * 16384);
        let b = vec![127i8; 4096];
        assert_eq!(squared_diff_i8_scalar(&a, &b), 4096 * 255 * 255);
    }

    #[test]
    fn test_reconstruction_matches_float_math() {
        let pa = params(-1.0, 2.0);
        let pb = params(-0.5, 0.5);
        let a: Vec<i8> = vec![-128, -3, 40, 127, 5];
        let b: Vec<i8> = vec![100, -90, 0, 12, -128];
        let ra = QuantizedRef::new(&a, &pa, RowStats::of(&a));
        let rb = QuantizedRef::new(&b, &pb, RowStats::of(&b));
        let int_dot = dot_i8_scalar(&a, &b);

        let fa: Vec<f64> = a.iter().map(|&q| pa.dequantize(q) as f64).collect();
        let fb: Vec<f64> = b.iter().map(|&q| pb.dequantize(q) as f64).collect();
        let dot: f64 = fa.iter().zip(&fb).map(|(x, y)| x * y).sum();
        let l2: f64 = fa.iter().zip(&fb).map(|(x, y)| (x - y).powi(2)).sum();

        let got_dot = dot_product_ref(ra, rb, int_dot);
        let got_l2 = euclidean_distance_sq_ref(ra, rb, int_dot);
        assert!((got_dot - dot).abs() < 1e-4, "dot {got_dot} vs {dot}");
        assert!((got_l2 - l2).abs() < 1e-4, "l2 {got_l2} vs {l2}");
    }
}
