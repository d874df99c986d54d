//! Configuration for lpq.
//!
//! Limits and defaults are compile-time constants. The only runtime knob of the
//! core is [`QuantizerConfig`], passed explicitly to the quantizer constructor;
//! the benchmark driver layers its CLI arguments on top of these defaults.

use serde::{Deserialize, Serialize};

use crate::error::{LpqError, Result};

/// Default quantizer bit width. Codes span the full signed 8-bit range.
pub const DEFAULT_BIT_WIDTH: u32 = 8;

/// Smallest supported bit width (codes in \[-2, 1\]).
pub const MIN_BIT_WIDTH: u32 = 2;

/// Largest supported bit width. Quantized batches store `i8`.
pub const MAX_BIT_WIDTH: u32 = 8;

/// Maximum allowed vector dimension.
///
/// With i8 codes every product is at most 128 * 128 = 16384, so a full row
/// of this length stays far below `i32::MAX` even before chunked accumulation.
pub const MAX_DIMENSION: usize = 65_536;

/// Maximum number of neighbors (`top_k`) per search call.
pub const MAX_K: usize = 10_000;

/// Default `top_k` used by the benchmark driver, matching ann-benchmarks runs.
pub const DEFAULT_TOP_K: usize = 100;

/// Inner accumulation chunk for integer kernels. 32 products of i8 x i8
/// (at most 16384 each) sum to 524288, well inside i32.
pub const INT_CHUNK: usize = 32;

/// Inner accumulation chunk for f32 kernels. 8 x f32 = one AVX register.
pub const F32_CHUNK: usize = 8;

/// Quantizer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantizerConfig {
    /// Number of bits per quantized component, in `MIN_BIT_WIDTH..=MAX_BIT_WIDTH`.
    pub bit_width: u32,
}

impl Default for QuantizerConfig {
    fn default() -> Self {
        Self {
            bit_width: DEFAULT_BIT_WIDTH,
        }
    }
}

impl QuantizerConfig {
    pub fn with_bit_width(bit_width: u32) -> Self {
        Self { bit_width }
    }

    /// Check that the bit width fits in an i8 code.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_BIT_WIDTH..=MAX_BIT_WIDTH).contains(&self.bit_width) {
            return Err(LpqError::InvalidConfig(format!(
                "bit_width must be in {}..={}, got {}",
                MIN_BIT_WIDTH, MAX_BIT_WIDTH, self.bit_width
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = QuantizerConfig::default();
        assert_eq!(config.bit_width, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_bit_width() {
        assert!(QuantizerConfig::with_bit_width(1).validate().is_err());
        assert!(QuantizerConfig::with_bit_width(9).validate().is_err());
        assert!(QuantizerConfig::with_bit_width(16).validate().is_err());
        assert!(QuantizerConfig::with_bit_width(4).validate().is_ok());
    }

    #[test]
    fn test_config_serde() {
        let config = QuantizerConfig::with_bit_width(6);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"bit_width":6}"#);
        let back: QuantizerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
