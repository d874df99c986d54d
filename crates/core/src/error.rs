//! Error types for quantization and search.
//!
//! Every failure is local and synchronous: an operation either returns its full
//! result or one of these errors, never a partial batch.

use thiserror::Error;

/// Errors returned by the quantizer, the indexes and the evaluation helpers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LpqError {
    /// Malformed input: empty, ragged, zero-width or non-finite data.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A corpus with zero rows was passed to `add`.
    #[error("cannot index an empty batch")]
    EmptyInput,

    /// `search` was called before `add`.
    #[error("index is empty: call add() before search()")]
    NotIndexed,

    /// `top_k` was zero or above [`crate::config::MAX_K`].
    #[error("invalid top_k {top_k}: must be in 1..={max}")]
    InvalidTopK { top_k: usize, max: usize },

    /// Query and corpus dimensions disagree.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Metric string outside `{euclidean, angular}`.
    #[error("unsupported metric '{0}': expected 'euclidean' or 'angular'")]
    UnsupportedMetric(String),

    /// Invalid quantizer configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, LpqError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let e = LpqError::DimensionMismatch {
            expected: 128,
            actual: 96,
        };
        assert_eq!(e.to_string(), "dimension mismatch: expected 128, got 96");

        let e = LpqError::UnsupportedMetric("hamming".into());
        assert!(e.to_string().contains("hamming"));

        let e = LpqError::InvalidTopK { top_k: 0, max: 10 };
        assert_eq!(e.to_string(), "invalid top_k 0: must be in 1..=10");
    }
}
