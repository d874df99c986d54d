//! Distance metrics for exact search.
//!
//! Every metric produces a ranking key where **lower is better**, plus the
//! value reported to callers:
//!
//! | metric      | ranking key          | reported distance     |
//! |-------------|----------------------|-----------------------|
//! | `Euclidean` | squared L2           | L2 (`sqrt` of key)    |
//! | `Angular`   | negative dot product | dot product           |
//!
//! Angular assumes the caller L2-normalized both corpus and queries, so the
//! dot product equals cosine similarity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LpqError;
use crate::quantization::simd;

/// Distance metric used by the exact indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// L2 distance. Range: \[0, ∞).
    Euclidean,
    /// Inner product of normalized vectors. Range: \[-1, 1\], higher is closer.
    Angular,
}

impl DistanceMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::Angular => "angular",
        }
    }

    /// Exact f32-vs-f32 ranking key.
    #[inline]
    pub fn key_f32(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Euclidean => simd::euclidean_sq_f32(a, b),
            DistanceMetric::Angular => -simd::dot_product_f32(a, b),
        }
    }

    /// Convert a ranking key back to the reported distance.
    #[inline]
    pub fn key_to_distance(&self, key: f32) -> f32 {
        match self {
            DistanceMetric::Euclidean => key.max(0.0).sqrt(),
            DistanceMetric::Angular => -key,
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = LpqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "euclidean" => Ok(DistanceMetric::Euclidean),
            "angular" => Ok(DistanceMetric::Angular),
            _ => Err(LpqError::UnsupportedMetric(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!(
            "Euclidean".parse::<DistanceMetric>().unwrap(),
            DistanceMetric::Euclidean
        );
        assert_eq!(
            "ANGULAR".parse::<DistanceMetric>().unwrap(),
            DistanceMetric::Angular
        );
    }

    #[test]
    fn test_parse_unsupported() {
        let err = "dot".parse::<DistanceMetric>().unwrap_err();
        assert_eq!(err, LpqError::UnsupportedMetric("dot".into()));
    }

    #[test]
    fn test_euclidean_key_and_distance() {
        let a = vec![0.0, 0.0, 0.0];
        let b = vec![3.0, 4.0, 0.0];
        let key = DistanceMetric::Euclidean.key_f32(&a, &b);
        assert!((key - 25.0).abs() < 1e-5, "squared euclidean should be 25, got {key}");
        let d = DistanceMetric::Euclidean.key_to_distance(key);
        assert!((d - 5.0).abs() < 1e-5, "euclidean should be 5, got {d}");
    }

    #[test]
    fn test_angular_key_orders_similar_first() {
        let q = vec![1.0, 0.0];
        let near = vec![0.8, 0.6];
        let far = vec![0.0, 1.0];
        let k_near = DistanceMetric::Angular.key_f32(&q, &near);
        let k_far = DistanceMetric::Angular.key_f32(&q, &far);
        assert!(k_near < k_far, "near={k_near}, far={k_far}");
        let d = DistanceMetric::Angular.key_to_distance(k_near);
        assert!((d - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&DistanceMetric::Angular).unwrap();
        assert_eq!(json, "\"angular\"");
        assert_eq!(DistanceMetric::Euclidean.to_string(), "euclidean");
    }
}
