//! Benchmark datasets: ann-benchmarks names and the binary files they are
//! converted to.
//!
//! A dataset `glove-25-angular` in `data_dir` is read from three files:
//!
//! - `glove-25-angular_train.bin`: `u32 count, u32 dim`, then `count * dim` f32
//! - `glove-25-angular_test.bin`: same layout
//! - `glove-25-angular_neighbors.bin` (optional): `u32 count, u32 k`, then
//!   `count * k` i32 neighbor ids
//!
//! All integers and floats are little-endian.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use lpq_core::{DistanceMetric, FloatBatch, LpqError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

const HEADER_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("invalid dataset name '{0}': expected <name>-<dim>-<metric>")]
    InvalidName(String),

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed file {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("{dataset}: file has dimension {actual}, name says {expected}")]
    DimensionMismatch {
        dataset: String,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Core(#[from] LpqError),
}

pub type Result<T> = std::result::Result<T, DatasetError>;

/// Parsed `{name}-{dim}-{metric}` dataset name, e.g. `deep-image-96-angular`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSpec {
    /// The full name, used for file lookup and reporting.
    pub name: String,
    pub dim: usize,
    pub metric: DistanceMetric,
}

impl FromStr for DatasetSpec {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || DatasetError::InvalidName(s.to_string());
        let mut parts = s.rsplitn(3, '-');
        let metric = parts.next().ok_or_else(invalid)?;
        let dim = parts.next().ok_or_else(invalid)?;
        let prefix = parts.next().ok_or_else(invalid)?;
        if prefix.is_empty() {
            return Err(invalid());
        }
        let dim: usize = dim.parse().map_err(|_| invalid())?;
        if dim == 0 {
            return Err(invalid());
        }
        Ok(Self {
            name: s.to_string(),
            dim,
            metric: metric.parse()?,
        })
    }
}

/// Train vectors, test queries and (when available) their true neighbors.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub spec: DatasetSpec,
    pub train: FloatBatch,
    pub test: FloatBatch,
    pub neighbors: Option<Vec<Vec<u32>>>,
}

impl Dataset {
    /// Load the dataset's binary files from `data_dir`.
    pub fn load(data_dir: &Path, spec: DatasetSpec) -> Result<Self> {
        let file = |suffix: &str| data_dir.join(format!("{}_{}.bin", spec.name, suffix));

        let train = read_vectors(&file("train"))?;
        let test = read_vectors(&file("test"))?;
        for batch in [&train, &test] {
            if batch.dim() != spec.dim {
                return Err(DatasetError::DimensionMismatch {
                    dataset: spec.name.clone(),
                    expected: spec.dim,
                    actual: batch.dim(),
                });
            }
        }

        let neighbors_path = file("neighbors");
        let neighbors = if neighbors_path.exists() {
            let neighbors = read_neighbors(&neighbors_path)?;
            if neighbors.len() != test.rows() {
                return Err(DatasetError::Malformed {
                    path: neighbors_path,
                    reason: format!(
                        "{} neighbor rows for {} queries",
                        neighbors.len(),
                        test.rows()
                    ),
                });
            }
            Some(neighbors)
        } else {
            tracing::info!(
                dataset = %spec.name,
                "No neighbors file, ground truth will be computed"
            );
            None
        };

        tracing::info!(
            dataset = %spec.name,
            train = train.rows(),
            test = test.rows(),
            dim = spec.dim,
            "Dataset loaded"
        );
        Ok(Self {
            spec,
            train,
            test,
            neighbors,
        })
    }

    /// Uniform random vectors in `[-1, 1)`, reproducible from `seed`.
    /// Ground truth is left to be computed.
    pub fn synthetic(
        spec: DatasetSpec,
        num_train: usize,
        num_test: usize,
        seed: u64,
    ) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut batch = |rows: usize| {
            let data: Vec<f32> = (0..rows * spec.dim)
                .map(|_| rng.gen_range(-1.0f32..1.0))
                .collect();
            FloatBatch::new(data, rows, spec.dim)
        };
        let train = batch(num_train)?;
        let test = batch(num_test)?;
        Ok(Self {
            spec,
            train,
            test,
            neighbors: None,
        })
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse the `u32 count, u32 width` header and check the body length.
fn parse_header(path: &Path, buf: &[u8], elem_size: usize) -> Result<(usize, usize)> {
    let malformed = |reason: String| DatasetError::Malformed {
        path: path.to_path_buf(),
        reason,
    };
    if buf.len() < HEADER_LEN {
        return Err(malformed(format!("{} bytes, header needs {}", buf.len(), HEADER_LEN)));
    }
    let count = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    let width = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]) as usize;
    let expected = count
        .checked_mul(width)
        .and_then(|n| n.checked_mul(elem_size))
        .ok_or_else(|| malformed(format!("header {count} x {width} overflows")))?;
    let body = buf.len() - HEADER_LEN;
    if body != expected {
        return Err(malformed(format!(
            "header says {count} x {width}, body has {body} bytes (expected {expected})"
        )));
    }
    Ok((count, width))
}

/// Read a vectors file: `u32 count, u32 dim`, then f32 data.
pub fn read_vectors(path: &Path) -> Result<FloatBatch> {
    let buf = read_file(path)?;
    let (count, dim) = parse_header(path, &buf, 4)?;
    let data: Vec<f32> = buf[HEADER_LEN..]
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Ok(FloatBatch::new(data, count, dim)?)
}

/// Read a neighbors file: `u32 count, u32 k`, then i32 ids.
pub fn read_neighbors(path: &Path) -> Result<Vec<Vec<u32>>> {
    let buf = read_file(path)?;
    let (count, k) = parse_header(path, &buf, 4)?;
    if k == 0 {
        return Ok(vec![Vec::new(); count]);
    }
    let mut rows = Vec::with_capacity(count);
    for row in buf[HEADER_LEN..].chunks_exact(4 * k) {
        let ids = row
            .chunks_exact(4)
            .map(|b| {
                let id = i32::from_le_bytes([b[0], b[1], b[2], b[3]]);
                u32::try_from(id).map_err(|_| DatasetError::Malformed {
                    path: path.to_path_buf(),
                    reason: format!("negative neighbor id {id}"),
                })
            })
            .collect::<Result<Vec<u32>>>()?;
        rows.push(ids);
    }
    Ok(rows)
}

/// Write a vectors file in the layout [`read_vectors`] expects.
pub fn write_vectors(path: &Path, vectors: &FloatBatch) -> Result<()> {
    let mut buf = Vec::with_capacity(HEADER_LEN + vectors.as_slice().len() * 4);
    buf.extend_from_slice(&(vectors.rows() as u32).to_le_bytes());
    buf.extend_from_slice(&(vectors.dim() as u32).to_le_bytes());
    for v in vectors.as_slice() {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    fs::write(path, buf).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_spec() {
        let spec: DatasetSpec = "deep-image-96-angular".parse().unwrap();
        assert_eq!(spec.dim, 96);
        assert_eq!(spec.metric, DistanceMetric::Angular);
        assert_eq!(spec.name, "deep-image-96-angular");

        let spec: DatasetSpec = "sift-128-euclidean".parse().unwrap();
        assert_eq!(spec.dim, 128);
        assert_eq!(spec.metric, DistanceMetric::Euclidean);
    }

    #[test]
    fn test_parse_spec_errors() {
        assert!(matches!(
            "sift".parse::<DatasetSpec>(),
            Err(DatasetError::InvalidName(_))
        ));
        assert!(matches!(
            "sift-abc-euclidean".parse::<DatasetSpec>(),
            Err(DatasetError::InvalidName(_))
        ));
        assert!(matches!(
            "-128-euclidean".parse::<DatasetSpec>(),
            Err(DatasetError::InvalidName(_))
        ));
        assert!(matches!(
            "lastfm-64-dot".parse::<DatasetSpec>(),
            Err(DatasetError::Core(LpqError::UnsupportedMetric(_)))
        ));
    }

    #[test]
    fn test_synthetic_is_reproducible() {
        let spec: DatasetSpec = "random-8-euclidean".parse().unwrap();
        let a = Dataset::synthetic(spec.clone(), 20, 5, 1).unwrap();
        let b = Dataset::synthetic(spec, 20, 5, 1).unwrap();
        assert_eq!(a.train, b.train);
        assert_eq!(a.test.shape(), (5, 8));
        assert!(a.neighbors.is_none());
    }
}
