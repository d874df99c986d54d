//! Dense row-major vector batches.
//!
//! A batch stores `rows x dim` elements contiguously, so row `i` lives at
//! `data[i * dim..(i + 1) * dim]`. A batch with zero rows is representable
//! (it is what an empty input parses to) but the quantizer and the indexes
//! reject it.

use rayon::prelude::*;

use crate::error::{LpqError, Result};

/// Smallest number of elements handed to one rayon task by [`Batch::par_map`].
const PAR_MIN_ELEMENTS: usize = 16_384;

/// Dense `rows x dim` matrix stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T> {
    data: Vec<T>,
    rows: usize,
    dim: usize,
}

/// Batch of f32 vectors.
pub type FloatBatch = Batch<f32>;

impl<T: Copy + Send + Sync> Batch<T> {
    /// Build a batch from a flat row-major buffer.
    pub fn new(data: Vec<T>, rows: usize, dim: usize) -> Result<Self> {
        if rows > 0 && dim == 0 {
            return Err(LpqError::InvalidInput(
                "vectors must have at least one dimension".into(),
            ));
        }
        if data.len() != rows * dim {
            return Err(LpqError::InvalidInput(format!(
                "buffer holds {} elements, expected {} rows x {} dims",
                data.len(),
                rows,
                dim
            )));
        }
        Ok(Self { data, rows, dim })
    }

    /// The `0 x 0` batch.
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            rows: 0,
            dim: 0,
        }
    }

    /// Build a batch from nested rows. Every row must have the same length.
    /// An empty outer vector yields an empty `0 x 0` batch.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Ok(Self::empty());
        };
        let dim = first.len();
        if dim == 0 {
            return Err(LpqError::InvalidInput(
                "vectors must have at least one dimension".into(),
            ));
        }
        let mut data = Vec::with_capacity(rows.len() * dim);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != dim {
                return Err(LpqError::InvalidInput(format!(
                    "input is not two-dimensional: row {} has {} values, row 0 has {}",
                    i,
                    row.len(),
                    dim
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            data,
            rows: rows.len(),
            dim,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// `(rows, dim)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.dim)
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Row `i`. Panics if `i >= rows()`.
    #[inline]
    pub fn row(&self, i: usize) -> &[T] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    pub fn iter_rows(&self) -> impl ExactSizeIterator<Item = &[T]> + '_ {
        // chunks_exact(0) panics; an empty batch has no rows to yield anyway.
        self.data.chunks_exact(self.dim.max(1)).take(self.rows)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Copy out as one `Vec` per row.
    pub fn to_nested(&self) -> Vec<Vec<T>> {
        self.iter_rows().map(|r| r.to_vec()).collect()
    }

    /// Apply `f` element-wise, keeping the shape.
    pub fn map<U>(&self, f: impl Fn(T) -> U) -> Batch<U> {
        Batch {
            data: self.data.iter().map(|&v| f(v)).collect(),
            rows: self.rows,
            dim: self.dim,
        }
    }

    /// Parallel element-wise [`Batch::map`].
    pub fn par_map<U: Send>(&self, f: impl Fn(T) -> U + Sync + Send) -> Batch<U> {
        Batch {
            data: self
                .data
                .par_iter()
                .with_min_len(PAR_MIN_ELEMENTS)
                .map(|&v| f(v))
                .collect(),
            rows: self.rows,
            dim: self.dim,
        }
    }

    /// New batch holding rows `start..end` of this one.
    pub fn slice_rows(&self, start: usize, end: usize) -> Result<Self> {
        if start > end || end > self.rows {
            return Err(LpqError::InvalidInput(format!(
                "row range {}..{} out of bounds for {} rows",
                start, end, self.rows
            )));
        }
        Ok(Self {
            data: self.data[start * self.dim..end * self.dim].to_vec(),
            rows: end - start,
            dim: self.dim,
        })
    }
}

impl FloatBatch {
    /// Fail with `InvalidInput` if any element is NaN or infinite.
    pub fn ensure_finite(&self) -> Result<()> {
        if let Some(pos) = self.data.iter().position(|v| !v.is_finite()) {
            return Err(LpqError::InvalidInput(format!(
                "non-finite value at row {}, column {}",
                pos / self.dim,
                pos % self.dim
            )));
        }
        Ok(())
    }

    /// Scale every row to unit L2 norm in place. All-zero rows are left as is.
    ///
    /// Angular datasets must be normalized before quantization and indexing;
    /// the indexes never normalize on their own.
    pub fn normalize_rows(&mut self) {
        if self.rows == 0 {
            return;
        }
        self.data.par_chunks_mut(self.dim).for_each(|row| {
            let norm = row.iter().map(|&x| x * x).sum::<f32>().sqrt();
            if norm > f32::EPSILON {
                let inv = 1.0 / norm;
                row.iter_mut().for_each(|x| *x *= inv);
            }
        });
    }
}
