//! Python bindings for lpq via PyO3.
//!
//! Exposes an `lpq` module with two submodules:
//! - `lpq.quantizer`: `LowPrecisionQuantizerInt8`, `QuantizedVectors`
//! - `lpq.index`: `ExactSearchIndexF`, `ExactSearchIndexInt8`
//!
//! Vectors cross the boundary as lists of lists. Searches release the GIL.

use parking_lot::RwLock;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use lpq_core::{
    DistanceMetric, ExactSearchIndex, FloatBatch, LowPrecisionQuantizer, LpqError,
    QuantizedBatch, QuantizerConfig,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn to_py_err(e: LpqError) -> PyErr {
    match e {
        LpqError::NotIndexed => PyRuntimeError::new_err(e.to_string()),
        _ => PyValueError::new_err(e.to_string()),
    }
}

fn float_batch(vectors: Vec<Vec<f32>>) -> PyResult<FloatBatch> {
    FloatBatch::from_rows(vectors).map_err(to_py_err)
}

fn parse_metric(metric: &str) -> PyResult<DistanceMetric> {
    metric.parse().map_err(to_py_err)
}

/// A Python argument holding either quantized vectors or a list of float rows.
enum VectorsArg {
    Float(FloatBatch),
    Quantized(QuantizedBatch),
}

impl VectorsArg {
    fn extract(obj: &Bound<'_, PyAny>) -> PyResult<Self> {
        if let Ok(q) = obj.downcast::<QuantizedVectors>() {
            return Ok(VectorsArg::Quantized(q.get().inner.clone()));
        }
        let rows: Vec<Vec<f32>> = obj.extract().map_err(|_| {
            PyValueError::new_err("vectors must be QuantizedVectors or a list of float lists")
        })?;
        Ok(VectorsArg::Float(float_batch(rows)?))
    }
}

// ---------------------------------------------------------------------------
// Quantizer
// ---------------------------------------------------------------------------

/// Quantized vectors: i8 codes plus the scale and zero point that produced them.
#[pyclass(frozen, module = "lpq.quantizer")]
struct QuantizedVectors {
    inner: QuantizedBatch,
}

#[pymethods]
impl QuantizedVectors {
    #[getter]
    fn scale(&self) -> f32 {
        self.inner.params().scale
    }

    #[getter]
    fn zero_point(&self) -> f32 {
        self.inner.params().zero_point
    }

    #[getter]
    fn bit_width(&self) -> u32 {
        self.inner.params().bit_width
    }

    #[getter]
    fn shape(&self) -> (usize, usize) {
        self.inner.shape()
    }

    /// The codes as a list of integer lists.
    fn codes(&self) -> Vec<Vec<i8>> {
        self.inner.codes().to_nested()
    }

    /// Reconstructed float vectors.
    fn dequantize(&self) -> Vec<Vec<f32>> {
        self.inner.dequantize().to_nested()
    }

    fn __len__(&self) -> usize {
        self.inner.rows()
    }

    fn __repr__(&self) -> String {
        let (rows, dim) = self.inner.shape();
        format!(
            "QuantizedVectors(shape=({}, {}), scale={:.6}, zero_point={:.6}, bit_width={})",
            rows,
            dim,
            self.scale(),
            self.zero_point(),
            self.bit_width()
        )
    }
}

/// Affine low-precision quantizer producing int8 codes.
#[pyclass(frozen, module = "lpq.quantizer")]
struct LowPrecisionQuantizerInt8 {
    inner: LowPrecisionQuantizer,
}

#[pymethods]
impl LowPrecisionQuantizerInt8 {
    #[new]
    #[pyo3(signature = (bit_width = lpq_core::config::DEFAULT_BIT_WIDTH))]
    fn new(bit_width: u32) -> PyResult<Self> {
        let inner = LowPrecisionQuantizer::new(QuantizerConfig::with_bit_width(bit_width))
            .map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Bits per code.
    #[getter]
    fn bit_width(&self) -> u32 {
        self.inner.bit_width()
    }

    /// Quantize with parameters fitted to `vectors`, or with the parameters
    /// of `params_from` (typically the quantized corpus) when given.
    #[pyo3(signature = (vectors, params_from = None))]
    fn quantize_vectors(
        &self,
        py: Python<'_>,
        vectors: Vec<Vec<f32>>,
        params_from: Option<PyRef<'_, QuantizedVectors>>,
    ) -> PyResult<QuantizedVectors> {
        let batch = float_batch(vectors)?;
        let params = params_from.map(|p| *p.inner.params());
        let quantizer = self.inner;
        let inner = py
            .allow_threads(move || match params {
                Some(params) => quantizer.quantize_with(&batch, &params),
                None => quantizer.quantize_vectors(&batch),
            })
            .map_err(to_py_err)?;
        Ok(QuantizedVectors { inner })
    }

    fn dequantize(&self, quantized: PyRef<'_, QuantizedVectors>) -> Vec<Vec<f32>> {
        self.inner.dequantize(&quantized.inner).to_nested()
    }

    fn __repr__(&self) -> String {
        format!("LowPrecisionQuantizerInt8(bit_width={})", self.inner.bit_width())
    }
}

// ---------------------------------------------------------------------------
// Indexes
// ---------------------------------------------------------------------------

type SearchOutput = (Vec<Vec<f32>>, Vec<Vec<u32>>);

/// Shared body of the two index classes.
struct IndexCell {
    inner: RwLock<ExactSearchIndex>,
}

impl IndexCell {
    fn new(index: ExactSearchIndex) -> Self {
        Self {
            inner: RwLock::new(index),
        }
    }

    fn add(&self, py: Python<'_>, vectors: &Bound<'_, PyAny>) -> PyResult<()> {
        let vectors = VectorsArg::extract(vectors)?;
        py.allow_threads(|| {
            let mut index = self.inner.write();
            match &vectors {
                VectorsArg::Float(b) => index.add(b),
                VectorsArg::Quantized(b) => index.add(b),
            }
        })
        .map_err(to_py_err)
    }

    fn search(
        &self,
        py: Python<'_>,
        queries: &Bound<'_, PyAny>,
        top_k: usize,
    ) -> PyResult<SearchOutput> {
        let queries = VectorsArg::extract(queries)?;
        let results = py
            .allow_threads(|| {
                let index = self.inner.read();
                match &queries {
                    VectorsArg::Float(b) => index.search(b, top_k),
                    VectorsArg::Quantized(b) => index.search(b, top_k),
                }
            })
            .map_err(to_py_err)?;
        Ok(results.to_nested())
    }

    fn metric(&self) -> &'static str {
        self.inner.read().metric().as_str()
    }

    fn len(&self) -> usize {
        self.inner.read().len()
    }

    fn dim(&self) -> Option<usize> {
        self.inner.read().dim()
    }
}

/// Exact nearest-neighbor index over float vectors.
#[pyclass(frozen, module = "lpq.index")]
struct ExactSearchIndexF {
    cell: IndexCell,
}

#[pymethods]
impl ExactSearchIndexF {
    #[new]
    fn new(metric: &str) -> PyResult<Self> {
        Ok(Self {
            cell: IndexCell::new(ExactSearchIndex::new(parse_metric(metric)?, false)),
        })
    }

    /// Replace the corpus. Quantized input is dequantized first.
    fn add(&self, py: Python<'_>, vectors: &Bound<'_, PyAny>) -> PyResult<()> {
        self.cell.add(py, vectors)
    }

    /// Return `(distances, indices)`, one row per query, best first.
    #[pyo3(signature = (queries, top_k = lpq_core::config::DEFAULT_TOP_K))]
    fn search(
        &self,
        py: Python<'_>,
        queries: &Bound<'_, PyAny>,
        top_k: usize,
    ) -> PyResult<SearchOutput> {
        self.cell.search(py, queries, top_k)
    }

    #[getter]
    fn metric(&self) -> &'static str {
        self.cell.metric()
    }

    #[getter]
    fn dim(&self) -> Option<usize> {
        self.cell.dim()
    }

    fn __len__(&self) -> usize {
        self.cell.len()
    }

    fn __repr__(&self) -> String {
        format!(
            "ExactSearchIndexF(metric='{}', size={})",
            self.cell.metric(),
            self.cell.len()
        )
    }
}

/// Exact nearest-neighbor index over int8-quantized vectors.
///
/// Float input to `add` is quantized with fresh `bit_width`-bit parameters;
/// float queries are quantized with the corpus's parameters.
#[pyclass(frozen, module = "lpq.index")]
struct ExactSearchIndexInt8 {
    cell: IndexCell,
}

#[pymethods]
impl ExactSearchIndexInt8 {
    #[new]
    #[pyo3(signature = (metric, bit_width = lpq_core::config::DEFAULT_BIT_WIDTH))]
    fn new(metric: &str, bit_width: u32) -> PyResult<Self> {
        let quantizer = LowPrecisionQuantizer::new(QuantizerConfig::with_bit_width(bit_width))
            .map_err(to_py_err)?;
        Ok(Self {
            cell: IndexCell::new(ExactSearchIndex::with_quantizer(
                parse_metric(metric)?,
                quantizer,
            )),
        })
    }

    fn add(&self, py: Python<'_>, vectors: &Bound<'_, PyAny>) -> PyResult<()> {
        self.cell.add(py, vectors)
    }

    /// Return `(distances, indices)`, one row per query, best first.
    #[pyo3(signature = (queries, top_k = lpq_core::config::DEFAULT_TOP_K))]
    fn search(
        &self,
        py: Python<'_>,
        queries: &Bound<'_, PyAny>,
        top_k: usize,
    ) -> PyResult<SearchOutput> {
        self.cell.search(py, queries, top_k)
    }

    #[getter]
    fn metric(&self) -> &'static str {
        self.cell.metric()
    }

    #[getter]
    fn dim(&self) -> Option<usize> {
        self.cell.dim()
    }

    fn __len__(&self) -> usize {
        self.cell.len()
    }

    fn __repr__(&self) -> String {
        format!(
            "ExactSearchIndexInt8(metric='{}', size={})",
            self.cell.metric(),
            self.cell.len()
        )
    }
}

// ---------------------------------------------------------------------------
// Module
// ---------------------------------------------------------------------------

#[pymodule]
fn lpq(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let py = m.py();

    let quantizer = PyModule::new(py, "quantizer")?;
    quantizer.add_class::<LowPrecisionQuantizerInt8>()?;
    quantizer.add_class::<QuantizedVectors>()?;
    m.add_submodule(&quantizer)?;

    let index = PyModule::new(py, "index")?;
    index.add_class::<ExactSearchIndexF>()?;
    index.add_class::<ExactSearchIndexInt8>()?;
    m.add_submodule(&index)?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
