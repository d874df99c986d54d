//! # lpq-bench
//!
//! Benchmark driver for the exact search indexes: loads ann-benchmarks style
//! datasets (or generates synthetic ones), runs the float and int8 variants,
//! and reports recall and throughput as JSON lines.

/// Dataset names, binary file readers, and synthetic generation.
pub mod dataset;
/// Single benchmark runs and their metrics.
pub mod run;
