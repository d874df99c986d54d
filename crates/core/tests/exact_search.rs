//! End-to-end behavior of the quantizer and both exact indexes.

use lpq_core::eval::{ground_truth, recall};
use lpq_core::{
    DistanceMetric, ExactSearchIndex, FloatBatch, LowPrecisionQuantizer, LpqError,
    QuantizerConfig,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_batch(rng: &mut StdRng, rows: usize, dim: usize) -> FloatBatch {
    let data: Vec<f32> = (0..rows * dim).map(|_| rng.gen_range(-1.0f32..1.0)).collect();
    FloatBatch::new(data, rows, dim).unwrap()
}

#[test]
fn round_trip_error_within_half_step() {
    let mut rng = StdRng::seed_from_u64(7);
    let vectors = random_batch(&mut rng, 200, 48);
    for bits in [2, 4, 8] {
        let quantizer = LowPrecisionQuantizer::new(QuantizerConfig::with_bit_width(bits)).unwrap();
        let quantized = quantizer.quantize_vectors(&vectors).unwrap();
        let restored = quantizer.dequantize(&quantized);
        let bound = quantized.params().scale / 2.0 + 1e-5;
        for (orig, back) in vectors.as_slice().iter().zip(restored.as_slice()) {
            assert!(
                (orig - back).abs() <= bound,
                "bits={bits}: {orig} -> {back}, bound {bound}"
            );
        }
    }
}

#[test]
fn quantization_is_deterministic() {
    let mut rng = StdRng::seed_from_u64(11);
    let vectors = random_batch(&mut rng, 64, 16);
    let quantizer = LowPrecisionQuantizer::default();
    let a = quantizer.quantize_vectors(&vectors).unwrap();
    let b = quantizer.quantize_vectors(&vectors).unwrap();
    assert_eq!(a.codes(), b.codes());
    assert_eq!(a.params(), b.params());
}

#[test]
fn constant_input_round_trips_exactly() {
    let vectors = FloatBatch::from_rows(vec![vec![2.5; 6]; 4]).unwrap();
    let quantizer = LowPrecisionQuantizer::default();
    let quantized = quantizer.quantize_vectors(&vectors).unwrap();
    assert!(quantized.params().is_degenerate());
    assert!(quantized.codes().as_slice().iter().all(|&c| c == -128));
    assert_eq!(quantizer.dequantize(&quantized), vectors);
}

#[test]
fn shapes_are_preserved() {
    let mut rng = StdRng::seed_from_u64(3);
    let corpus = random_batch(&mut rng, 50, 12);
    let queries = random_batch(&mut rng, 7, 12);
    let quantized = LowPrecisionQuantizer::default().quantize_vectors(&corpus).unwrap();
    assert_eq!(quantized.shape(), (50, 12));

    for quantize in [false, true] {
        let mut index = ExactSearchIndex::new(DistanceMetric::Euclidean, quantize);
        index.add(&corpus).unwrap();
        assert_eq!(index.len(), 50);
        assert_eq!(index.search(&queries, 5).unwrap().shape(), (7, 5));
        assert_eq!(index.search(&queries, 500).unwrap().shape(), (7, 50));
    }
}

#[test]
fn corpus_rows_find_themselves() {
    let mut rng = StdRng::seed_from_u64(5);
    let corpus = random_batch(&mut rng, 100, 20);
    let quantizer = LowPrecisionQuantizer::default();
    let codes = quantizer.quantize_vectors(&corpus).unwrap();

    let mut float = ExactSearchIndex::new(DistanceMetric::Euclidean, false);
    float.add(&corpus).unwrap();
    let mut quantized = ExactSearchIndex::new(DistanceMetric::Euclidean, true);
    quantized.add(&codes).unwrap();

    let f = float.search(&corpus, 1).unwrap();
    let q = quantized.search(&codes, 1).unwrap();
    for i in 0..corpus.rows() {
        assert_eq!(f.row_indices(i), &[i as u32]);
        assert_eq!(f.row_distances(i), &[0.0]);
        assert_eq!(q.row_indices(i), &[i as u32]);
        assert_eq!(q.row_distances(i), &[0.0]);
    }
}

#[test]
fn recall_against_float_ground_truth() {
    let mut rng = StdRng::seed_from_u64(42);
    let corpus = random_batch(&mut rng, 1000, 32);
    let queries = corpus.slice_rows(0, 10).unwrap();
    let k = 10;
    let truth = ground_truth(&corpus, &queries, DistanceMetric::Euclidean, k).unwrap();

    let mut float = ExactSearchIndex::new(DistanceMetric::Euclidean, false);
    float.add(&corpus).unwrap();
    let float_recall = recall(&float.search(&queries, k).unwrap(), &truth).unwrap();
    assert_eq!(float_recall, 1.0);

    let quantizer = LowPrecisionQuantizer::default();
    let codes = quantizer.quantize_vectors(&corpus).unwrap();
    let query_codes = quantizer.quantize_with(&queries, codes.params()).unwrap();
    let mut quantized = ExactSearchIndex::new(DistanceMetric::Euclidean, true);
    quantized.add(&codes).unwrap();
    let quantized_recall = recall(&quantized.search(&query_codes, k).unwrap(), &truth).unwrap();
    assert!((0.0..=1.0).contains(&quantized_recall));
    assert!(quantized_recall >= 0.5, "int8 recall {quantized_recall}");
}

#[test]
fn angular_recall_on_normalized_data() {
    let mut rng = StdRng::seed_from_u64(9);
    let mut corpus = random_batch(&mut rng, 500, 24);
    let mut queries = random_batch(&mut rng, 10, 24);
    corpus.normalize_rows();
    queries.normalize_rows();
    let truth = ground_truth(&corpus, &queries, DistanceMetric::Angular, 10).unwrap();

    let mut index = ExactSearchIndex::new(DistanceMetric::Angular, true);
    index.add(&corpus).unwrap();
    let results = index.search(&queries, 10).unwrap();
    let r = recall(&results, &truth).unwrap();
    assert!((0.0..=1.0).contains(&r));
    for i in 0..results.num_queries() {
        let row = results.row_distances(i);
        assert!(row.windows(2).all(|w| w[0] >= w[1]), "row {i} not best-first");
    }
}

#[test]
fn identical_vectors_tie_break_by_index() {
    let corpus = FloatBatch::from_rows(vec![vec![1.0, 2.0, 3.0]; 3]).unwrap();
    for metric in [DistanceMetric::Euclidean, DistanceMetric::Angular] {
        for quantize in [false, true] {
            let mut index = ExactSearchIndex::new(metric, quantize);
            index.add(&corpus).unwrap();
            let res = index.search(&corpus.slice_rows(0, 1).unwrap(), 2).unwrap();
            assert_eq!(res.row_indices(0), &[0, 1], "{metric} quantize={quantize}");
        }
    }
}

#[test]
fn search_before_add_fails() {
    let queries = FloatBatch::from_rows(vec![vec![0.0; 4]]).unwrap();
    for quantize in [false, true] {
        let index = ExactSearchIndex::new(DistanceMetric::Angular, quantize);
        assert_eq!(index.search(&queries, 1).unwrap_err(), LpqError::NotIndexed);
    }
}
