use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use lpq_bench::dataset::{Dataset, DatasetSpec};
use lpq_bench::run::{prepare, run, true_neighbors, QueryParams, RunOptions, Variant};
use lpq_core::config;
use lpq_core::QuantizerConfig;
use lpq_core::eval::RunMetrics;

const DEFAULT_DATASETS: &[&str] = &[
    "sift-128-euclidean",
    "gist-960-euclidean",
    "mnist-784-euclidean",
    "glove-25-angular",
    "glove-100-angular",
    "nytimes-256-angular",
    "deep-image-96-angular",
];

#[derive(Parser)]
#[command(
    name = "lpq-bench",
    about = "Recall and throughput of exact search over float and int8 vectors"
)]
struct Args {
    /// Datasets to run, as <name>-<dim>-<metric> (default: the ann-benchmarks set)
    #[arg(short, long, value_delimiter = ',')]
    dataset: Vec<String>,

    /// Directory holding <dataset>_{train,test,neighbors}.bin files
    #[arg(long, default_value = "benchmarks/data")]
    data_dir: PathBuf,

    /// Index variants to run
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = [Variant::Float, Variant::Int8])]
    variant: Vec<Variant>,

    /// Neighbors per query
    #[arg(short = 'k', long, default_value_t = config::DEFAULT_TOP_K)]
    top_k: usize,

    /// Quantizer bit width for the int8 variant
    #[arg(long, default_value_t = config::DEFAULT_BIT_WIDTH)]
    bit_width: u32,

    /// Query quantization: reuse the corpus parameters or fit the queries on their own
    #[arg(long, value_enum, default_value_t = QueryParams::Corpus)]
    query_params: QueryParams,

    /// Generate random data instead of reading files
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Corpus size for --synthetic
    #[arg(long, default_value_t = 10_000)]
    num_vectors: usize,

    /// Query count for --synthetic
    #[arg(long, default_value_t = 100)]
    num_queries: usize,

    /// Seed for --synthetic
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Append metrics as JSON lines to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn init_tracing(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::from_default_env()
        .add_directive("lpq_bench=info".parse()?)
        .add_directive("lpq_core=info".parse()?);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing(args.json_logs)?;

    if args.top_k == 0 || args.top_k > config::MAX_K {
        eprintln!("Error: top_k must be in 1..={}", config::MAX_K);
        std::process::exit(1);
    }
    if args.variant.is_empty() {
        eprintln!("Error: at least one variant is required");
        std::process::exit(1);
    }
    if args.variant.iter().any(Variant::is_quantized) {
        if let Err(e) = QuantizerConfig::with_bit_width(args.bit_width).validate() {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
    if args.synthetic && (args.num_vectors == 0 || args.num_queries == 0) {
        eprintln!("Error: --synthetic needs num_vectors > 0 and num_queries > 0");
        std::process::exit(1);
    }

    let names: Vec<String> = if args.dataset.is_empty() {
        DEFAULT_DATASETS.iter().map(|s| s.to_string()).collect()
    } else {
        args.dataset.clone()
    };

    let mut sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::options().create(true).append(true).open(path)?,
        )),
        None => Box::new(io::stdout().lock()),
    };

    let options = RunOptions {
        top_k: args.top_k,
        bit_width: args.bit_width,
        query_params: args.query_params,
    };
    tracing::info!(options = %serde_json::to_string(&options)?, "Starting benchmark");

    let mut failures = 0usize;
    for name in &names {
        match run_dataset(name, &args, &options) {
            Ok(all) => {
                for metrics in &all {
                    serde_json::to_writer(&mut sink, metrics)?;
                    sink.write_all(b"\n")?;
                }
                sink.flush()?;
            }
            Err(e) => {
                failures += 1;
                tracing::error!(dataset = %name, "Skipping dataset: {}", e);
            }
        }
    }

    if failures == names.len() {
        return Err(format!("all {} datasets failed", failures).into());
    }
    Ok(())
}

fn run_dataset(
    name: &str,
    args: &Args,
    options: &RunOptions,
) -> Result<Vec<RunMetrics>, Box<dyn std::error::Error>> {
    let spec: DatasetSpec = name.parse()?;
    let mut dataset = if args.synthetic {
        Dataset::synthetic(spec, args.num_vectors, args.num_queries, args.seed)?
    } else {
        Dataset::load(&args.data_dir, spec)?
    };
    prepare(&mut dataset);
    let truth = true_neighbors(&dataset, options.top_k)?;

    let mut all = Vec::with_capacity(args.variant.len());
    for &variant in &args.variant {
        all.push(run(&dataset, variant, options, &truth)?);
    }
    Ok(all)
}
