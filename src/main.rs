use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tilesim::analysis::{run_sweep, FailurePolicy};
use tilesim::config::{load_hardware, load_operation};
use tilesim::report::{render, results_path, write_results};
use tilesim::workload::Operation;
use tracing::{info, Level};

/// Memory-traffic and latency estimates for tiled GEMM and convolution on a
/// three-level accelerator memory hierarchy.
#[derive(Debug, Parser)]
#[command(name = "tilesim", version)]
struct Args {
    /// Hardware configuration YAML file
    #[arg(long, default_value = "configs/hardware_config.yaml")]
    hw_config: PathBuf,

    /// Operation to analyze
    #[arg(long, value_enum, default_value_t = Operation::Gemm)]
    operation: Operation,

    /// Operation-specific sweep YAML file (defaults to configs/<operation>_config.yaml)
    #[arg(long)]
    op_config: Option<PathBuf>,

    /// Override `analysis.output_prefix` from the operation file
    #[arg(long)]
    output_prefix: Option<String>,

    /// Skip malformed points instead of aborting the sweep
    #[arg(long)]
    skip_invalid: bool,

    /// Log every analyzed point
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let hardware = load_hardware(&args.hw_config)
        .with_context(|| format!("loading hardware config {}", args.hw_config.display()))?;

    let op_path = args.op_config.clone().unwrap_or_else(|| match args.operation {
        Operation::Gemm => PathBuf::from("configs/gemm_config.yaml"),
        Operation::Conv => PathBuf::from("configs/conv_config.yaml"),
    });
    let mut op_config = load_operation(args.operation, &op_path)
        .with_context(|| format!("loading operation config {}", op_path.display()))?;
    if let Some(prefix) = &args.output_prefix {
        op_config.analysis_mut().output_prefix = prefix.clone();
    }

    let policy = if args.skip_invalid {
        FailurePolicy::Skip
    } else {
        FailurePolicy::Abort
    };
    let report = run_sweep(args.operation, &op_config.points(), &hardware, policy)
        .context("running sweep")?;

    print!("{}", render(&report));

    let analysis = op_config.analysis();
    if analysis.save_detailed_results {
        let path = results_path(&analysis.output_prefix, args.operation);
        write_results(&report, &path)
            .with_context(|| format!("writing results to {}", path.display()))?;
        info!("view with: cargo run --bin viz -- {}", path.display());
    }

    Ok(())
}
