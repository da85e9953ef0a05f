//! # Geofence Benchmark - Main Entry Point
//!
//! 1. **Parse arguments** and initialize logging
//! 2. **Create benchmark config**: validate the CLI arguments
//! 3. **Run benchmark**: dial the pool and run every phase
//! 4. **Write results** to the JSON output file, if one was requested
//!
//! Any error aborts the run and exits non-zero.

use anyhow::Result;
use clap::Parser;
use geofence_bench::{
    benchmark::{BenchmarkConfig, BenchmarkRunner},
    cli::Args,
    logging,
    results::ResultsManager,
};
use tracing::{debug, error};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);
    debug!("Configuration: {:?}", args);

    println!(
        ">> numFences: {}, radius: {}m, pipeline {}, clients: {} <<",
        args.num_fences, args.radius, args.pipeline, args.clients
    );

    if let Err(e) = run(&args).await {
        error!("Benchmark failed: {:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(args: &Args) -> Result<()> {
    let config = BenchmarkConfig::from_args(args)?;
    let results_manager = ResultsManager::new(args.output_file.as_deref());

    let runner = BenchmarkRunner::new(config);
    let results = runner.run().await?;

    results_manager.write(&results)?;
    Ok(())
}
