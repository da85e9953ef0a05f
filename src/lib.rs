//! # Geofence Benchmark Library
//!
//! A throughput benchmark for Redis-protocol geofencing servers. Commands are
//! issued by concurrent workers over a fixed pool of connections, and each
//! connection batches commands into pipelines before writing them.
//!
//! ## Architecture Overview
//!
//! - `transport`: the `Transport` trait, RESP encoding/parsing and the TCP transport
//! - `pipeline`: `PipelinedConnection`, which counts outstanding replies and
//!   flushes automatically once the pipeline depth is reached
//! - `pool`: one pipelined connection per worker slot
//! - `workload`: fans operations out over worker tasks and times them
//! - `phases`: the SETCHAN / SET workload phases and point generation
//! - `benchmark`: configuration and the runner that ties it all together
//! - `metrics`, `results`: throughput and latency measurement, JSON output
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use geofence_bench::{Args, BenchmarkConfig, BenchmarkRunner};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = Args {
//!         num_fences: 10_000,
//!         pipeline: 32,
//!         clients: 8,
//!         ..Args::default()
//!     };
//!
//!     let config = BenchmarkConfig::from_args(&args)?;
//!     let results = BenchmarkRunner::new(config).run().await?;
//!
//!     for phase in &results.phases {
//!         println!("{}: {:.0} ops/sec", phase.phase, phase.metrics.throughput.ops_per_second);
//!     }
//!     Ok(())
//! }
//! ```

/// Run configuration and the phase-by-phase benchmark runner
pub mod benchmark;

/// Command-line interface
pub mod cli;

pub mod logging;

/// Throughput and latency measurement using HDR histograms
pub mod metrics;

/// Workload phases and the commands they issue
pub mod phases;

/// Pipelined connection: command batching over a single transport
pub mod pipeline;

pub mod pool;

/// Result collection and JSON output
pub mod results;

/// Transport abstraction, RESP wire format and the TCP transport
pub mod transport;

pub mod utils;

/// Concurrent workload driver
pub mod workload;

pub use benchmark::{BenchmarkConfig, BenchmarkRunner};
pub use cli::Args;
pub use metrics::{LatencyMetrics, ThroughputMetrics};
pub use phases::PhaseKind;
pub use pipeline::{PipelineError, PipelinedConnection};
pub use pool::ConnectionPool;
pub use results::{BenchmarkResults, ResultsManager};
pub use transport::{Command, Reply, Transport, TransportError};

/// The current version of the geofence benchmark
///
/// Populated from Cargo.toml and recorded in result output.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod defaults {
    /// Default server address
    ///
    /// 9851 is the port geofencing servers of this family listen on.
    pub const ADDRESS: &str = "localhost:9851";

    /// Default number of geofences, which is also the operation count of
    /// every phase
    pub const NUM_FENCES: usize = 23_000;

    /// Default geofence radius in meters
    pub const RADIUS_METERS: u64 = 5_000;

    /// Default pipeline depth
    ///
    /// A depth of 1 flushes after every command, the synchronous baseline.
    pub const PIPELINE: usize = 1;

    /// Default number of concurrent clients
    pub const CLIENTS: usize = 20;

    /// Default collection name
    pub const COLLECTION: &str = "fleet";
}
