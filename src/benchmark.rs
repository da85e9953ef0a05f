//! # Benchmark Engine Module
//!
//! Orchestrates one benchmark run: dial the connection pool, generate the
//! shared point set, run each selected phase through the workload driver,
//! print one report line per phase and drain and close every connection.
//!
//! Any failure is fatal. The runner returns the first error and the caller
//! is expected to exit non-zero; results of a partial run are never reported.

use crate::{
    cli::Args,
    phases::{generate_points, PhaseKind, PhaseOperation, Point},
    pool::ConnectionPool,
    results::{BenchmarkResults, TestConfiguration},
    transport::{TcpTransport, Transport},
    utils::{format_count, format_duration, format_ops_rate},
    workload::run_ops,
};
use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Single source of truth for logging the resolved configuration.
struct BenchmarkConfigDisplay<'a> {
    config: &'a BenchmarkConfig,
}

impl<'a> std::fmt::Display for BenchmarkConfigDisplay<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let phases: Vec<&str> = self.config.phases.iter().map(|p| p.label()).collect();

        writeln!(
            f,
            "-----------------------------------------------------------------"
        )?;
        writeln!(f, "Benchmarking server at: {}", self.config.addr)?;
        writeln!(
            f,
            "  Operations/Phase:   {}",
            format_count(self.config.num_operations as u64)
        )?;
        writeln!(f, "  Radius:             {}m", self.config.radius)?;
        writeln!(f, "  Pipeline Depth:     {}", self.config.pipeline)?;
        writeln!(f, "  Clients:            {}", self.config.clients)?;
        writeln!(f, "  Collection:         {}", self.config.collection)?;
        writeln!(f, "  Phases:             {}", phases.join(", "))?;
        writeln!(f, "  Seed:               {}", self.config.seed)?;
        write!(
            f,
            "-----------------------------------------------------------------"
        )
    }
}

/// Validated benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Server address every connection dials
    pub addr: String,

    /// Operations issued in each phase, one per generated point
    pub num_operations: usize,

    /// Geofence radius in meters used by SETCHAN
    pub radius: u64,

    /// Commands buffered per connection before an automatic flush
    pub pipeline: usize,

    /// Worker slots, and therefore connections
    pub clients: usize,

    /// Phases to run, deduplicated and in canonical order
    pub phases: Vec<PhaseKind>,

    pub collection: String,

    /// Resolved RNG seed
    pub seed: u64,
}

impl BenchmarkConfig {
    /// Create benchmark configuration from CLI arguments
    ///
    /// Rejects unusable values before anything is dialed. When no seed was
    /// given, one is derived from the clock and logged so the run can be
    /// reproduced.
    pub fn from_args(args: &Args) -> Result<Self> {
        crate::utils::validate_operation_count(args.num_fences)?;
        crate::utils::validate_radius(args.radius)?;
        crate::utils::validate_pipeline_depth(args.pipeline)?;
        crate::utils::validate_concurrency(args.clients)?;

        if args.collection.is_empty() {
            anyhow::bail!("Collection name must not be empty");
        }

        let phases: Vec<PhaseKind> = PhaseKind::ALL
            .into_iter()
            .filter(|kind| args.phases.contains(kind))
            .collect();
        if phases.is_empty() {
            anyhow::bail!("At least one phase must be selected");
        }

        let seed = match args.seed {
            Some(seed) => seed,
            None => {
                let seed = crate::utils::current_timestamp_ns();
                info!("No seed given, using {}", seed);
                seed
            }
        };

        Ok(Self {
            addr: args.addr.clone(),
            num_operations: args.num_fences,
            radius: args.radius,
            pipeline: args.pipeline,
            clients: args.clients,
            phases,
            collection: args.collection.clone(),
            seed,
        })
    }

    fn test_configuration(&self) -> TestConfiguration {
        TestConfiguration {
            addr: self.addr.clone(),
            num_fences: self.num_operations,
            radius: self.radius,
            pipeline: self.pipeline,
            clients: self.clients,
            collection: self.collection.clone(),
            seed: self.seed,
        }
    }
}

/// Console report line for one finished phase.
pub fn phase_line(kind: PhaseKind, result: &crate::metrics::ThroughputMetrics) -> String {
    format!(
        "{:<13}{} ops over {} workers in {}, {}, {} ns/op",
        kind.label(),
        format_count(result.total_ops),
        result.workers,
        format_duration(result.duration()),
        format_ops_rate(result.ops_per_second),
        format_count(result.ns_per_op),
    )
}

/// Benchmark runner that coordinates one run against a server
///
/// ```rust,no_run
/// # use geofence_bench::benchmark::{BenchmarkConfig, BenchmarkRunner};
/// # use geofence_bench::cli::Args;
/// #
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let config = BenchmarkConfig::from_args(&Args::default())?;
/// let results = BenchmarkRunner::new(config).run().await?;
/// println!("{} operations", results.total_ops());
/// # Ok(())
/// # }
/// ```
pub struct BenchmarkRunner {
    config: BenchmarkConfig,
}

impl BenchmarkRunner {
    pub fn new(config: BenchmarkConfig) -> Self {
        Self { config }
    }

    /// Dial one TCP connection per client and run every phase.
    pub async fn run(&self) -> Result<BenchmarkResults> {
        info!("{}", BenchmarkConfigDisplay { config: &self.config });

        let addr = self.config.addr.clone();
        let pool = ConnectionPool::connect(self.config.clients, self.config.pipeline, |_| {
            let addr = addr.clone();
            async move { TcpTransport::connect(&addr).await }
        })
        .await
        .with_context(|| format!("Failed to connect to {}", self.config.addr))?;

        self.run_with_pool(Arc::new(pool)).await
    }

    /// Run every phase on an already established pool, then shut it down.
    ///
    /// The pool is shut down only when every phase succeeded. On failure the
    /// connections are poisoned or hold unread replies, so they are simply
    /// dropped.
    pub async fn run_with_pool<T: Transport + 'static>(
        &self,
        pool: Arc<ConnectionPool<T>>,
    ) -> Result<BenchmarkResults> {
        if pool.len() != self.config.clients {
            warn!(
                "Pool has {} connections but {} clients are configured",
                pool.len(),
                self.config.clients
            );
        }

        let start = Instant::now();
        let mut results = BenchmarkResults::new(self.config.test_configuration());

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let points: Arc<[Point]> = generate_points(self.config.num_operations, &mut rng).into();
        debug!("Generated {} points", points.len());

        for &kind in &self.config.phases {
            debug!("Starting phase {}", kind);
            let op = Arc::new(PhaseOperation::new(
                kind,
                Arc::clone(&points),
                Arc::clone(&pool),
                self.config.collection.clone(),
                self.config.radius,
            ));

            let metrics = run_ops(points.len(), pool.len(), op)
                .await
                .with_context(|| format!("Phase {} failed", kind))?;

            println!("{}", phase_line(kind, &metrics.throughput));
            results.add_phase(kind, metrics);
        }

        pool.shutdown().await?;
        results.connections = pool.stats().await;
        results.test_duration = start.elapsed();

        info!(
            "Benchmark completed: {} operations in {}",
            format_count(results.total_ops()),
            format_duration(results.test_duration)
        );
        Ok(results)
    }
}
