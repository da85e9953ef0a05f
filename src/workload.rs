//! # Workload Driver
//!
//! Fans `total` operations out across `workers` concurrent tasks and times
//! the whole batch. Operation `i` always runs on worker slot `i % workers`,
//! and each slot runs its operations in increasing index order, so a slot's
//! callbacks never overlap with each other.
//!
//! The first failing operation aborts every other worker and the error is
//! returned to the caller. There is no retry; a partial phase would skew the
//! measured rate.

use crate::metrics::{LatencyCollector, PhaseMetrics, ThroughputMetrics};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, error};

/// Percentiles captured for per-operation latency.
pub const LATENCY_PERCENTILES: [f64; 4] = [50.0, 95.0, 99.0, 99.9];

/// One unit of benchmark work, invoked once per operation index.
#[async_trait]
pub trait Operation: Send + Sync + 'static {
    /// Run operation `index` on worker slot `slot`.
    async fn execute(&self, index: usize, slot: usize) -> Result<()>;

    /// Called once after every worker has finished, before the clock stops.
    async fn complete(&self) -> Result<()> {
        Ok(())
    }
}

/// Run `total` operations across `workers` tasks.
pub async fn run_ops<O: Operation>(total: usize, workers: usize, op: Arc<O>) -> Result<PhaseMetrics> {
    crate::utils::validate_concurrency(workers)?;

    let start = Instant::now();
    let mut tasks = JoinSet::new();

    for slot in 0..workers.min(total.max(1)) {
        let op = Arc::clone(&op);
        tasks.spawn(async move {
            let mut latency = LatencyCollector::new()?;
            let mut index = slot;
            while index < total {
                let op_start = Instant::now();
                op.execute(index, slot)
                    .await
                    .with_context(|| format!("Operation {} failed on worker {}", index, slot))?;
                latency.record(op_start.elapsed())?;
                index += workers;
            }
            Ok::<_, anyhow::Error>(latency)
        });
    }

    let mut latency = LatencyCollector::new()?;
    while let Some(joined) = tasks.join_next().await {
        let worker_latency = match joined {
            Ok(Ok(worker_latency)) => worker_latency,
            Ok(Err(e)) => {
                error!("Worker failed, aborting remaining workers: {:#}", e);
                tasks.abort_all();
                return Err(e);
            }
            Err(e) => {
                tasks.abort_all();
                return Err(anyhow!("Worker task panicked or was cancelled: {}", e));
            }
        };
        latency.merge(&worker_latency)?;
    }

    op.complete().await.context("Failed to complete workload")?;
    let elapsed = start.elapsed();
    debug!(
        "Ran {} operations across {} workers in {:?} ({} latency samples)",
        total,
        workers,
        elapsed,
        latency.sample_count()
    );

    Ok(PhaseMetrics {
        throughput: ThroughputMetrics::new(total as u64, workers, elapsed),
        latency: latency.get_metrics(&LATENCY_PERCENTILES),
        timestamp: chrono::Utc::now(),
    })
}
