//! Fixed-size pool of pipelined connections, one per worker slot.

use crate::pipeline::{PipelineError, PipelineStats, PipelinedConnection};
use crate::transport::Transport;
use anyhow::{Context, Result};
use std::future::Future;
use tracing::{debug, info};

/// One [`PipelinedConnection`] per worker slot.
///
/// Slot `j` always maps to the same connection, so lookups need no locking.
pub struct ConnectionPool<T: Transport> {
    connections: Vec<PipelinedConnection<T>>,
}

impl<T: Transport> ConnectionPool<T> {
    /// Dial `size` connections, in slot order.
    ///
    /// The first dial failure aborts construction and drops the transports
    /// that were already established; a partial pool is never returned.
    pub async fn connect<F, Fut, E>(size: usize, max_pipeline: usize, mut dial: F) -> Result<Self>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Into<anyhow::Error>,
    {
        crate::utils::validate_concurrency(size)?;
        crate::utils::validate_pipeline_depth(max_pipeline)?;

        let mut connections = Vec::with_capacity(size);
        for slot in 0..size {
            let transport = dial(slot).await.map_err(|e| {
                let err: anyhow::Error = e.into();
                err.context(format!("Failed to dial connection {} of {}", slot, size))
            })?;
            let name = transport.name();
            let conn = PipelinedConnection::new(slot, transport, max_pipeline);
            debug!(
                "Dialed connection {} ({}), pipeline depth {}",
                conn.slot(),
                name,
                conn.max_pipeline()
            );
            connections.push(conn);
        }

        info!(
            "Connection pool ready: {} connections, pipeline depth {}",
            size, max_pipeline
        );
        Ok(Self { connections })
    }

    /// Connection owned by `slot`.
    pub fn get(&self, slot: usize) -> Option<&PipelinedConnection<T>> {
        self.connections.get(slot)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Drain every connection, in slot order.
    pub async fn flush_all(&self) -> Result<(), PipelineError> {
        for conn in &self.connections {
            conn.flush().await?;
        }
        Ok(())
    }

    /// Total replies still owed across the pool.
    pub async fn outstanding(&self) -> usize {
        let mut total = 0;
        for conn in &self.connections {
            total += conn.outstanding().await;
        }
        total
    }

    /// Per-slot counters, in slot order.
    pub async fn stats(&self) -> Vec<PipelineStats> {
        let mut stats = Vec::with_capacity(self.connections.len());
        for conn in &self.connections {
            stats.push(conn.stats().await);
        }
        stats
    }

    /// Drain every connection, then close them.
    pub async fn shutdown(&self) -> Result<()> {
        self.flush_all()
            .await
            .context("Failed to drain connections before shutdown")?;
        for conn in &self.connections {
            conn.close().await?;
        }
        debug!("Closed {} connections", self.connections.len());
        Ok(())
    }
}
