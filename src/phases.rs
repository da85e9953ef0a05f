//! # Benchmark Phases
//!
//! Each phase issues one command per operation index against the pool:
//!
//! | Phase         | Command                                                                  |
//! |---------------|--------------------------------------------------------------------------|
//! | `SETCHAN`     | `SETCHAN <i> NEARBY <collection> DETECT enter,exit POINT <lat> <lon> <radius>` |
//! | `SET-POINTS`  | `SET <collection> <i> POINT <lat> <lon>`                                 |
//! | `SET-SAME`    | the same `SET` again, measuring overwrite cost                           |
//! | `SET-REVERSE` | `SET <collection> <i> POINT <lon> <lat>` with the coordinates swapped    |
//!
//! Points are generated once from a seeded RNG and shared by every phase, so
//! `SET-SAME` rewrites exactly the positions `SET-POINTS` wrote.

use crate::pool::ConnectionPool;
use crate::transport::{Command, Transport};
use crate::workload::Operation;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use clap::ValueEnum;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

impl Point {
    /// Uniformly random point: latitude in [-90, 90), longitude in [-180, 180).
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self {
            lat: rng.gen::<f64>() * 180.0 - 90.0,
            lon: rng.gen::<f64>() * 360.0 - 180.0,
        }
    }
}

/// Generate `count` random points.
pub fn generate_points<R: Rng>(count: usize, rng: &mut R) -> Vec<Point> {
    (0..count).map(|_| Point::random(rng)).collect()
}

/// The measured workload phases, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
pub enum PhaseKind {
    /// Register one geofence watch channel per point
    #[clap(name = "setchan")]
    SetChan,

    /// Set every object's position
    #[clap(name = "set-points")]
    SetPoints,

    /// Set every object to the position it already has
    #[clap(name = "set-same")]
    SetSame,

    /// Set every object with latitude and longitude swapped
    #[clap(name = "set-reverse")]
    SetReverse,
}

impl PhaseKind {
    pub const ALL: [PhaseKind; 4] = [
        PhaseKind::SetChan,
        PhaseKind::SetPoints,
        PhaseKind::SetSame,
        PhaseKind::SetReverse,
    ];

    /// Console label for the phase.
    pub fn label(&self) -> &'static str {
        match self {
            PhaseKind::SetChan => "SETCHAN",
            PhaseKind::SetPoints => "SET-POINTS",
            PhaseKind::SetSame => "SET-SAME",
            PhaseKind::SetReverse => "SET-REVERSE",
        }
    }

    /// Build the command for operation `index`.
    pub fn command(&self, index: usize, point: Point, collection: &str, radius: u64) -> Command {
        match self {
            PhaseKind::SetChan => Command::new("SETCHAN")
                .arg(index)
                .arg("NEARBY")
                .arg(collection)
                .arg("DETECT")
                .arg("enter,exit")
                .arg("POINT")
                .arg(point.lat)
                .arg(point.lon)
                .arg(radius),
            PhaseKind::SetPoints | PhaseKind::SetSame => Command::new("SET")
                .arg(collection)
                .arg(index)
                .arg("POINT")
                .arg(point.lat)
                .arg(point.lon),
            PhaseKind::SetReverse => Command::new("SET")
                .arg(collection)
                .arg(index)
                .arg("POINT")
                .arg(point.lon)
                .arg(point.lat),
        }
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Drives one phase against a connection pool.
///
/// Operation `index` sends the phase's command for `points[index]` on the
/// connection owned by `slot`. The last index also drains the whole pool,
/// and `complete` drains it once more after every worker has stopped, so no
/// commands carry over into the next phase.
pub struct PhaseOperation<T: Transport> {
    kind: PhaseKind,
    points: Arc<[Point]>,
    pool: Arc<ConnectionPool<T>>,
    collection: String,
    radius: u64,
}

impl<T: Transport> PhaseOperation<T> {
    pub fn new(
        kind: PhaseKind,
        points: Arc<[Point]>,
        pool: Arc<ConnectionPool<T>>,
        collection: impl Into<String>,
        radius: u64,
    ) -> Self {
        Self {
            kind,
            points,
            pool,
            collection: collection.into(),
            radius,
        }
    }
}

#[async_trait]
impl<T: Transport + 'static> Operation for PhaseOperation<T> {
    async fn execute(&self, index: usize, slot: usize) -> Result<()> {
        let point = *self
            .points
            .get(index)
            .ok_or_else(|| anyhow!("Operation index {} out of range", index))?;
        let conn = self
            .pool
            .get(slot)
            .ok_or_else(|| anyhow!("No connection for worker slot {}", slot))?;

        let command = self.kind.command(index, point, &self.collection, self.radius);
        conn.send(&command).await?;

        if index + 1 == self.points.len() {
            debug!("{}: last operation issued, draining all connections", self.kind);
            self.pool.flush_all().await?;
        }
        Ok(())
    }

    async fn complete(&self) -> Result<()> {
        self.pool.flush_all().await?;
        Ok(())
    }
}
