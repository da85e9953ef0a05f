use crate::phases::PhaseKind;
use clap::Parser;
use std::path::PathBuf;

/// Geofence Benchmark - pipelined throughput driver for Redis-protocol geofencing servers
#[derive(Parser, Debug, Clone)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Server address
    #[clap(short = 'a', long, default_value = crate::defaults::ADDRESS, help_heading = "Core Options")]
    pub addr: String,

    /// Number of geofences (operations per phase)
    #[clap(short = 'n', long, default_value_t = crate::defaults::NUM_FENCES, help_heading = "Core Options")]
    pub num_fences: usize,

    /// Geofence radius in meters
    #[clap(short = 'r', long, default_value_t = crate::defaults::RADIUS_METERS, help_heading = "Core Options")]
    pub radius: u64,

    /// Pipeline depth (commands per network flush)
    #[clap(short = 'P', long, default_value_t = crate::defaults::PIPELINE, help_heading = "Core Options")]
    pub pipeline: usize,

    /// Number of concurrent clients (one connection each)
    #[clap(short = 'c', long, default_value_t = crate::defaults::CLIENTS, help_heading = "Core Options")]
    pub clients: usize,

    /// Phases to run, always executed in canonical order
    #[clap(long, value_enum, default_values_t = PhaseKind::ALL.to_vec(), num_args = 1..)]
    pub phases: Vec<PhaseKind>,

    /// Collection that geofences and objects are written to
    #[clap(long, default_value = crate::defaults::COLLECTION)]
    pub collection: String,

    /// Seed for point generation (time-derived when omitted)
    #[clap(long)]
    pub seed: Option<u64>,

    /// Output file for results (JSON format)
    #[clap(short = 'o', long)]
    pub output_file: Option<PathBuf>,

    /// Verbose output
    #[clap(short = 'v', long, default_value_t = false)]
    pub verbose: bool,
}

// derive(Default) would not apply the clap defaults, so spell them out.
impl Default for Args {
    fn default() -> Self {
        Self {
            addr: crate::defaults::ADDRESS.to_string(),
            num_fences: crate::defaults::NUM_FENCES,
            radius: crate::defaults::RADIUS_METERS,
            pipeline: crate::defaults::PIPELINE,
            clients: crate::defaults::CLIENTS,
            phases: PhaseKind::ALL.to_vec(),
            collection: crate::defaults::COLLECTION.to_string(),
            seed: None,
            output_file: None,
            verbose: false,
        }
    }
}
