use crate::{metrics::PhaseMetrics, phases::PhaseKind, pipeline::PipelineStats};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Complete results of one benchmark run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResults {
    pub test_config: TestConfiguration,
    pub phases: Vec<PhaseResult>,
    /// Per-connection counters taken after the last phase, in slot order.
    pub connections: Vec<PipelineStats>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub test_duration: Duration,
    pub system_info: SystemInfo,
}

/// Test configuration used for the benchmark
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestConfiguration {
    pub addr: String,
    pub num_fences: usize,
    pub radius: u64,
    pub pipeline: usize,
    pub clients: usize,
    pub collection: String,
    pub seed: u64,
}

/// Measurements for one phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseResult {
    pub phase: PhaseKind,
    pub metrics: PhaseMetrics,
}

/// System information for reproducibility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub architecture: String,
    pub cpu_cores: usize,
    pub benchmark_version: String,
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            cpu_cores: crate::utils::get_cpu_cores(),
            benchmark_version: crate::VERSION.to_string(),
        }
    }
}

impl BenchmarkResults {
    pub fn new(test_config: TestConfiguration) -> Self {
        Self {
            test_config,
            phases: Vec::new(),
            connections: Vec::new(),
            timestamp: chrono::Utc::now(),
            test_duration: Duration::ZERO,
            system_info: SystemInfo::default(),
        }
    }

    pub fn add_phase(&mut self, phase: PhaseKind, metrics: PhaseMetrics) {
        self.phases.push(PhaseResult { phase, metrics });
    }

    /// Operations issued across every phase.
    pub fn total_ops(&self) -> u64 {
        self.phases
            .iter()
            .map(|p| p.metrics.throughput.total_ops)
            .sum()
    }
}

/// Writes results to the configured JSON file, if any
pub struct ResultsManager {
    output_file: Option<PathBuf>,
}

impl ResultsManager {
    pub fn new(output_file: Option<&Path>) -> Self {
        Self {
            output_file: output_file.map(Path::to_path_buf),
        }
    }

    /// Write `results` as pretty JSON. A no-op without an output file.
    pub fn write(&self, results: &BenchmarkResults) -> Result<()> {
        let Some(path) = self.output_file.as_ref() else {
            debug!("No output file configured, skipping JSON results");
            return Ok(());
        };

        let file = File::create(path)
            .with_context(|| format!("Failed to create results file {:?}", path))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, results)?;
        writeln!(writer)?;
        writer.flush()?;

        info!("Results written to {:?}", path);
        Ok(())
    }
}
