use anyhow::Result;
use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Latency distribution of individual operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyMetrics {
    pub min_ns: u64,
    pub max_ns: u64,
    pub mean_ns: f64,
    pub median_ns: f64,
    pub std_dev_ns: f64,
    pub percentiles: Vec<PercentileValue>,
    pub total_samples: u64,
}

/// Percentile value pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PercentileValue {
    pub percentile: f64,
    pub value_ns: u64,
}

/// Throughput of one phase measured on the wall clock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThroughputMetrics {
    pub ops_per_second: f64,
    pub total_ops: u64,
    pub workers: usize,
    pub duration_ns: u64,
    /// Wall-clock time divided by operation count.
    pub ns_per_op: u64,
}

impl ThroughputMetrics {
    pub fn new(total_ops: u64, workers: usize, elapsed: Duration) -> Self {
        let duration_ns = elapsed.as_nanos() as u64;
        let duration_secs = elapsed.as_secs_f64();

        let ops_per_second = if duration_secs > 0.0 {
            total_ops as f64 / duration_secs
        } else {
            0.0
        };
        let ns_per_op = if total_ops > 0 {
            duration_ns / total_ops
        } else {
            0
        };

        Self {
            ops_per_second,
            total_ops,
            workers,
            duration_ns,
            ns_per_op,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_nanos(self.duration_ns)
    }
}

/// Latency collector using HDR histogram for accurate measurement
///
/// Each worker owns one collector; they are merged at the histogram level
/// once the phase is over.
pub struct LatencyCollector {
    histogram: Histogram<u64>,
}

impl LatencyCollector {
    pub fn new() -> Result<Self> {
        // 3 significant figures, auto-resizing range
        let histogram = Histogram::<u64>::new(3)?;
        Ok(Self { histogram })
    }

    /// Record a latency measurement
    pub fn record(&mut self, latency: Duration) -> Result<()> {
        let latency_ns = (latency.as_nanos() as u64).max(1);
        self.histogram.record(latency_ns)?;
        Ok(())
    }

    /// Fold another collector's samples into this one.
    pub fn merge(&mut self, other: &LatencyCollector) -> Result<()> {
        self.histogram.add(&other.histogram)?;
        Ok(())
    }

    pub fn sample_count(&self) -> u64 {
        self.histogram.len()
    }

    /// Summarize, or `None` if nothing was recorded.
    pub fn get_metrics(&self, percentiles: &[f64]) -> Option<LatencyMetrics> {
        if self.histogram.is_empty() {
            return None;
        }

        let percentiles = percentiles
            .iter()
            .map(|&p| PercentileValue {
                percentile: p,
                value_ns: self.histogram.value_at_percentile(p),
            })
            .collect();

        Some(LatencyMetrics {
            min_ns: self.histogram.min(),
            max_ns: self.histogram.max(),
            mean_ns: self.histogram.mean(),
            median_ns: self.histogram.value_at_percentile(50.0) as f64,
            std_dev_ns: self.histogram.stdev(),
            percentiles,
            total_samples: self.histogram.len(),
        })
    }
}

/// Combined measurements for one benchmark phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseMetrics {
    pub throughput: ThroughputMetrics,
    pub latency: Option<LatencyMetrics>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_collector() {
        let mut collector = LatencyCollector::new().unwrap();
        assert!(collector.get_metrics(&[50.0]).is_none());

        collector.record(Duration::from_micros(1)).unwrap();
        collector.record(Duration::from_micros(2)).unwrap();
        collector.record(Duration::from_micros(3)).unwrap();

        let metrics = collector.get_metrics(&[50.0, 99.0]).unwrap();
        assert_eq!(metrics.total_samples, 3);
        assert_eq!(metrics.percentiles.len(), 2);
        assert!(metrics.min_ns >= 990 && metrics.min_ns <= 1_010);
        assert!(metrics.max_ns >= 2_990 && metrics.max_ns <= 3_010);
        assert!(metrics.mean_ns > 0.0);
    }

    #[test]
    fn test_merge_combines_samples() {
        let mut a = LatencyCollector::new().unwrap();
        let mut b = LatencyCollector::new().unwrap();
        a.record(Duration::from_micros(10)).unwrap();
        b.record(Duration::from_micros(20)).unwrap();
        b.record(Duration::from_micros(30)).unwrap();

        a.merge(&b).unwrap();
        assert_eq!(a.sample_count(), 3);
        let metrics = a.get_metrics(&[100.0]).unwrap();
        assert!(metrics.max_ns >= 29_000);
    }

    #[test]
    fn test_zero_latency_is_recorded() {
        let mut collector = LatencyCollector::new().unwrap();
        collector.record(Duration::ZERO).unwrap();
        assert_eq!(collector.sample_count(), 1);
    }

    #[test]
    fn test_throughput_metrics() {
        let metrics = ThroughputMetrics::new(23_000, 20, Duration::from_millis(500));
        assert_eq!(metrics.total_ops, 23_000);
        assert_eq!(metrics.workers, 20);
        assert_eq!(metrics.duration_ns, 500_000_000);
        assert!((metrics.ops_per_second - 46_000.0).abs() < 1e-6);
        assert_eq!(metrics.ns_per_op, 21_739);
        assert_eq!(metrics.duration(), Duration::from_millis(500));
    }

    #[test]
    fn test_throughput_metrics_handles_zero_duration() {
        let metrics = ThroughputMetrics::new(0, 1, Duration::ZERO);
        assert_eq!(metrics.ops_per_second, 0.0);
        assert_eq!(metrics.ns_per_op, 0);
    }
}
