//! # Utility Functions and Helper Module
//!
//! Formatting helpers for the console report and validation functions for
//! user-supplied parameters.
//!
//! ## Key Functionality Categories
//!
//! - **Formatting**: Human-readable display of durations, counts, and rates
//! - **Validation**: Input parameter validation with clear error messages
//! - **System Information**: Clock and CPU detection
//!
//! ## Usage Examples
//!
//! ```rust
//! use geofence_bench::utils::*;
//! use std::time::Duration;
//!
//! # fn main() -> anyhow::Result<()> {
//! assert_eq!(format_duration(Duration::from_micros(1500)), "1.50ms");
//! assert_eq!(format_count(23000), "23,000");
//!
//! validate_pipeline_depth(10)?; // OK
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Upper bound on worker slots (and therefore connections).
pub const MAX_WORKERS: usize = 1024;

/// Get current timestamp as nanoseconds since Unix epoch
///
/// If the system time is before the Unix epoch (very rare), returns 0
/// rather than panicking.
pub fn current_timestamp_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// Format a duration in a human-readable way
///
/// ## Unit Selection Logic
///
/// - **Nanoseconds**: < 1,000 ns (e.g., "500ns")
/// - **Microseconds**: < 1,000,000 ns (e.g., "1.50μs")
/// - **Milliseconds**: < 1,000,000,000 ns (e.g., "25.75ms")
/// - **Seconds**: < 60 seconds (e.g., "5.25s")
/// - **Minutes and Hours**: For longer durations (e.g., "5m 30s", "2h 15m 30s")
///
/// ## Examples
///
/// ```rust
/// # use geofence_bench::utils::format_duration;
/// # use std::time::Duration;
/// assert_eq!(format_duration(Duration::from_nanos(750)), "750ns");
/// assert_eq!(format_duration(Duration::from_nanos(1250)), "1.25μs");
/// assert_eq!(format_duration(Duration::from_micros(2500)), "2.50ms");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ns = duration.as_nanos();

    if total_ns < 1_000 {
        format!("{}ns", total_ns)
    } else if total_ns < 1_000_000 {
        format!("{:.2}μs", total_ns as f64 / 1_000.0)
    } else if total_ns < 1_000_000_000 {
        format!("{:.2}ms", total_ns as f64 / 1_000_000.0)
    } else if total_ns < 60_000_000_000 {
        format!("{:.2}s", total_ns as f64 / 1_000_000_000.0)
    } else {
        let seconds = duration.as_secs();
        let minutes = seconds / 60;
        let remaining_seconds = seconds % 60;

        if minutes < 60 {
            format!("{}m {}s", minutes, remaining_seconds)
        } else {
            let hours = minutes / 60;
            let remaining_minutes = minutes % 60;
            format!("{}h {}m {}s", hours, remaining_minutes, remaining_seconds)
        }
    }
}

/// Format an integer with thousands separators ("23,000").
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Format an operation rate in a human-readable way
///
/// Uses decimal scaling (powers of 1000):
/// - < 1,000 (e.g., "750 ops/sec")
/// - Thousands (e.g., "15.50K ops/sec")
/// - Millions (e.g., "2.30M ops/sec")
///
/// ```rust
/// # use geofence_bench::utils::format_ops_rate;
/// assert_eq!(format_ops_rate(750.0), "750 ops/sec");
/// assert_eq!(format_ops_rate(15500.0), "15.50K ops/sec");
/// assert_eq!(format_ops_rate(2300000.0), "2.30M ops/sec");
/// ```
pub fn format_ops_rate(ops_per_second: f64) -> String {
    if ops_per_second < 1000.0 {
        format!("{:.0} ops/sec", ops_per_second)
    } else if ops_per_second < 1_000_000.0 {
        format!("{:.2}K ops/sec", ops_per_second / 1000.0)
    } else {
        format!("{:.2}M ops/sec", ops_per_second / 1_000_000.0)
    }
}

/// Validate that the pipeline depth is usable
///
/// A depth of 1 is the fully synchronous baseline; anything lower has no
/// meaning.
pub fn validate_pipeline_depth(depth: usize) -> Result<()> {
    if depth == 0 {
        anyhow::bail!("Pipeline depth must be at least 1");
    }
    Ok(())
}

/// Validate that concurrency level is reasonable
///
/// ## Validation Rules
///
/// - **Minimum**: 1 worker (prevent zero concurrency)
/// - **Maximum**: 1024 workers, each of which holds an open connection
pub fn validate_concurrency(concurrency: usize) -> Result<()> {
    if concurrency == 0 {
        anyhow::bail!("Concurrency cannot be zero");
    }
    if concurrency > MAX_WORKERS {
        anyhow::bail!(
            "Concurrency {} is too high (maximum {})",
            concurrency,
            MAX_WORKERS
        );
    }
    Ok(())
}

pub fn validate_operation_count(count: usize) -> Result<()> {
    if count == 0 {
        anyhow::bail!("Operation count cannot be zero");
    }
    Ok(())
}

pub fn validate_radius(radius: u64) -> Result<()> {
    if radius == 0 {
        anyhow::bail!("Geofence radius must be at least 1 meter");
    }
    Ok(())
}

/// Get the number of logical CPU cores available
pub fn get_cpu_cores() -> usize {
    num_cpus::get()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test duration formatting with various time scales
    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_nanos(500)), "500ns");
        assert_eq!(format_duration(Duration::from_nanos(1500)), "1.50μs");
        assert_eq!(format_duration(Duration::from_nanos(1_500_000)), "1.50ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(23000), "23,000");
        assert_eq!(format_count(1234567), "1,234,567");
    }

    /// Test rate formatting for throughput display
    #[test]
    fn test_format_ops_rate() {
        assert_eq!(format_ops_rate(500.0), "500 ops/sec");
        assert_eq!(format_ops_rate(1500.0), "1.50K ops/sec");
        assert_eq!(format_ops_rate(1500000.0), "1.50M ops/sec");
    }

    #[test]
    fn test_validate_pipeline_depth() {
        assert!(validate_pipeline_depth(1).is_ok());
        assert!(validate_pipeline_depth(1000).is_ok());
        assert!(validate_pipeline_depth(0).is_err());
    }

    /// Test concurrency validation rules
    #[test]
    fn test_validate_concurrency() {
        assert!(validate_concurrency(1).is_ok());
        assert!(validate_concurrency(20).is_ok());
        assert!(validate_concurrency(0).is_err());
        assert!(validate_concurrency(1025).is_err());
    }

    #[test]
    fn test_validate_operation_count_and_radius() {
        assert!(validate_operation_count(1).is_ok());
        assert!(validate_operation_count(0).is_err());
        assert!(validate_radius(5000).is_ok());
        assert!(validate_radius(0).is_err());
    }

    #[test]
    fn test_get_cpu_cores() {
        assert!(get_cpu_cores() > 0);
    }

    #[test]
    fn test_current_timestamp_is_after_2020() {
        assert!(current_timestamp_ns() > 1_577_836_800_000_000_000);
    }
}
