//! Number formatting utilities.

use std::time::Duration;

/// Format a MB/s figure, switching to GB/s above 1024 MB/s.
pub fn format_throughput(mb_per_sec: f64) -> String {
    if mb_per_sec >= 1024.0 {
        format!("{:.2} GB/s", mb_per_sec / 1024.0)
    } else if mb_per_sec >= 1.0 {
        format!("{mb_per_sec:.1} MB/s")
    } else if mb_per_sec > 0.0 {
        format!("{:.1} KB/s", mb_per_sec * 1024.0)
    } else {
        "-".to_string()
    }
}

/// Format duration as human-readable latency.
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();

    if nanos >= 1_000_000_000 {
        format!("{:.2} s", duration.as_secs_f64())
    } else if nanos >= 1_000_000 {
        format!("{:.2} ms", nanos as f64 / 1_000_000.0)
    } else if nanos >= 1_000 {
        format!("{:.2} us", nanos as f64 / 1_000.0)
    } else {
        format!("{nanos} ns")
    }
}

/// Format operations per second.
pub fn format_ops(ops_per_sec: f64) -> String {
    if ops_per_sec >= 1_000_000.0 {
        format!("{:.1}M ops/s", ops_per_sec / 1_000_000.0)
    } else if ops_per_sec >= 1_000.0 {
        format!("{:.1}k ops/s", ops_per_sec / 1_000.0)
    } else {
        format!("{ops_per_sec:.0} ops/s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_throughput() {
        assert_eq!(format_throughput(0.0), "-");
        assert_eq!(format_throughput(0.5), "512.0 KB/s");
        assert_eq!(format_throughput(250.0), "250.0 MB/s");
        assert_eq!(format_throughput(2048.0), "2.00 GB/s");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_nanos(500)), "500 ns");
        assert_eq!(format_duration(Duration::from_micros(500)), "500.00 us");
        assert_eq!(format_duration(Duration::from_millis(500)), "500.00 ms");
        assert_eq!(format_duration(Duration::from_secs(2)), "2.00 s");
    }

    #[test]
    fn test_format_ops() {
        assert_eq!(format_ops(12.4), "12 ops/s");
        assert_eq!(format_ops(2500.0), "2.5k ops/s");
        assert_eq!(format_ops(3_000_000.0), "3.0M ops/s");
    }
}
