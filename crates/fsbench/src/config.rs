//! Configuration types for the benchmark harness.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// Errors found while validating a [`BenchmarkConfig`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("at least one large file size is required")]
    NoFileSizes,

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("large file size {0} is listed more than once")]
    DuplicateFileSize(FileSize),

    #[error("at least one latency percentile is required")]
    NoPercentiles,

    #[error("latency percentile {0} is outside [0, 100]")]
    PercentileOutOfRange(f64),

    #[error("latency percentile {0} is listed more than once")]
    DuplicatePercentile(f64),

    #[error("small file size range {min}..={max} KB is inverted")]
    InvertedRange { min: u64, max: u64 },

    #[error("invalid value for {field}: {value}")]
    Parse { field: &'static str, value: String },
}

/// Size of a large benchmark file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileSize(u64);

impl FileSize {
    /// Size from a byte count.
    pub const fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    /// Size from whole kibibytes.
    pub const fn from_kb(kb: u64) -> Self {
        Self(kb * KIB)
    }

    /// Size from whole mebibytes.
    pub const fn from_mb(mb: u64) -> Self {
        Self(mb * MIB)
    }

    /// Size from whole gibibytes.
    pub const fn from_gb(gb: u64) -> Self {
        Self(gb * GIB)
    }

    /// Size in bytes.
    pub const fn bytes(self) -> u64 {
        self.0
    }

    /// Size in (binary) megabytes.
    pub fn megabytes(self) -> f64 {
        self.0 as f64 / MIB as f64
    }

    /// Compact label in the largest whole unit: `1GB`, `512MB`, `64KB`, `100B`.
    pub fn label(self) -> String {
        match self.0 {
            b if b >= GIB && b % GIB == 0 => format!("{}GB", b / GIB),
            b if b >= MIB && b % MIB == 0 => format!("{}MB", b / MIB),
            b if b >= KIB && b % KIB == 0 => format!("{}KB", b / KIB),
            b => format!("{b}B"),
        }
    }
}

impl fmt::Display for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Configuration for a benchmark run.
///
/// Built once at startup and validated eagerly; the runner never reads the
/// environment itself.
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Directory holding the `file_<size>.bin` fixtures.
    pub large_files_dir: PathBuf,
    /// Directory holding the `file_<i>.txt` fixtures and the metadata scratch files.
    pub small_files_dir: PathBuf,
    /// Directory for CSV/JSON exports.
    pub results_dir: PathBuf,
    /// Directory for chart output.
    pub graphs_dir: PathBuf,
    /// Directory for per-run log files.
    pub log_dir: PathBuf,
    /// Large file sizes, benchmarked in this order.
    pub large_file_sizes: Vec<FileSize>,
    /// Number of small files to generate.
    pub small_file_count: usize,
    /// Inclusive small file size range in KB.
    pub small_file_size_range_kb: (u64, u64),
    /// Payload size of one sequential-write chunk.
    pub write_chunk_size: FileSize,
    /// Buffer size for sequential reads, in bytes.
    pub read_buffer_size: usize,
    /// Bytes appended to each small file in the random R/W phase.
    pub random_append_size: FileSize,
    /// Number of files cycled by the metadata phase.
    pub metadata_operations_count: usize,
    /// Percentile ranks reported for latency, in [0, 100].
    pub latency_percentiles: Vec<f64>,
    /// Maximum number of latency samples kept per phase.
    pub latency_sample_cap: usize,
}

impl BenchmarkConfig {
    /// Configuration rooted at `base_dir` (fixtures) and `results_base` (outputs),
    /// with the default tuning values.
    pub fn new(base_dir: &Path, results_base: &Path) -> Self {
        Self {
            large_files_dir: base_dir.join("large_files"),
            small_files_dir: base_dir.join("small_files"),
            results_dir: results_base.join("results"),
            graphs_dir: results_base.join("graphs"),
            log_dir: results_base.join("logs"),
            large_file_sizes: vec![FileSize::from_gb(1)],
            small_file_count: 1000,
            small_file_size_range_kb: (4, 64),
            write_chunk_size: FileSize::from_mb(100),
            read_buffer_size: 4 * 1024 * 1024,
            random_append_size: FileSize::from_kb(4),
            metadata_operations_count: 1000,
            latency_percentiles: vec![50.0, 95.0, 99.0],
            latency_sample_cap: 1000,
        }
    }

    /// Check every field; called once before any benchmark runs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.large_file_sizes.is_empty() {
            return Err(ConfigError::NoFileSizes);
        }
        for (i, &size) in self.large_file_sizes.iter().enumerate() {
            if size.bytes() == 0 {
                return Err(ConfigError::Zero { field: "large file size" });
            }
            if self.large_file_sizes[..i].contains(&size) {
                return Err(ConfigError::DuplicateFileSize(size));
            }
        }
        if self.write_chunk_size.bytes() == 0 {
            return Err(ConfigError::Zero { field: "sequential write chunk size" });
        }
        if self.read_buffer_size == 0 {
            return Err(ConfigError::Zero { field: "read buffer size" });
        }
        if self.latency_sample_cap == 0 {
            return Err(ConfigError::Zero { field: "latency sample cap" });
        }

        let (min, max) = self.small_file_size_range_kb;
        if min > max {
            return Err(ConfigError::InvertedRange { min, max });
        }

        if self.latency_percentiles.is_empty() {
            return Err(ConfigError::NoPercentiles);
        }
        for (i, &rank) in self.latency_percentiles.iter().enumerate() {
            if !(0.0..=100.0).contains(&rank) {
                return Err(ConfigError::PercentileOutOfRange(rank));
            }
            if self.latency_percentiles[..i].contains(&rank) {
                return Err(ConfigError::DuplicatePercentile(rank));
            }
        }

        Ok(())
    }

    /// Path of the large fixture for `size`.
    pub fn large_file_path(&self, size: FileSize) -> PathBuf {
        self.large_files_dir.join(format!("file_{}.bin", size.label()))
    }

    /// Path of the `index`-th small fixture.
    pub fn small_file_path(&self, index: usize) -> PathBuf {
        self.small_files_dir.join(format!("file_{index}.txt"))
    }

    /// Per-run log directory.
    pub fn run_log_dir(&self, run_id: &str) -> PathBuf {
        self.log_dir.join(run_id)
    }

    /// All directories the binary creates before a run.
    pub fn directories(&self) -> [&Path; 5] {
        [
            &self.large_files_dir,
            &self.small_files_dir,
            &self.results_dir,
            &self.graphs_dir,
            &self.log_dir,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BenchmarkConfig {
        BenchmarkConfig::new(Path::new("/data"), Path::new("/out"))
    }

    #[test]
    fn test_file_size_labels() {
        assert_eq!(FileSize::from_gb(1).label(), "1GB");
        assert_eq!(FileSize::from_gb(4).label(), "4GB");
        assert_eq!(FileSize::from_mb(512).label(), "512MB");
        assert_eq!(FileSize::from_mb(1536).label(), "1536MB");
        assert_eq!(FileSize::from_kb(64).label(), "64KB");
        assert_eq!(FileSize::from_bytes(100).label(), "100B");
    }

    #[test]
    fn test_fixture_paths() {
        let config = config();
        assert_eq!(
            config.large_file_path(FileSize::from_gb(2)),
            PathBuf::from("/data/large_files/file_2GB.bin")
        );
        assert_eq!(
            config.small_file_path(7),
            PathBuf::from("/data/small_files/file_7.txt")
        );
    }

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(config().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_empty_sizes() {
        let mut config = config();
        config.large_file_sizes.clear();
        assert_eq!(config.validate(), Err(ConfigError::NoFileSizes));
    }

    #[test]
    fn test_rejects_repeated_sizes() {
        let mut config = config();
        config.large_file_sizes = vec![FileSize::from_kb(256), FileSize::from_mb(1), FileSize::from_kb(256)];
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateFileSize(FileSize::from_kb(256)))
        );
        assert_eq!(
            config.validate().unwrap_err().to_string(),
            "large file size 256KB is listed more than once"
        );
    }

    #[test]
    fn test_rejects_zero_sample_cap() {
        let mut config = config();
        config.latency_sample_cap = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::Zero { field: "latency sample cap" })
        );
    }

    #[test]
    fn test_rejects_bad_percentiles() {
        let mut config = config();
        config.latency_percentiles = vec![50.0, 101.0];
        assert_eq!(config.validate(), Err(ConfigError::PercentileOutOfRange(101.0)));

        config.latency_percentiles = vec![50.0, 95.0, 50.0];
        assert_eq!(config.validate(), Err(ConfigError::DuplicatePercentile(50.0)));

        config.latency_percentiles.clear();
        assert_eq!(config.validate(), Err(ConfigError::NoPercentiles));
    }

    #[test]
    fn test_rejects_inverted_range() {
        let mut config = config();
        config.small_file_size_range_kb = (64, 4);
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvertedRange { min: 64, max: 4 })
        );
    }
}
