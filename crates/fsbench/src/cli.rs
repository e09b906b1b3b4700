//! Command-line interface.
//!
//! Every tuning option can also come from the environment (and therefore from
//! a `.env` file loaded at startup).

use crate::config::{BenchmarkConfig, ConfigError, FileSize};
use clap::Parser;
use std::path::PathBuf;

/// Filesystem I/O benchmark.
///
/// Measures sequential write/read throughput on large files, read/append
/// behavior on many small files and create/chmod/delete metadata churn, and
/// reports throughput, IOPS and latency percentiles.
#[derive(Parser, Debug)]
#[command(name = "fsbench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Root directory for the benchmark fixtures.
    #[arg(long, env = "BASE_DIR", value_name = "DIR")]
    pub base_dir: PathBuf,

    /// Subdirectory of the base dir for large files.
    #[arg(long, env = "LARGE_FILES_SUBDIR", default_value = "large_files")]
    pub large_files_subdir: PathBuf,

    /// Subdirectory of the base dir for small files.
    #[arg(long, env = "SMALL_FILES_SUBDIR", default_value = "small_files")]
    pub small_files_subdir: PathBuf,

    /// Root directory for results, charts and logs.
    #[arg(long, env = "RESULTS_BASE_DIR", value_name = "DIR")]
    pub results_base_dir: PathBuf,

    /// Subdirectory of the results dir for CSV/JSON output.
    #[arg(long, env = "RESULTS_SUBDIR", default_value = "results")]
    pub results_subdir: PathBuf,

    /// Subdirectory of the results dir for charts.
    #[arg(long, env = "GRAPHS_SUBDIR", default_value = "graphs")]
    pub graphs_subdir: PathBuf,

    /// Subdirectory of the results dir for per-run logs.
    #[arg(long, env = "LOG_DIR", default_value = "logs")]
    pub log_dir: PathBuf,

    /// Large file sizes in GB, comma-separated.
    #[arg(long, env = "LARGE_FILE_SIZES_GB", value_delimiter = ',', default_value = "1")]
    pub large_file_sizes_gb: Vec<u64>,

    /// Number of small files to generate.
    #[arg(long, env = "SMALL_FILE_COUNT", default_value = "1000")]
    pub small_file_count: usize,

    /// Small file size range in KB as `min,max`.
    #[arg(long, env = "SMALL_FILE_SIZE_RANGE_KB", default_value = "4,64")]
    pub small_file_size_range_kb: String,

    /// Sequential write chunk size in MB.
    #[arg(long, env = "SEQUENTIAL_WRITE_SIZE_MB", default_value = "100")]
    pub sequential_write_size_mb: u64,

    /// Bytes appended per small file, in KB.
    #[arg(long, env = "RANDOM_APPEND_SIZE_KB", default_value = "4")]
    pub random_append_size_kb: u64,

    /// Number of files cycled through create/chmod/delete.
    #[arg(long, env = "METADATA_OPERATIONS_COUNT", default_value = "1000")]
    pub metadata_operations_count: usize,

    /// Sequential read buffer size in bytes.
    #[arg(long, env = "READ_BUFFER_SIZE", default_value = "4194304")]
    pub read_buffer_size: usize,

    /// Latency percentiles to report, comma-separated.
    #[arg(long, env = "LATENCY_PERCENTILES", value_delimiter = ',', default_value = "50,95,99")]
    pub latency_percentiles: Vec<f64>,

    /// Maximum latency samples kept per phase.
    #[arg(long, env = "LATENCY_SAMPLES", default_value = "1000")]
    pub latency_samples: usize,

    /// Run identifier used in output file names (default: local time, YYYYMMDD_HHMMSS).
    #[arg(long)]
    pub run_id: Option<String>,

    /// Generate the fixtures and exit.
    #[arg(long, conflicts_with_all = ["skip_generate", "system_info"])]
    pub generate_only: bool,

    /// Use existing fixtures instead of generating them.
    #[arg(long)]
    pub skip_generate: bool,

    /// Print system information and exit.
    #[arg(long)]
    pub system_info: bool,

    /// Disable colored output.
    #[arg(long)]
    pub no_color: bool,

    /// Verbose output.
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// What the binary does after startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Generate fixtures, run every benchmark, export results.
    Full { generate: bool },
    GenerateOnly,
    SystemInfo,
}

impl Cli {
    pub fn mode(&self) -> Mode {
        if self.system_info {
            Mode::SystemInfo
        } else if self.generate_only {
            Mode::GenerateOnly
        } else {
            Mode::Full {
                generate: !self.skip_generate,
            }
        }
    }

    /// Explicit run id, or the current local time.
    pub fn run_id(&self) -> String {
        self.run_id
            .clone()
            .unwrap_or_else(|| chrono::Local::now().format("%Y%m%d_%H%M%S").to_string())
    }

    /// Build and validate the benchmark configuration.
    pub fn to_config(&self) -> Result<BenchmarkConfig, ConfigError> {
        let mut config = BenchmarkConfig::new(&self.base_dir, &self.results_base_dir);
        config.large_files_dir = self.base_dir.join(&self.large_files_subdir);
        config.small_files_dir = self.base_dir.join(&self.small_files_subdir);
        config.results_dir = self.results_base_dir.join(&self.results_subdir);
        config.graphs_dir = self.results_base_dir.join(&self.graphs_subdir);
        config.log_dir = self.results_base_dir.join(&self.log_dir);

        config.large_file_sizes = self
            .large_file_sizes_gb
            .iter()
            .map(|&gb| FileSize::from_gb(gb))
            .collect();
        config.small_file_count = self.small_file_count;
        config.small_file_size_range_kb = parse_range(&self.small_file_size_range_kb)?;
        config.write_chunk_size = FileSize::from_mb(self.sequential_write_size_mb);
        config.read_buffer_size = self.read_buffer_size;
        config.random_append_size = FileSize::from_kb(self.random_append_size_kb);
        config.metadata_operations_count = self.metadata_operations_count;
        config.latency_percentiles.clone_from(&self.latency_percentiles);
        config.latency_sample_cap = self.latency_samples;

        config.validate()?;
        Ok(config)
    }
}

/// Parse `min,max`.
fn parse_range(value: &str) -> Result<(u64, u64), ConfigError> {
    let parse_error = || ConfigError::Parse {
        field: "small file size range",
        value: value.to_string(),
    };
    let (min, max) = value.split_once(',').ok_or_else(parse_error)?;
    let min = min.trim().parse().map_err(|_| parse_error())?;
    let max = max.trim().parse().map_err(|_| parse_error())?;
    Ok((min, max))
}
