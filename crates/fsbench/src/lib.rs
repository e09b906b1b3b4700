//! Filesystem I/O benchmark harness.
//!
//! Characterizes one filesystem path with four sequential phases:
//!
//! - **Sequential write**: one large file per configured size, written in
//!   fixed-size chunks and flushed to stable storage
//! - **Sequential read**: the same files read back through a fixed buffer
//! - **Small-file read/append**: every small file read once, then appended to
//! - **Metadata**: create, chmod and delete a batch of scratch files
//!
//! Each phase yields a [`MetricRecord`] with throughput, IOPS and latency
//! percentiles from a bounded prefix sample of per-operation timings.
//!
//! # Usage
//!
//! ```text
//! fsbench --base-dir <DIR> --results-base-dir <DIR> [OPTIONS]
//!
//! Options:
//!       --large-file-sizes-gb <N,..>   Large file sizes (default: 1)
//!       --skip-generate                Reuse existing fixtures
//!       --generate-only                Create fixtures and exit
//!       --system-info                  Print host information and exit
//!       --run-id <ID>                  Output file suffix
//!   -v, --verbose                      Verbose output
//! ```
//!
//! Every option is also read from the environment (`BASE_DIR`,
//! `LARGE_FILE_SIZES_GB`, ...) and from a `.env` file.

pub mod bench;
pub mod cli;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod logging;
pub mod results;
pub mod system_info;
pub mod timer;

pub use bench::{BenchmarkRunner, Phase, PhaseProgress, SamplingPolicy};
pub use cli::Cli;
pub use config::{BenchmarkConfig, ConfigError, FileSize};
pub use error::{BenchError, ErrorKind};
pub use results::{MetricRecord, ResultsAggregate};
pub use system_info::SystemInfo;
pub use timer::Timer;
