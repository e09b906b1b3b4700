//! Small-file read/append benchmark.

use crate::bench::{LatencySampler, Phase, SamplingPolicy};
use crate::config::FileSize;
use crate::error::{BenchError, Result};
use crate::results::MetricRecord;
use crate::timer::Timer;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::Span;

/// Reads every small file once, then appends a payload to every file once.
///
/// Both sub-phases walk the same file list in listing order. Each keeps its
/// own prefix sample and the two are reported as one blended distribution.
pub struct RandomRwBenchmark {
    append_size: FileSize,
    sampling: SamplingPolicy,
    timer: Timer,
    span: Span,
}

impl RandomRwBenchmark {
    /// Create a new small-file read/append benchmark.
    pub fn new(append_size: FileSize, sampling: SamplingPolicy, timer: Timer, span: Span) -> Self {
        Self {
            append_size,
            sampling,
            timer,
            span,
        }
    }

    /// Run both sub-phases over the `file_*.txt` files in `dir`.
    pub fn run(&self, dir: &Path) -> Result<MetricRecord> {
        let result = self.run_inner(dir);
        match &result {
            Ok(record) => tracing::info!(
                parent: &self.span,
                test = Phase::RandomReadWrite.key(),
                elapsed_sec = record.elapsed_seconds(),
                operations = record.operations_count,
                ops_per_sec = record.iops,
                "benchmark_completed"
            ),
            Err(e) => tracing::error!(
                parent: &self.span,
                test = Phase::RandomReadWrite.key(),
                error = %e,
                "benchmark_failed"
            ),
        }
        result
    }

    fn run_inner(&self, dir: &Path) -> Result<MetricRecord> {
        let files = list_small_files(dir)?;
        if files.is_empty() {
            return Err(BenchError::not_found("small test files", dir));
        }

        tracing::info!(
            parent: &self.span,
            test = Phase::RandomReadWrite.key(),
            dir_path = %dir.display(),
            file_count = files.len(),
            "benchmark_started"
        );

        let append_len = usize::try_from(self.append_size.bytes()).unwrap_or(usize::MAX);
        let mut payload = vec![0u8; append_len];
        ChaCha8Rng::seed_from_u64(files.len() as u64).fill_bytes(&mut payload);

        let mut read_samples = self.sampling.sampler();
        let mut write_samples = self.sampling.sampler();

        let start = self.timer.start();

        for (index, path) in files.iter().enumerate() {
            let op_start = self.timer.start();
            let content = fs::read(path).map_err(|e| BenchError::io("read", path, e))?;
            let latency = self.timer.elapsed(op_start);
            std::hint::black_box(&content);

            if read_samples.wants(index) {
                read_samples.record(latency);
            }
        }

        for (index, path) in files.iter().enumerate() {
            let op_start = self.timer.start();
            OpenOptions::new()
                .append(true)
                .open(path)
                .and_then(|mut file| file.write_all(&payload))
                .map_err(|e| BenchError::io("append", path, e))?;
            let latency = self.timer.elapsed(op_start);

            if write_samples.wants(index) {
                write_samples.record(latency);
            }
        }

        let elapsed = self.timer.elapsed(start);

        let mut blended = LatencySampler::new(read_samples.len() + write_samples.len());
        blended.merge(read_samples);
        blended.merge(write_samples);

        MetricRecord::measured(
            Phase::RandomReadWrite.name(),
            elapsed,
            0,
            files.len() as u64 * 2,
            self.sampling.summarize(&blended),
        )
    }
}

/// `file_*.txt` entries of `dir`, in the order the filesystem lists them.
fn list_small_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| BenchError::open_fixture("small files directory", dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| BenchError::io("read_dir", dir, e))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("file_") && name.ends_with(".txt") {
            files.push(entry.path());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn bench(append: FileSize, cap: usize) -> RandomRwBenchmark {
        RandomRwBenchmark::new(
            append,
            SamplingPolicy::new(cap, vec![50.0, 95.0, 99.0]),
            Timer::new(),
            Span::none(),
        )
    }

    fn populate(dir: &Path, count: usize) -> HashMap<PathBuf, u64> {
        (0..count)
            .map(|i| {
                let path = dir.join(format!("file_{i}.txt"));
                let len = 512 * (i as u64 + 1);
                fs::write(&path, vec![b'x'; usize::try_from(len).unwrap()]).unwrap();
                (path, len)
            })
            .collect()
    }

    #[test]
    fn test_counts_two_operations_per_file_and_appends_payload() {
        let dir = TempDir::new().unwrap();
        let before = populate(dir.path(), 12);

        let record = bench(FileSize::from_kb(4), 5).run(dir.path()).unwrap();

        assert_eq!(record.test_name, "Random Read/Write Small Files");
        assert_eq!(record.operations_count, 24);
        assert!(record.iops > 0.0);
        assert!(record.throughput_mbps.abs() < f64::EPSILON);
        for (path, len) in before {
            assert_eq!(fs::metadata(&path).unwrap().len(), len + 4096, "{}", path.display());
        }
    }

    #[test]
    fn test_ignores_unrelated_files() {
        let dir = TempDir::new().unwrap();
        populate(dir.path(), 3);
        fs::write(dir.path().join("meta_0.txt"), b"").unwrap();
        fs::write(dir.path().join("file_9.bin"), b"").unwrap();

        let record = bench(FileSize::from_bytes(10), 5).run(dir.path()).unwrap();
        assert_eq!(record.operations_count, 6);
        assert_eq!(fs::metadata(dir.path().join("meta_0.txt")).unwrap().len(), 0);
    }

    #[test]
    fn test_samples_blend_reads_and_writes() {
        let dir = TempDir::new().unwrap();
        populate(dir.path(), 4);

        // Cap above N: both sub-phases contribute all files.
        let record = bench(FileSize::from_bytes(16), 100).run(dir.path()).unwrap();
        assert_eq!(record.latency_percentiles.len(), 3);
    }

    #[test]
    fn test_empty_directory_is_precondition_failure() {
        let dir = TempDir::new().unwrap();
        let err = bench(FileSize::from_kb(4), 5).run(dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionNotFound);
    }

    #[test]
    fn test_missing_directory_is_precondition_failure() {
        let dir = TempDir::new().unwrap();
        let err = bench(FileSize::from_kb(4), 5)
            .run(&dir.path().join("small_files"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionNotFound);
    }
}
