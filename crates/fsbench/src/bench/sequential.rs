//! Sequential large-file write and read benchmarks.

use crate::bench::{LatencySampler, Phase, SamplingPolicy};
use crate::config::FileSize;
use crate::error::{BenchError, Result};
use crate::results::MetricRecord;
use crate::timer::Timer;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::Span;

/// Seed for chunk payloads; the size is mixed in so each file differs.
const PAYLOAD_SEED: u64 = 0x5eed_f11e;

/// Sequential write benchmark.
///
/// Writes `size / chunk` full chunks, sampling the latency of the first
/// `sample_cap` of them, then any sub-chunk remainder as an unsampled tail
/// write so the file ends up exactly `size` bytes.
pub struct SequentialWriteBenchmark {
    chunk_size: FileSize,
    sampling: SamplingPolicy,
    timer: Timer,
    span: Span,
}

impl SequentialWriteBenchmark {
    /// Create a new sequential write benchmark.
    pub fn new(chunk_size: FileSize, sampling: SamplingPolicy, timer: Timer, span: Span) -> Self {
        Self {
            chunk_size,
            sampling,
            timer,
            span,
        }
    }

    /// Write `size` bytes to `path`, replacing any previous content.
    pub fn run(&self, path: &Path, size: FileSize) -> Result<MetricRecord> {
        let test_name = format!("{} {}", Phase::SequentialWrite.name(), size.label());
        tracing::info!(
            parent: &self.span,
            test = Phase::SequentialWrite.key(),
            file_path = %path.display(),
            size_mb = size.megabytes(),
            chunk_mb = self.chunk_size.megabytes(),
            "benchmark_started"
        );

        let result = self.write_file(path, size, &test_name);
        match &result {
            Ok(record) => tracing::info!(
                parent: &self.span,
                test = Phase::SequentialWrite.key(),
                elapsed_sec = record.elapsed_seconds(),
                throughput_mbps = record.throughput_mbps,
                chunks = record.operations_count,
                "benchmark_completed"
            ),
            Err(e) => tracing::error!(
                parent: &self.span,
                test = Phase::SequentialWrite.key(),
                error = %e,
                "benchmark_failed"
            ),
        }
        result
    }

    fn write_file(&self, path: &Path, size: FileSize, test_name: &str) -> Result<MetricRecord> {
        let dir = parent_dir(path);
        if !dir.is_dir() {
            return Err(BenchError::not_found("large files directory", dir));
        }

        let total = size.bytes();
        let chunk = self.chunk_size.bytes();
        let full_chunks = total / chunk;
        // tail < chunk, and the buffer holds min(chunk, total) bytes
        #[allow(clippy::cast_possible_truncation)]
        let tail = (total % chunk) as usize;

        // One chunk of payload, generated before the clock starts.
        let buffer_len = usize::try_from(chunk.min(total))
            .map_err(|_| BenchError::io("allocate", path, io::Error::from(io::ErrorKind::OutOfMemory)))?;
        let mut buffer = vec![0u8; buffer_len];
        ChaCha8Rng::seed_from_u64(PAYLOAD_SEED ^ total).fill_bytes(&mut buffer);

        let start = self.timer.start();

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| BenchError::io("open", path, e))?;

        let sampler = self
            .write_chunks(&mut file, &mut buffer, full_chunks, tail)
            .map_err(|e| BenchError::io("write", path, e))?;

        file.sync_all().map_err(|e| BenchError::io("fsync", path, e))?;
        drop(file);

        let elapsed = self.timer.elapsed(start);
        MetricRecord::measured(
            test_name,
            elapsed,
            total,
            full_chunks,
            self.sampling.summarize(&sampler),
        )
    }

    /// Write `full_chunks` copies of `buffer`, each stamped with its index,
    /// then the first `tail` bytes once. Only full chunks are sampled.
    fn write_chunks(
        &self,
        out: &mut impl Write,
        buffer: &mut [u8],
        full_chunks: u64,
        tail: usize,
    ) -> io::Result<LatencySampler> {
        let stamp_len = buffer.len().min(8);
        let mut sampler = self.sampling.sampler();

        for index in 0..full_chunks {
            buffer[..stamp_len].copy_from_slice(&index.to_le_bytes()[..stamp_len]);

            let chunk_start = self.timer.start();
            out.write_all(buffer)?;
            let latency = self.timer.elapsed(chunk_start);

            if let Ok(index) = usize::try_from(index)
                && sampler.wants(index)
            {
                sampler.record(latency);
            }

            if (index + 1) % 10 == 0 {
                tracing::debug!(
                    parent: &self.span,
                    chunk = index + 1,
                    total_chunks = full_chunks,
                    "sequential_write_progress"
                );
            }
        }

        if tail > 0 {
            out.write_all(&buffer[..tail])?;
        }
        Ok(sampler)
    }
}

/// Directory a fixture lives in; a bare file name lives in `.`.
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// Sequential read benchmark.
///
/// One operation is one buffer fill; the final zero-byte read is not counted, so a file
/// of `n` bytes takes `ceil(n / buffer_size)` operations.
pub struct SequentialReadBenchmark {
    buffer_size: usize,
    sampling: SamplingPolicy,
    timer: Timer,
    span: Span,
}

impl SequentialReadBenchmark {
    /// Create a new sequential read benchmark.
    pub fn new(buffer_size: usize, sampling: SamplingPolicy, timer: Timer, span: Span) -> Self {
        Self {
            buffer_size,
            sampling,
            timer,
            span,
        }
    }

    /// Read `path` to EOF. `size` names the record; the data volume is what
    /// was actually read.
    pub fn run(&self, path: &Path, size: FileSize) -> Result<MetricRecord> {
        let test_name = format!("{} {}", Phase::SequentialRead.name(), size.label());

        let result = self.read_file(path, &test_name);
        match &result {
            Ok(record) => tracing::info!(
                parent: &self.span,
                test = Phase::SequentialRead.key(),
                elapsed_sec = record.elapsed_seconds(),
                throughput_mbps = record.throughput_mbps,
                reads = record.operations_count,
                "benchmark_completed"
            ),
            Err(e) => tracing::error!(
                parent: &self.span,
                test = Phase::SequentialRead.key(),
                error = %e,
                "benchmark_failed"
            ),
        }
        result
    }

    fn read_file(&self, path: &Path, test_name: &str) -> Result<MetricRecord> {
        let metadata =
            fs::metadata(path).map_err(|e| BenchError::open_fixture("large test file", path, e))?;
        tracing::info!(
            parent: &self.span,
            test = Phase::SequentialRead.key(),
            file_path = %path.display(),
            file_size_bytes = metadata.len(),
            buffer_size = self.buffer_size,
            "benchmark_started"
        );

        let mut buffer = vec![0u8; self.buffer_size];
        let mut sampler = self.sampling.sampler();
        let mut operations: u64 = 0;
        let mut total_read: u64 = 0;

        let start = self.timer.start();

        let mut file =
            File::open(path).map_err(|e| BenchError::open_fixture("large test file", path, e))?;

        let mut index = 0usize;
        loop {
            let read_start = self.timer.start();
            let n = fill_buffer(&mut file, &mut buffer)
                .map_err(|e| BenchError::io("read", path, e))?;
            let latency = self.timer.elapsed(read_start);

            if n == 0 {
                break;
            }
            if sampler.wants(index) {
                sampler.record(latency);
            }
            std::hint::black_box(&buffer[..n]);

            index += 1;
            operations += 1;
            total_read += n as u64;
        }

        drop(file);
        let elapsed = self.timer.elapsed(start);

        MetricRecord::measured(
            test_name,
            elapsed,
            total_read,
            operations,
            self.sampling.summarize(&sampler),
        )
    }
}

/// Read until `buf` is full or EOF; returns the number of bytes read.
fn fill_buffer(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn sampling(cap: usize) -> SamplingPolicy {
        SamplingPolicy::new(cap, vec![50.0, 95.0, 99.0])
    }

    fn writer(chunk: FileSize, cap: usize) -> SequentialWriteBenchmark {
        SequentialWriteBenchmark::new(chunk, sampling(cap), Timer::new(), Span::none())
    }

    fn reader(buffer: usize, cap: usize) -> SequentialReadBenchmark {
        SequentialReadBenchmark::new(buffer, sampling(cap), Timer::new(), Span::none())
    }

    #[test]
    fn test_write_counts_full_chunks_and_keeps_exact_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file_1MB.bin");

        // 1024 KB in 100 KB chunks: 10 full chunks plus a 24 KB tail.
        let record = writer(FileSize::from_kb(100), 5)
            .run(&path, FileSize::from_mb(1))
            .unwrap();

        assert_eq!(record.test_name, "Sequential Write 1MB");
        assert_eq!(record.operations_count, 10);
        assert_eq!(fs::metadata(&path).unwrap().len(), 1024 * 1024);
        assert!((record.file_size_mb - 1.0).abs() < f64::EPSILON);
        assert!(record.elapsed_seconds() > 0.0);
        assert!(record.throughput_mbps > 0.0);
        let labels: Vec<_> = record.latency_percentiles.labels().collect();
        assert_eq!(labels, ["p50", "p95", "p99"]);
    }

    /// Advances a mock clock by `n` ms on the `n`-th write.
    struct SlowingWriter {
        mock: Arc<quanta::Mock>,
        writes: u64,
        bytes: usize,
    }

    impl Write for SlowingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes += 1;
            self.bytes += buf.len();
            self.mock.increment(Duration::from_millis(self.writes));
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_samples_only_first_chunks() {
        let (clock, mock) = quanta::Clock::mock();
        let bench = SequentialWriteBenchmark::new(
            FileSize::from_kb(1),
            SamplingPolicy::new(5, vec![0.0, 50.0, 100.0]),
            Timer::with_clock(clock),
            Span::none(),
        );
        let mut out = SlowingWriter {
            mock,
            writes: 0,
            bytes: 0,
        };
        let mut buffer = vec![0u8; 1024];

        // Chunk latencies are 1..=10 ms, then an 11 ms tail write.
        let sampler = bench.write_chunks(&mut out, &mut buffer, 10, 100).unwrap();
        assert_eq!(out.writes, 11);
        assert_eq!(out.bytes, 10 * 1024 + 100);
        assert_eq!(sampler.len(), 5);

        let latency = bench.sampling.summarize(&sampler);
        assert_eq!(latency.get("p0"), Some(Duration::from_millis(1)));
        assert_eq!(latency.get("p50"), Some(Duration::from_millis(3)));
        assert_eq!(latency.get("p100"), Some(Duration::from_millis(5)));
    }

    #[test]
    fn test_write_stamps_chunk_index() {
        let bench = writer(FileSize::from_bytes(16), 5);
        let mut out = Vec::new();
        let mut buffer = vec![0xAAu8; 16];

        bench.write_chunks(&mut out, &mut buffer, 3, 4).unwrap();
        assert_eq!(out.len(), 3 * 16 + 4);
        for index in 0..3u64 {
            let chunk = &out[index as usize * 16..][..16];
            assert_eq!(chunk[..8], index.to_le_bytes());
            assert!(chunk[8..].iter().all(|&b| b == 0xAA));
        }
    }

    #[test]
    fn test_parent_dir_of_bare_file_name() {
        assert_eq!(parent_dir(Path::new("file_1GB.bin")), Path::new("."));
        assert_eq!(
            parent_dir(Path::new("data/file_1GB.bin")),
            PathBuf::from("data").as_path()
        );
        assert_eq!(parent_dir(Path::new("/file_1GB.bin")), Path::new("/"));
    }

    #[test]
    fn test_write_truncates_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file_64KB.bin");
        fs::write(&path, vec![1u8; 256 * 1024]).unwrap();

        writer(FileSize::from_kb(16), 5)
            .run(&path, FileSize::from_kb(64))
            .unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 64 * 1024);
    }

    #[test]
    fn test_write_smaller_than_chunk_has_no_samples() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file_10KB.bin");

        let record = writer(FileSize::from_kb(100), 5)
            .run(&path, FileSize::from_kb(10))
            .unwrap();
        assert_eq!(record.operations_count, 0);
        assert!(record.latency_percentiles.is_empty());
        assert_eq!(fs::metadata(&path).unwrap().len(), 10 * 1024);
    }

    #[test]
    fn test_write_requires_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("file_1MB.bin");

        let err = writer(FileSize::from_kb(100), 5)
            .run(&path, FileSize::from_mb(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionNotFound);
    }

    #[test]
    fn test_read_operation_count_is_ceiling() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file_1MB.bin");
        writer(FileSize::from_kb(100), 5)
            .run(&path, FileSize::from_mb(1))
            .unwrap();

        // 1 MiB / 300 KiB = 3.41 -> 4 reads.
        let record = reader(300 * 1024, 2)
            .run(&path, FileSize::from_mb(1))
            .unwrap();
        assert_eq!(record.test_name, "Sequential Read 1MB");
        assert_eq!(record.operations_count, 4);
        assert!((record.file_size_mb - 1.0).abs() < f64::EPSILON);
        assert_eq!(record.latency_percentiles.len(), 3);
    }

    #[test]
    fn test_read_exact_multiple_does_not_count_eof() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.bin");
        fs::write(&path, vec![7u8; 64 * 1024]).unwrap();

        let record = reader(16 * 1024, 100)
            .run(&path, FileSize::from_kb(64))
            .unwrap();
        assert_eq!(record.operations_count, 4);
    }

    #[test]
    fn test_read_missing_file_is_precondition_failure() {
        let dir = TempDir::new().unwrap();
        let err = reader(4096, 5)
            .run(&dir.path().join("file_1GB.bin"), FileSize::from_gb(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionNotFound);
    }

    #[test]
    fn test_fill_buffer_handles_short_reads() {
        struct Trickle<'a>(&'a [u8]);
        impl Read for Trickle<'_> {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                let n = self.0.len().min(buf.len()).min(3);
                buf[..n].copy_from_slice(&self.0[..n]);
                self.0 = &self.0[n..];
                Ok(n)
            }
        }

        let data = [1u8; 10];
        let mut source = Trickle(&data);
        let mut buf = [0u8; 8];
        assert_eq!(fill_buffer(&mut source, &mut buf).unwrap(), 8);
        assert_eq!(fill_buffer(&mut source, &mut buf).unwrap(), 2);
        assert_eq!(fill_buffer(&mut source, &mut buf).unwrap(), 0);
    }
}
