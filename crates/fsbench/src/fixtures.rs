//! Test data generation.
//!
//! Creates the large `file_<label>.bin` files read by the sequential read
//! benchmark and the `file_<i>.txt` files used by the small-file benchmark.
//! The benchmark runner never calls into this module.

use crate::config::{BenchmarkConfig, FileSize};
use crate::error::{BenchError, Result};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::Span;

/// Default seed for fixture contents.
pub const FIXTURE_SEED: u64 = 0x5eed_f11e;

/// Chunk size used to write large fixtures.
pub const GENERATION_CHUNK: FileSize = FileSize::from_mb(100);

/// What a generation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationReport {
    pub created: usize,
    pub skipped: usize,
}

/// Writes benchmark fixtures with seeded random contents.
pub struct FixtureGenerator {
    rng: ChaCha8Rng,
    chunk_size: usize,
    span: Span,
}

impl FixtureGenerator {
    pub fn new(seed: u64, span: Span) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            chunk_size: usize::try_from(GENERATION_CHUNK.bytes()).unwrap_or(usize::MAX),
            span,
        }
    }

    /// Use a smaller write chunk (tests).
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Generate every fixture `config` describes.
    pub fn generate_all(&mut self, config: &BenchmarkConfig) -> Result<GenerationReport> {
        let large = self.generate_large_files(&config.large_files_dir, &config.large_file_sizes)?;
        let small = self.generate_small_files(
            &config.small_files_dir,
            config.small_file_count,
            config.small_file_size_range_kb,
        )?;
        Ok(GenerationReport {
            created: large.created + small.created,
            skipped: large.skipped + small.skipped,
        })
    }

    /// Create `file_<label>.bin` for each size, keeping files that already
    /// have the right length.
    pub fn generate_large_files(&mut self, dir: &Path, sizes: &[FileSize]) -> Result<GenerationReport> {
        fs::create_dir_all(dir).map_err(|e| BenchError::io("create_dir_all", dir, e))?;
        tracing::info!(
            parent: &self.span,
            sizes = ?sizes.iter().map(|s| s.label()).collect::<Vec<_>>(),
            output_dir = %dir.display(),
            "generating_large_files"
        );

        let mut report = GenerationReport::default();
        for &size in sizes {
            let path = dir.join(format!("file_{}.bin", size.label()));

            if let Ok(meta) = fs::metadata(&path)
                && meta.len() == size.bytes()
            {
                tracing::info!(parent: &self.span, path = %path.display(), "large_file_exists_skipping");
                report.skipped += 1;
                continue;
            }

            tracing::info!(parent: &self.span, path = %path.display(), size = %size, "creating_large_file");
            if let Err(e) = self.write_large_file(&path, size) {
                tracing::error!(parent: &self.span, path = %path.display(), error = %e, "large_file_creation_failed");
                return Err(e);
            }
            tracing::info!(parent: &self.span, path = %path.display(), size = %size, "large_file_created");
            report.created += 1;
        }
        Ok(report)
    }

    fn write_large_file(&mut self, path: &Path, size: FileSize) -> Result<()> {
        let mut file = File::create(path).map_err(|e| BenchError::io("create", path, e))?;
        let mut chunk = vec![0u8; self.chunk_size];
        let chunk_len = self.chunk_size as u64;
        let chunks = size.bytes().div_ceil(chunk_len);

        let mut remaining = size.bytes();
        for i in 0..chunks {
            let len = usize::try_from(remaining.min(chunk_len)).unwrap_or(self.chunk_size);
            self.rng.fill_bytes(&mut chunk[..len]);
            file.write_all(&chunk[..len])
                .map_err(|e| BenchError::io("write", path, e))?;
            remaining -= len as u64;

            if (i + 1) % 10 == 0 {
                tracing::debug!(
                    parent: &self.span,
                    path = %path.display(),
                    chunks_written = i + 1,
                    chunks_total = chunks,
                    "large_file_progress"
                );
            }
        }
        file.sync_all().map_err(|e| BenchError::io("fsync", path, e))
    }

    /// Create `file_0.txt`..`file_<count-1>.txt`, each a uniformly random
    /// whole number of KB within `range_kb` (inclusive).
    pub fn generate_small_files(
        &mut self,
        dir: &Path,
        count: usize,
        range_kb: (u64, u64),
    ) -> Result<GenerationReport> {
        fs::create_dir_all(dir).map_err(|e| BenchError::io("create_dir_all", dir, e))?;
        tracing::info!(
            parent: &self.span,
            count,
            min_kb = range_kb.0,
            max_kb = range_kb.1,
            output_dir = %dir.display(),
            "generating_small_files"
        );

        let (min_kb, max_kb) = (range_kb.0.min(range_kb.1), range_kb.0.max(range_kb.1));
        let mut buf = Vec::new();
        for i in 0..count {
            let size = FileSize::from_kb(self.rng.random_range(min_kb..=max_kb));
            buf.resize(usize::try_from(size.bytes()).unwrap_or(0), 0);
            self.rng.fill_bytes(&mut buf);

            let path = dir.join(format!("file_{i}.txt"));
            if let Err(e) = fs::write(&path, &buf) {
                tracing::error!(parent: &self.span, path = %path.display(), error = %e, "small_files_creation_failed");
                return Err(BenchError::io("write", &path, e));
            }

            if (i + 1) % 1000 == 0 {
                tracing::debug!(parent: &self.span, created = i + 1, total = count, "small_files_progress");
            }
        }

        tracing::info!(parent: &self.span, count, output_dir = %dir.display(), "small_files_created");
        Ok(GenerationReport {
            created: count,
            skipped: 0,
        })
    }
}
