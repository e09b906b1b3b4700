//! Metadata churn benchmark: create, chmod and delete passes.

use crate::bench::Phase;
use crate::error::{BenchError, Result};
use crate::results::{LatencyPercentiles, MetricRecord};
use crate::timer::Timer;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::Span;

/// Permission bits applied during the chmod pass.
pub const META_FILE_MODE: u32 = 0o644;

/// Filesystem calls issued by [`MetadataBenchmark`].
///
/// The default implementation forwards to `std::fs`; tests substitute one
/// that injects faults.
pub trait MetadataOps {
    /// Create an empty file.
    fn create(&self, path: &Path) -> io::Result<()>;

    /// Set permission bits.
    fn chmod(&self, path: &Path, mode: u32) -> io::Result<()>;

    /// Unlink a file.
    fn remove(&self, path: &Path) -> io::Result<()>;
}

/// [`MetadataOps`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdMetadataOps;

impl MetadataOps for StdMetadataOps {
    fn create(&self, path: &Path) -> io::Result<()> {
        File::create(path).map(drop)
    }

    #[cfg(unix)]
    fn chmod(&self, path: &Path, mode: u32) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
    }

    #[cfg(not(unix))]
    fn chmod(&self, path: &Path, mode: u32) -> io::Result<()> {
        // Only the owner-write bit has a portable equivalent.
        let mut permissions = fs::metadata(path)?.permissions();
        permissions.set_readonly(mode & 0o200 == 0);
        fs::set_permissions(path, permissions)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// Files created so far, removed again if the run fails.
#[derive(Debug, Default)]
struct UndoList {
    created: Vec<PathBuf>,
}

impl UndoList {
    fn push(&mut self, path: PathBuf) {
        self.created.push(path);
    }

    fn paths(&self) -> &[PathBuf] {
        &self.created
    }

    /// Unlink every tracked file that still exists, ignoring failures.
    fn unwind(self, ops: &impl MetadataOps, span: &Span) -> usize {
        let mut removed = 0;
        for path in self.created {
            if !path.exists() {
                continue;
            }
            match ops.remove(&path) {
                Ok(()) => removed += 1,
                Err(e) => tracing::debug!(
                    parent: span,
                    path = %path.display(),
                    error = %e,
                    "metadata_cleanup_skipped"
                ),
            }
        }
        removed
    }
}

/// Creates `count` empty `meta_<i>.txt` files, chmods each, then deletes each.
///
/// Each pass finishes for all files before the next begins. On failure every
/// file created so far is unlinked (errors suppressed) and the original error
/// is returned.
pub struct MetadataBenchmark<O = StdMetadataOps> {
    ops: O,
    timer: Timer,
    span: Span,
}

impl MetadataBenchmark<StdMetadataOps> {
    /// Create a metadata benchmark using `std::fs`.
    pub fn new(timer: Timer, span: Span) -> Self {
        Self::with_ops(StdMetadataOps, timer, span)
    }
}

impl<O: MetadataOps> MetadataBenchmark<O> {
    /// Create a metadata benchmark over custom filesystem calls.
    pub fn with_ops(ops: O, timer: Timer, span: Span) -> Self {
        Self { ops, timer, span }
    }

    /// Path of the `index`-th scratch file in `dir`.
    pub fn file_path(dir: &Path, index: usize) -> PathBuf {
        dir.join(format!("meta_{index}.txt"))
    }

    /// Run the three passes over `count` files in `dir`.
    pub fn run(&self, dir: &Path, count: usize) -> Result<MetricRecord> {
        tracing::info!(
            parent: &self.span,
            test = Phase::Metadata.key(),
            dir_path = %dir.display(),
            file_count = count,
            "benchmark_started"
        );

        if !dir.is_dir() {
            let err = BenchError::not_found("metadata directory", dir);
            tracing::error!(parent: &self.span, test = Phase::Metadata.key(), error = %err, "benchmark_failed");
            return Err(err);
        }

        let mut undo = UndoList::default();
        let start = self.timer.start();

        match self.run_passes(dir, count, &mut undo) {
            Ok(()) => {
                let elapsed = self.timer.elapsed(start);
                let record = MetricRecord::measured(
                    Phase::Metadata.name(),
                    elapsed,
                    0,
                    count as u64 * 3,
                    LatencyPercentiles::empty(),
                )?;
                tracing::info!(
                    parent: &self.span,
                    test = Phase::Metadata.key(),
                    elapsed_sec = record.elapsed_seconds(),
                    file_count = count,
                    total_operations = record.operations_count,
                    ops_per_sec = record.iops,
                    "benchmark_completed"
                );
                Ok(record)
            }
            Err(err) => {
                tracing::error!(parent: &self.span, test = Phase::Metadata.key(), error = %err, "benchmark_failed");
                let removed = undo.unwind(&self.ops, &self.span);
                tracing::info!(parent: &self.span, removed, "metadata_cleanup_completed");
                Err(err)
            }
        }
    }

    fn run_passes(&self, dir: &Path, count: usize, undo: &mut UndoList) -> Result<()> {
        tracing::debug!(parent: &self.span, phase = "create", "metadata_phase_started");
        for index in 0..count {
            let path = Self::file_path(dir, index);
            self.ops
                .create(&path)
                .map_err(|e| BenchError::io("create", &path, e))?;
            undo.push(path);
        }

        tracing::debug!(parent: &self.span, phase = "chmod", "metadata_phase_started");
        for path in undo.paths() {
            self.ops
                .chmod(path, META_FILE_MODE)
                .map_err(|e| BenchError::io("chmod", path, e))?;
        }

        tracing::debug!(parent: &self.span, phase = "delete", "metadata_phase_started");
        for path in undo.paths() {
            self.ops
                .remove(path)
                .map_err(|e| BenchError::io("unlink", path, e))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::cell::Cell;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Which call fails, and on which (1-based) invocation.
    #[derive(Clone, Copy)]
    enum Fault {
        Create(usize),
        Chmod(usize),
        Remove(usize),
    }

    /// Forwards to `std::fs` but fails one call, and optionally every cleanup call.
    struct FaultyOps {
        fault: Fault,
        fail_cleanup: bool,
        creates: Cell<usize>,
        chmods: Cell<usize>,
        removes: Cell<usize>,
    }

    impl FaultyOps {
        fn new(fault: Fault) -> Self {
            Self {
                fault,
                fail_cleanup: false,
                creates: Cell::new(0),
                chmods: Cell::new(0),
                removes: Cell::new(0),
            }
        }

        fn bump(counter: &Cell<usize>) -> usize {
            counter.set(counter.get() + 1);
            counter.get()
        }
    }

    impl MetadataOps for FaultyOps {
        fn create(&self, path: &Path) -> io::Result<()> {
            let n = Self::bump(&self.creates);
            if matches!(self.fault, Fault::Create(at) if at == n) {
                return Err(io::Error::new(io::ErrorKind::StorageFull, "simulated disk full"));
            }
            StdMetadataOps.create(path)
        }

        fn chmod(&self, path: &Path, mode: u32) -> io::Result<()> {
            let n = Self::bump(&self.chmods);
            if matches!(self.fault, Fault::Chmod(at) if at == n) {
                return Err(io::Error::from(io::ErrorKind::PermissionDenied));
            }
            StdMetadataOps.chmod(path, mode)
        }

        fn remove(&self, path: &Path) -> io::Result<()> {
            let n = Self::bump(&self.removes);
            let injected = matches!(self.fault, Fault::Remove(at) if at == n);
            let failed_before = matches!(self.fault, Fault::Remove(at) if at < n)
                || matches!(self.fault, Fault::Create(_) | Fault::Chmod(_));
            if injected || (self.fail_cleanup && failed_before) {
                return Err(io::Error::other("simulated unlink failure"));
            }
            StdMetadataOps.remove(path)
        }
    }

    fn meta_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with("meta_"))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_success_counts_three_ops_per_file_and_leaves_nothing() {
        let dir = TempDir::new().unwrap();
        let record = MetadataBenchmark::new(Timer::new(), Span::none())
            .run(dir.path(), 25)
            .unwrap();

        assert_eq!(record.test_name, "Metadata Operations");
        assert_eq!(record.operations_count, 75);
        assert!(record.latency_percentiles.is_empty());
        assert!(record.file_size_mb.abs() < f64::EPSILON);
        assert!(record.throughput_mbps.abs() < f64::EPSILON);
        assert!(meta_files(dir.path()).is_empty());
    }

    #[test]
    fn test_create_failure_cleans_up_created_files() {
        let dir = TempDir::new().unwrap();
        let ops = FaultyOps::new(Fault::Create(7));

        let err = MetadataBenchmark::with_ops(ops, Timer::new(), Span::none())
            .run(dir.path(), 10)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("meta_6.txt"));
        assert!(meta_files(dir.path()).is_empty());
    }

    #[test]
    fn test_chmod_failure_cleans_up_all_files() {
        let dir = TempDir::new().unwrap();
        let ops = FaultyOps::new(Fault::Chmod(3));

        let err = MetadataBenchmark::with_ops(ops, Timer::new(), Span::none())
            .run(dir.path(), 10)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(meta_files(dir.path()).is_empty());
    }

    #[test]
    fn test_delete_failure_cleans_up_remaining_files() {
        let dir = TempDir::new().unwrap();
        let ops = FaultyOps::new(Fault::Remove(4));

        let err = MetadataBenchmark::with_ops(ops, Timer::new(), Span::none())
            .run(dir.path(), 10)
            .unwrap_err();

        assert!(err.to_string().contains("unlink"));
        assert!(meta_files(dir.path()).is_empty());
    }

    #[test]
    fn test_cleanup_errors_do_not_replace_original() {
        let dir = TempDir::new().unwrap();
        let mut ops = FaultyOps::new(Fault::Create(7));
        ops.fail_cleanup = true;

        let err = MetadataBenchmark::with_ops(ops, Timer::new(), Span::none())
            .run(dir.path(), 10)
            .unwrap_err();

        // The disk-full error surfaces; the six files cleanup could not remove stay.
        match err {
            BenchError::Io { operation, source, .. } => {
                assert_eq!(operation, "create");
                assert_eq!(source.kind(), io::ErrorKind::StorageFull);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(meta_files(dir.path()).len(), 6);
    }

    #[test]
    fn test_zero_elapsed_is_computation_invalid() {
        let dir = TempDir::new().unwrap();
        let (clock, _mock) = quanta::Clock::mock();

        let err = MetadataBenchmark::new(Timer::with_clock(clock), Span::none())
            .run(dir.path(), 3)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ComputationInvalid);
    }

    #[test]
    fn test_mock_clock_elapsed_drives_iops() {
        struct TickingOps {
            mock: std::sync::Arc<quanta::Mock>,
        }
        impl MetadataOps for TickingOps {
            fn create(&self, path: &Path) -> io::Result<()> {
                self.mock.increment(Duration::from_millis(10));
                StdMetadataOps.create(path)
            }
            fn chmod(&self, path: &Path, mode: u32) -> io::Result<()> {
                self.mock.increment(Duration::from_millis(10));
                StdMetadataOps.chmod(path, mode)
            }
            fn remove(&self, path: &Path) -> io::Result<()> {
                self.mock.increment(Duration::from_millis(10));
                StdMetadataOps.remove(path)
            }
        }

        let dir = TempDir::new().unwrap();
        let (clock, mock) = quanta::Clock::mock();
        let record = MetadataBenchmark::with_ops(TickingOps { mock }, Timer::with_clock(clock), Span::none())
            .run(dir.path(), 10)
            .unwrap();

        // 30 ops at 10ms each.
        assert_eq!(record.elapsed, Duration::from_millis(300));
        assert!((record.iops - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_directory_is_precondition_failure() {
        let dir = TempDir::new().unwrap();
        let err = MetadataBenchmark::new(Timer::new(), Span::none())
            .run(&dir.path().join("gone"), 5)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionNotFound);
    }

    #[cfg(unix)]
    #[test]
    fn test_std_chmod_sets_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("meta_0.txt");
        StdMetadataOps.create(&path).unwrap();
        StdMetadataOps.chmod(&path, 0o600).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o600);
    }
}
