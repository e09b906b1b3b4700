//! Error types for benchmark execution.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result alias used throughout the benchmark engine.
pub type Result<T, E = BenchError> = std::result::Result<T, E>;

/// Errors raised while running a benchmark phase.
#[derive(Debug, Error)]
pub enum BenchError {
    /// An expected fixture file or directory is absent, or the file set is empty.
    #[error("{what} not found: {}", path.display())]
    PreconditionNotFound {
        /// What was expected (e.g. "large test file").
        what: &'static str,
        /// Where it was expected.
        path: PathBuf,
    },

    /// A read, write, chmod or unlink call failed.
    #[error("I/O failure during {operation} on {}: {source}", path.display())]
    Io {
        /// The operation that failed.
        operation: &'static str,
        /// The path the operation targeted.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// A derived metric could not be computed (zero elapsed time).
    #[error("cannot compute {metric} for '{test}': elapsed time is zero")]
    ComputationInvalid {
        /// Test whose metric failed.
        test: String,
        /// Metric that required a division by elapsed time.
        metric: &'static str,
    },
}

/// Fieldless classification of [`BenchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    PreconditionNotFound,
    Io,
    ComputationInvalid,
}

impl BenchError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PreconditionNotFound { .. } => ErrorKind::PreconditionNotFound,
            Self::Io { .. } => ErrorKind::Io,
            Self::ComputationInvalid { .. } => ErrorKind::ComputationInvalid,
        }
    }

    /// Build an `Io` error for `operation` on `path`.
    pub fn io(operation: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Build a `PreconditionNotFound` error.
    pub fn not_found(what: &'static str, path: &Path) -> Self {
        Self::PreconditionNotFound {
            what,
            path: path.to_path_buf(),
        }
    }

    /// Map an open failure on a fixture: `NotFound` becomes a precondition
    /// failure, everything else an I/O failure.
    pub fn open_fixture(what: &'static str, path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::not_found(what, path)
        } else {
            Self::io("open", path, source)
        }
    }
}
