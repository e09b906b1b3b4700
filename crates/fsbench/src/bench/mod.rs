//! Benchmark definitions and execution.

mod metadata;
mod random_rw;
mod runner;
mod sequential;

pub use metadata::{MetadataBenchmark, MetadataOps, StdMetadataOps, META_FILE_MODE};
pub use random_rw::RandomRwBenchmark;
pub use runner::{is_missing_fixture, BenchmarkRunner};
pub use sequential::{SequentialReadBenchmark, SequentialWriteBenchmark};

use crate::config::BenchmarkConfig;
use crate::results::{compute_percentiles, LatencyPercentiles};
use std::fmt;
use std::time::Duration;

/// One benchmark activity; the runner executes them in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    SequentialWrite,
    SequentialRead,
    RandomReadWrite,
    Metadata,
}

impl Phase {
    /// Fixed execution order.
    pub const ORDER: [Phase; 4] = [
        Phase::SequentialWrite,
        Phase::SequentialRead,
        Phase::RandomReadWrite,
        Phase::Metadata,
    ];

    /// Display name; also the prefix of the record's test name.
    pub fn name(self) -> &'static str {
        match self {
            Self::SequentialWrite => "Sequential Write",
            Self::SequentialRead => "Sequential Read",
            Self::RandomReadWrite => "Random Read/Write Small Files",
            Self::Metadata => "Metadata Operations",
        }
    }

    /// Identifier used in log events.
    pub fn key(self) -> &'static str {
        match self {
            Self::SequentialWrite => "sequential_write",
            Self::SequentialRead => "sequential_read",
            Self::RandomReadWrite => "random_file_read_write",
            Self::Metadata => "metadata_operations",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Progress update emitted by the runner between benchmark steps.
#[derive(Debug, Clone)]
pub struct PhaseProgress {
    /// Phase the step belongs to.
    pub phase: Phase,
    /// Name of the step about to run (e.g. "Sequential Write 1GB").
    pub step_name: String,
    /// Index of this step (0-based).
    pub step_index: usize,
    /// Total number of steps in the run.
    pub total_steps: usize,
}

/// Callback for receiving progress updates.
///
/// Never invoked inside a timed region.
pub type PhaseProgressCallback<'a> = &'a dyn Fn(&PhaseProgress);

/// How per-operation latencies are sampled and summarized.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingPolicy {
    /// Maximum number of operations sampled per sub-phase.
    pub sample_cap: usize,
    /// Percentile ranks to report.
    pub percentiles: Vec<f64>,
}

impl SamplingPolicy {
    pub fn new(sample_cap: usize, percentiles: Vec<f64>) -> Self {
        Self {
            sample_cap,
            percentiles,
        }
    }

    pub fn from_config(config: &BenchmarkConfig) -> Self {
        Self::new(config.latency_sample_cap, config.latency_percentiles.clone())
    }

    /// Fresh sampler bounded by this policy's cap.
    pub fn sampler(&self) -> LatencySampler {
        LatencySampler::new(self.sample_cap)
    }

    /// Percentiles of everything `sampler` kept.
    pub fn summarize(&self, sampler: &LatencySampler) -> LatencyPercentiles {
        compute_percentiles(sampler.samples(), &self.percentiles)
    }
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self::new(1000, vec![50.0, 95.0, 99.0])
    }
}

/// Prefix sample of per-operation latencies.
///
/// Keeps the first `cap` observations and ignores the rest. Deliberately not
/// a uniform sample: early operations are over-represented if the filesystem
/// warms up or slows down over a phase.
#[derive(Debug, Clone)]
pub struct LatencySampler {
    cap: usize,
    samples: Vec<Duration>,
}

impl LatencySampler {
    /// Sampler keeping at most `cap` observations.
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            samples: Vec::with_capacity(cap.min(4096)),
        }
    }

    /// Whether the operation with 0-based `index` falls inside the prefix.
    #[inline]
    pub fn wants(&self, index: usize) -> bool {
        index < self.cap
    }

    /// Record one observation if there is room left.
    #[inline]
    pub fn record(&mut self, latency: Duration) {
        if self.samples.len() < self.cap {
            self.samples.push(latency);
        }
    }

    /// Append another sampler's observations (subject to this sampler's cap).
    pub fn merge(&mut self, other: LatencySampler) {
        for latency in other.samples {
            self.record(latency);
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Duration] {
        &self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampler_keeps_prefix() {
        let mut sampler = LatencySampler::new(3);
        for ms in 1..=10 {
            if sampler.wants(ms - 1) {
                sampler.record(Duration::from_millis(ms as u64));
            }
        }
        assert_eq!(
            sampler.samples(),
            &[
                Duration::from_millis(1),
                Duration::from_millis(2),
                Duration::from_millis(3)
            ]
        );
    }

    #[test]
    fn test_sampler_merge_respects_cap() {
        let mut reads = LatencySampler::new(2);
        reads.record(Duration::from_millis(1));
        let mut writes = LatencySampler::new(2);
        writes.record(Duration::from_millis(5));
        writes.record(Duration::from_millis(6));

        // Merged set is bounded by the combined population, not by one cap.
        let mut combined = LatencySampler::new(4);
        combined.merge(reads);
        combined.merge(writes);
        assert_eq!(combined.len(), 3);
    }

    #[test]
    fn test_phase_order() {
        let names: Vec<_> = Phase::ORDER.iter().map(|p| p.name()).collect();
        assert_eq!(
            names,
            [
                "Sequential Write",
                "Sequential Read",
                "Random Read/Write Small Files",
                "Metadata Operations"
            ]
        );
    }
}
