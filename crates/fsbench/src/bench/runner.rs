//! Benchmark execution runner.

use crate::bench::{
    MetadataBenchmark, Phase, PhaseProgress, PhaseProgressCallback, RandomRwBenchmark,
    SamplingPolicy, SequentialReadBenchmark, SequentialWriteBenchmark,
};
use crate::config::{BenchmarkConfig, ConfigError};
use crate::error::{BenchError, Result};
use crate::results::ResultsAggregate;
use crate::timer::Timer;
use tracing::Span;

/// Runs every benchmark phase in a fixed order and collects the results.
///
/// Phases never overlap and are never reordered:
/// sequential write (all sizes) -> sequential read (all sizes) ->
/// small-file read/append -> metadata. The first failure aborts the run.
pub struct BenchmarkRunner {
    config: BenchmarkConfig,
    sampling: SamplingPolicy,
    timer: Timer,
    span: Span,
}

/// Tracks step numbering for progress callbacks.
struct StepCounter<'a> {
    callback: Option<PhaseProgressCallback<'a>>,
    next: usize,
    total: usize,
}

impl StepCounter<'_> {
    fn begin(&mut self, phase: Phase, step_name: &str) {
        if let Some(callback) = self.callback {
            callback(&PhaseProgress {
                phase,
                step_name: step_name.to_string(),
                step_index: self.next,
                total_steps: self.total,
            });
        }
        self.next += 1;
    }
}

impl BenchmarkRunner {
    /// Create a runner; the configuration is validated here, before anything runs.
    pub fn new(config: BenchmarkConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            sampling: SamplingPolicy::from_config(&config),
            config,
            timer: Timer::new(),
            span: Span::none(),
        })
    }

    /// Use a specific timer (e.g. one backed by a mock clock).
    #[must_use]
    pub fn with_timer(mut self, timer: Timer) -> Self {
        self.timer = timer;
        self
    }

    /// Parent span for every event the runner and its benchmarks emit.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Number of progress steps a run reports.
    pub fn total_steps(&self) -> usize {
        self.config.large_file_sizes.len() * 2 + 2
    }

    /// Run all phases.
    pub fn run(&self) -> Result<ResultsAggregate> {
        self.run_with_progress(None)
    }

    /// Run all phases, reporting each step to `progress` before it starts.
    ///
    /// On failure the partially filled aggregate is logged and dropped; callers
    /// only ever see complete results.
    pub fn run_with_progress(
        &self,
        progress: Option<PhaseProgressCallback<'_>>,
    ) -> Result<ResultsAggregate> {
        let mut results = ResultsAggregate::default();
        let mut steps = StepCounter {
            callback: progress,
            next: 0,
            total: self.total_steps(),
        };

        tracing::info!(
            parent: &self.span,
            sizes = ?self.config.large_file_sizes.iter().map(|s| s.label()).collect::<Vec<_>>(),
            sample_cap = self.sampling.sample_cap,
            "running_all_benchmarks"
        );

        for phase in Phase::ORDER {
            if let Err(e) = self.run_phase(phase, &mut results, &mut steps) {
                let completed: Vec<&str> =
                    results.records().map(|r| r.test_name.as_str()).collect();
                tracing::error!(
                    parent: &self.span,
                    phase = phase.key(),
                    error = %e,
                    completed = ?completed,
                    "benchmarks_failed"
                );
                return Err(e);
            }
        }

        tracing::info!(
            parent: &self.span,
            total_tests = results.len(),
            "all_benchmarks_completed"
        );
        Ok(results)
    }

    fn phase_span(&self, phase: Phase) -> Span {
        tracing::info_span!(parent: &self.span, "phase", name = phase.key())
    }

    fn run_phase(
        &self,
        phase: Phase,
        results: &mut ResultsAggregate,
        steps: &mut StepCounter<'_>,
    ) -> Result<()> {
        let span = self.phase_span(phase);
        match phase {
            Phase::SequentialWrite => {
                let bench = SequentialWriteBenchmark::new(
                    self.config.write_chunk_size,
                    self.sampling.clone(),
                    self.timer.clone(),
                    span,
                );
                for &size in &self.config.large_file_sizes {
                    steps.begin(phase, &format!("{phase} {size}"));
                    let record = bench.run(&self.config.large_file_path(size), size)?;
                    results.sequential_write.push(record);
                }
            }
            Phase::SequentialRead => {
                let bench = SequentialReadBenchmark::new(
                    self.config.read_buffer_size,
                    self.sampling.clone(),
                    self.timer.clone(),
                    span,
                );
                for &size in &self.config.large_file_sizes {
                    steps.begin(phase, &format!("{phase} {size}"));
                    let record = bench.run(&self.config.large_file_path(size), size)?;
                    results.sequential_read.push(record);
                }
            }
            Phase::RandomReadWrite => {
                steps.begin(phase, phase.name());
                let bench = RandomRwBenchmark::new(
                    self.config.random_append_size,
                    self.sampling.clone(),
                    self.timer.clone(),
                    span,
                );
                results.random_rw = Some(bench.run(&self.config.small_files_dir)?);
            }
            Phase::Metadata => {
                steps.begin(phase, phase.name());
                let bench = MetadataBenchmark::new(self.timer.clone(), span);
                results.metadata = Some(
                    bench.run(&self.config.small_files_dir, self.config.metadata_operations_count)?,
                );
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for BenchmarkRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BenchmarkRunner")
            .field("config", &self.config)
            .field("sampling", &self.sampling)
            .finish_non_exhaustive()
    }
}

/// Whether `err` means a fixture was missing, i.e. the generator was not run.
pub fn is_missing_fixture(err: &BenchError) -> bool {
    matches!(err, BenchError::PreconditionNotFound { .. })
}
