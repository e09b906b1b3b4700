//! Benchmark outcome model: one record per benchmark, aggregated per run.

use crate::error::{BenchError, Result};
use crate::results::percentile::LatencyPercentiles;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::time::Duration;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Outcome of one benchmark.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    /// Human-readable, unique per run (e.g. "Sequential Write 4GB").
    pub test_name: String,
    /// Wall-clock duration of the whole phase.
    pub elapsed: Duration,
    /// Data volume / elapsed; zero when the phase moves no payload.
    pub throughput_mbps: f64,
    /// Operations / elapsed.
    pub iops: f64,
    /// Latency distribution from the phase's prefix sample.
    pub latency_percentiles: LatencyPercentiles,
    /// Payload moved, in MB (zero for metadata operations).
    pub file_size_mb: f64,
    /// Discrete operations counted for IOPS.
    pub operations_count: u64,
}

impl MetricRecord {
    /// Build a record, deriving throughput and IOPS from `elapsed`.
    ///
    /// Fails with `ComputationInvalid` if anything was measured over a zero
    /// elapsed time instead of reporting infinity.
    pub fn measured(
        test_name: impl Into<String>,
        elapsed: Duration,
        data_bytes: u64,
        operations_count: u64,
        latency_percentiles: LatencyPercentiles,
    ) -> Result<Self> {
        let test_name = test_name.into();
        let secs = elapsed.as_secs_f64();
        let file_size_mb = data_bytes as f64 / BYTES_PER_MB;

        let rate = |amount: f64, metric: &'static str| -> Result<f64> {
            if amount == 0.0 {
                Ok(0.0)
            } else if secs > 0.0 {
                Ok(amount / secs)
            } else {
                Err(BenchError::ComputationInvalid {
                    test: test_name.clone(),
                    metric,
                })
            }
        };

        let throughput_mbps = rate(file_size_mb, "throughput")?;
        let iops = rate(operations_count as f64, "iops")?;

        Ok(Self {
            test_name,
            elapsed,
            throughput_mbps,
            iops,
            latency_percentiles,
            file_size_mb,
            operations_count,
        })
    }

    /// Elapsed time in seconds.
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Rounded projection consumed by the exporters.
    pub fn summary(&self) -> MetricSummary {
        MetricSummary {
            test_name: self.test_name.clone(),
            elapsed_sec: round_to(self.elapsed_seconds(), 3),
            throughput_mbps: round_to(self.throughput_mbps, 2),
            iops: round_to(self.iops, 2),
            latency_percentiles: self
                .latency_percentiles
                .iter()
                .map(|p| (p.label.clone(), round_to(p.value.as_secs_f64(), 4)))
                .collect(),
            file_size_mb: round_to(self.file_size_mb, 2),
            operations_count: self.operations_count,
        }
    }
}

/// Flat, rounded view of a [`MetricRecord`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub test_name: String,
    pub elapsed_sec: f64,
    pub throughput_mbps: f64,
    pub iops: f64,
    /// Label -> seconds, rounded to 4 decimals, in configured rank order.
    pub latency_percentiles: RoundedPercentiles,
    pub file_size_mb: f64,
    pub operations_count: u64,
}

/// Rounded percentile values, kept in the order the ranks were configured.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundedPercentiles(Vec<(String, f64)>);

impl RoundedPercentiles {
    /// Value for a label such as `p95`.
    pub fn get(&self, label: &str) -> Option<f64> {
        self.0.iter().find(|(l, _)| l == label).map(|&(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(l, v)| (l.as_str(), *v))
    }
}

impl FromIterator<(String, f64)> for RoundedPercentiles {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for RoundedPercentiles {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, value) in &self.0 {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// All records of one run, in phase order.
///
/// Populated only by the runner; complete once the runner returns `Ok`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsAggregate {
    pub sequential_write: Vec<MetricRecord>,
    pub sequential_read: Vec<MetricRecord>,
    pub random_rw: Option<MetricRecord>,
    pub metadata: Option<MetricRecord>,
}

impl ResultsAggregate {
    /// Every record: writes, reads, random R/W, metadata.
    pub fn records(&self) -> impl Iterator<Item = &MetricRecord> {
        self.sequential_write
            .iter()
            .chain(&self.sequential_read)
            .chain(&self.random_rw)
            .chain(&self.metadata)
    }

    pub fn len(&self) -> usize {
        self.records().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rounded projection nested by phase.
    pub fn summary(&self) -> AggregateSummary {
        AggregateSummary {
            sequential_write: self.sequential_write.iter().map(MetricRecord::summary).collect(),
            sequential_read: self.sequential_read.iter().map(MetricRecord::summary).collect(),
            random_rw: self.random_rw.as_ref().map(MetricRecord::summary),
            metadata: self.metadata.as_ref().map(MetricRecord::summary),
        }
    }
}

/// Serializable projection of a [`ResultsAggregate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateSummary {
    pub sequential_write: Vec<MetricSummary>,
    pub sequential_read: Vec<MetricSummary>,
    pub random_rw: Option<MetricSummary>,
    pub metadata: Option<MetricSummary>,
}
