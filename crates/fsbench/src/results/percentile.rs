//! Percentile computation over latency samples.

// Duration (u64 nanos) <-> f64 conversions are intentional here.
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::time::Duration;

/// Label for a percentile rank: `50.0` -> `p50`, `99.9` -> `p99.9`.
pub fn percentile_label(rank: f64) -> String {
    if rank.fract() == 0.0 {
        format!("p{}", rank as u64)
    } else {
        format!("p{rank}")
    }
}

/// One computed percentile.
#[derive(Debug, Clone, PartialEq)]
pub struct PercentileValue {
    /// Rank in [0, 100].
    pub rank: f64,
    /// Label such as `p95`.
    pub label: String,
    /// Interpolated latency at this rank.
    pub value: Duration,
}

/// Latency percentiles in requested rank order.
///
/// Either holds exactly the configured ranks or nothing at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatencyPercentiles(Vec<PercentileValue>);

impl LatencyPercentiles {
    /// No samples were collected.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Look up a value by label (`"p50"`).
    pub fn get(&self, label: &str) -> Option<Duration> {
        self.0.iter().find(|p| p.label == label).map(|p| p.value)
    }

    /// Iterate in rank order as given by the caller.
    pub fn iter(&self) -> impl Iterator<Item = &PercentileValue> {
        self.0.iter()
    }

    /// Labels in order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|p| p.label.as_str())
    }
}

impl Serialize for LatencyPercentiles {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for p in &self.0 {
            map.serialize_entry(&p.label, &p.value.as_secs_f64())?;
        }
        map.end()
    }
}

/// Compute the requested percentiles of `samples`.
///
/// `samples` need not be sorted. An empty sample set yields an empty result
/// rather than an error or zero-filled values.
pub fn compute_percentiles(samples: &[Duration], ranks: &[f64]) -> LatencyPercentiles {
    if samples.is_empty() {
        return LatencyPercentiles::empty();
    }

    let mut sorted: Vec<u64> = samples.iter().map(|d| d.as_nanos() as u64).collect();
    sorted.sort_unstable();

    LatencyPercentiles(
        ranks
            .iter()
            .map(|&rank| PercentileValue {
                rank,
                label: percentile_label(rank),
                value: Duration::from_nanos(percentile(&sorted, rank)),
            })
            .collect(),
    )
}

/// Calculate percentile from sorted data using linear interpolation.
///
/// Uses NumPy's "linear" method: `idx = p/100 * (n - 1)`, then interpolate
/// between `floor(idx)` and the next order statistic.
fn percentile(sorted: &[u64], p: f64) -> u64 {
    if sorted.len() == 1 {
        return sorted[0];
    }

    let n = sorted.len() as f64;
    let idx = (p.clamp(0.0, 100.0) / 100.0) * (n - 1.0);

    let lo = idx.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let frac = idx - lo as f64;

    let result = sorted[lo] as f64 * (1.0 - frac) + sorted[hi] as f64 * frac;
    result.round() as u64
}
