//! Benchmark outcomes and everything that reports them.
//!
//! The record and aggregate types are format-agnostic; the exporters
//! (`csv`, `json`, `chart`) and terminal output (`printer`, `progress`) all
//! read from the rounded [`MetricSummary`] projection or the records
//! themselves.

pub mod chart;
pub mod csv;
pub mod format;
pub mod json;
pub mod percentile;
pub mod printer;
pub mod progress;
mod record;

pub use chart::{export_chart, render_chart};
pub use csv::{export_csv, render_csv, CSV_HEADER};
pub use format::{format_duration, format_ops, format_throughput};
pub use json::{export_json, JsonReport};
pub use percentile::{compute_percentiles, percentile_label, LatencyPercentiles, PercentileValue};
pub use printer::BenchmarkPrinter;
pub use progress::PhaseProgressReporter;
pub use record::{
    round_to, AggregateSummary, MetricRecord, MetricSummary, ResultsAggregate, RoundedPercentiles,
};
