//! CSV export: one row per record.

use crate::results::{MetricSummary, ResultsAggregate};
use anyhow::Context;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Column order of `metrics_<run_id>.csv`.
pub const CSV_HEADER: [&str; 10] = [
    "Test_Name",
    "File_Size_MB",
    "Elapsed_Sec",
    "Throughput_MBps",
    "IOPS",
    "Operations",
    "Latency_P50",
    "Latency_P95",
    "Latency_P99",
    "Run_ID",
];

const LATENCY_COLUMNS: [&str; 3] = ["p50", "p95", "p99"];

/// Quote a field if it contains a delimiter, quote or line break.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn format_row(summary: &MetricSummary, run_id: &str) -> String {
    let mut fields = vec![
        escape_field(&summary.test_name),
        summary.file_size_mb.to_string(),
        summary.elapsed_sec.to_string(),
        summary.throughput_mbps.to_string(),
        summary.iops.to_string(),
        summary.operations_count.to_string(),
    ];
    // Ranks that were not configured stay empty.
    fields.extend(LATENCY_COLUMNS.iter().map(|label| {
        summary
            .latency_percentiles
            .get(*label)
            .map(|value| value.to_string())
            .unwrap_or_default()
    }));
    fields.push(escape_field(run_id));
    fields.join(",")
}

/// Render the whole aggregate as CSV text, header included.
pub fn render_csv(results: &ResultsAggregate, run_id: &str) -> String {
    let mut out = CSV_HEADER.join(",");
    out.push('\n');
    for record in results.records() {
        let _ = writeln!(out, "{}", format_row(&record.summary(), run_id));
    }
    out
}

/// Write `metrics_<run_id>.csv` into `dir` and return its path.
pub fn export_csv(results: &ResultsAggregate, run_id: &str, dir: &Path) -> anyhow::Result<PathBuf> {
    let path = dir.join(format!("metrics_{run_id}.csv"));
    fs::write(&path, render_csv(results, run_id))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), rows = results.len(), "csv_exported");
    Ok(path)
}
