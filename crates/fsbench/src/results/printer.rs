//! Terminal output for benchmark results.

use crate::results::format::{format_duration, format_ops, format_throughput};
use crate::results::{MetricRecord, ResultsAggregate};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, CellAlignment, ContentArrangement, Table};
use owo_colors::OwoColorize;
use std::path::Path;
use std::time::Duration;

/// Formats and prints benchmark results.
pub struct BenchmarkPrinter {
    /// Whether color output is enabled.
    color: bool,
}

impl BenchmarkPrinter {
    /// Create a new printer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Compact one-line banner.
    pub fn print_banner(&self, run_id: &str, base_dir: &Path) {
        println!();
        if self.color {
            println!(
                "{}: {} (run {})",
                "fsbench".cyan().bold(),
                base_dir.display(),
                run_id
            );
        } else {
            println!("fsbench: {} (run {})", base_dir.display(), run_id);
        }
        println!();
    }

    /// Print one record as it completes.
    ///
    /// ```text
    /// Sequential Write 1GB
    ///   Time:  4.12 s    Throughput: 248.5 MB/s    10 ops (2 ops/s)
    ///   Latency:  p50 410.22 ms  p95 431.90 ms  p99 433.01 ms
    /// ```
    pub fn print_record(&self, record: &MetricRecord) {
        let time = format_duration(record.elapsed);
        let throughput = format_throughput(record.throughput_mbps);
        let ops = format!(
            "{} ops ({})",
            record.operations_count,
            format_ops(record.iops)
        );
        let latency = record
            .latency_percentiles
            .iter()
            .map(|p| format!("{} {}", p.label, format_duration(p.value)))
            .collect::<Vec<_>>()
            .join("  ");

        if self.color {
            println!("{}", record.test_name.bold());
            println!(
                "  {}:  {}    {}: {}    {}",
                "Time".bold(),
                time.cyan(),
                "Throughput".bold(),
                throughput.green(),
                ops.dimmed()
            );
            if !latency.is_empty() {
                println!("  {}:  {}", "Latency".bold(), latency.yellow());
            }
        } else {
            println!("{}", record.test_name);
            println!("  Time:  {time}    Throughput: {throughput}    {ops}");
            if !latency.is_empty() {
                println!("  Latency:  {latency}");
            }
        }
    }

    /// Print every record of a run, then the summary table.
    pub fn print_results(&self, results: &ResultsAggregate) {
        for record in results.records() {
            self.print_record(record);
        }
        println!();
        println!("{}", self.summary_table(results));
    }

    /// Wall-clock time of the whole run, progress bar included.
    pub fn print_total_time(&self, elapsed: Duration) {
        println!("{}", self.total_time_line(elapsed));
    }

    fn total_time_line(&self, elapsed: Duration) -> String {
        let value = format_duration(elapsed);
        if self.color {
            format!("{} {}", "Total benchmark time:".bold(), value.cyan())
        } else {
            format!("Total benchmark time: {value}")
        }
    }

    /// Table of every record in aggregate order.
    pub fn summary_table(&self, results: &ResultsAggregate) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        if !self.color {
            table.force_no_tty();
        }

        // Percentile columns follow the first record that sampled latencies.
        let labels: Vec<String> = results
            .records()
            .find(|r| !r.latency_percentiles.is_empty())
            .map(|r| r.latency_percentiles.labels().map(str::to_string).collect())
            .unwrap_or_default();

        let mut header = vec!["Test", "Size", "Elapsed", "Throughput", "IOPS", "Ops"]
            .into_iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>();
        header.extend(
            labels
                .iter()
                .map(|l| Cell::new(l.to_uppercase()).add_attribute(Attribute::Bold)),
        );
        table.set_header(header);

        for record in results.records() {
            let mut row = vec![
                Cell::new(&record.test_name),
                right(if record.file_size_mb > 0.0 {
                    format!("{:.2} MB", record.file_size_mb)
                } else {
                    "-".to_string()
                }),
                right(format_duration(record.elapsed)),
                right(format_throughput(record.throughput_mbps)),
                right(format!("{:.2}", record.iops)),
                right(record.operations_count.to_string()),
            ];
            row.extend(labels.iter().map(|label| {
                right(
                    record
                        .latency_percentiles
                        .get(label)
                        .map_or_else(|| "-".to_string(), format_duration),
                )
            }));
            table.add_row(row);
        }
        table
    }

    /// List the files a run produced.
    pub fn print_exports(&self, paths: &[&Path]) {
        println!();
        for path in paths {
            if self.color {
                println!("{} {}", "Saved".green().bold(), path.display());
            } else {
                println!("Saved {}", path.display());
            }
        }
    }

    /// Report a failed run.
    pub fn print_failure(&self, error: &anyhow::Error) {
        if self.color {
            eprintln!("{} {error:#}", "Benchmark run failed:".red().bold());
        } else {
            eprintln!("Benchmark run failed: {error:#}");
        }
    }
}

fn right(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}
