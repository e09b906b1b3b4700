//! Unicode bar chart rendering.
//!
//! Four panels: sequential throughput, IOPS of the small-file and metadata
//! benchmarks, latency percentiles and execution time.

// Bar widths are derived from f64 ratios.
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use crate::results::{MetricRecord, ResultsAggregate};
use anyhow::Context;
use owo_colors::{AnsiColors, OwoColorize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Characters for bar chart rendering.
const BAR_FULL: char = '█';
const BAR_PARTIAL: &[char] = &['▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];

/// Maximum width for bar charts.
const MAX_BAR_WIDTH: usize = 40;

/// One labelled bar.
struct Bar {
    label: String,
    value: f64,
    display: String,
}

struct Panel {
    title: &'static str,
    color: AnsiColors,
    bars: Vec<Bar>,
}

fn throughput_panel(results: &ResultsAggregate) -> Panel {
    Panel {
        title: "Sequential Throughput (MB/s)",
        color: AnsiColors::Cyan,
        bars: results
            .sequential_write
            .iter()
            .chain(&results.sequential_read)
            .map(|r| Bar {
                label: r.test_name.clone(),
                value: r.throughput_mbps,
                display: format!("{:.2}", r.throughput_mbps),
            })
            .collect(),
    }
}

fn iops_panel(results: &ResultsAggregate) -> Panel {
    Panel {
        title: "Operations per Second",
        color: AnsiColors::Magenta,
        bars: results
            .random_rw
            .iter()
            .chain(&results.metadata)
            .map(|r| Bar {
                label: r.test_name.clone(),
                value: r.iops,
                display: format!("{:.2}", r.iops),
            })
            .collect(),
    }
}

fn latency_panel(results: &ResultsAggregate) -> Panel {
    let bars = results
        .records()
        .flat_map(|r: &MetricRecord| {
            r.latency_percentiles.iter().map(move |p| {
                let ms = p.value.as_secs_f64() * 1000.0;
                Bar {
                    label: format!("{} {}", r.test_name, p.label),
                    value: ms,
                    display: format!("{ms:.3} ms"),
                }
            })
        })
        .collect();
    Panel {
        title: "Latency Percentiles (ms)",
        color: AnsiColors::Yellow,
        bars,
    }
}

fn elapsed_panel(results: &ResultsAggregate) -> Panel {
    Panel {
        title: "Execution Time (s)",
        color: AnsiColors::Green,
        bars: results
            .records()
            .map(|r| Bar {
                label: r.test_name.clone(),
                value: r.elapsed_seconds(),
                display: format!("{:.3} s", r.elapsed_seconds()),
            })
            .collect(),
    }
}

/// Render a bar string of `width` cells filled to `ratio`.
fn render_bar(ratio: f64, width: usize) -> String {
    let filled = ratio.clamp(0.0, 1.0) * width as f64;
    let full_blocks = filled as usize;
    let partial_idx = ((filled - full_blocks as f64) * 8.0) as usize;

    let mut bar = String::with_capacity(width * 3);
    for _ in 0..full_blocks {
        bar.push(BAR_FULL);
    }
    if full_blocks < width && partial_idx > 0 {
        bar.push(BAR_PARTIAL[partial_idx.min(7)]);
    }
    while bar.chars().count() < width {
        bar.push(' ');
    }
    bar
}

fn render_panel<W: Write>(writer: &mut W, panel: &Panel, color: bool) -> io::Result<()> {
    if color {
        writeln!(writer, "{}", panel.title.bold().blue())?;
    } else {
        writeln!(writer, "{}", panel.title)?;
    }

    if panel.bars.is_empty() {
        writeln!(writer, "  (no data)")?;
        return Ok(());
    }

    let max = panel.bars.iter().map(|b| b.value).fold(0.0_f64, f64::max);
    let label_width = panel.bars.iter().map(|b| b.label.len()).max().unwrap_or(10);

    for bar in &panel.bars {
        let ratio = if max > 0.0 { bar.value / max } else { 0.0 };
        let cells = render_bar(ratio, MAX_BAR_WIDTH);
        let name = format!("{:>label_width$}", bar.label);
        if color {
            writeln!(writer, "{name} │{}│ {}", cells.color(panel.color), bar.display)?;
        } else {
            writeln!(writer, "{name} │{cells}│ {}", bar.display)?;
        }
    }
    Ok(())
}

/// Render all four panels.
pub fn render_chart<W: Write>(
    writer: &mut W,
    results: &ResultsAggregate,
    color: bool,
) -> io::Result<()> {
    let panels = [
        throughput_panel(results),
        iops_panel(results),
        latency_panel(results),
        elapsed_panel(results),
    ];
    for (i, panel) in panels.iter().enumerate() {
        if i > 0 {
            writeln!(writer)?;
        }
        render_panel(writer, panel, color)?;
    }
    Ok(())
}

/// Write `benchmark_chart_<run_id>.txt` into `dir` and return its path.
pub fn export_chart(results: &ResultsAggregate, run_id: &str, dir: &Path) -> anyhow::Result<PathBuf> {
    let mut text = Vec::new();
    writeln!(text, "Filesystem Benchmark Results ({run_id})")?;
    writeln!(text)?;
    render_chart(&mut text, results, false)?;

    let path = dir.join(format!("benchmark_chart_{run_id}.txt"));
    fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "chart_exported");
    Ok(path)
}
