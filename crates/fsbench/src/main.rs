//! fsbench - filesystem I/O benchmark.

// Use mimalloc as the global allocator for reduced allocation latency.
// Disable with `--no-default-features` if debugging allocator issues.
#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use fsbench::bench::{is_missing_fixture, PhaseProgress};
use fsbench::cli::{Cli, Mode};
use fsbench::fixtures::{FixtureGenerator, FIXTURE_SEED};
use fsbench::results::{
    export_chart, export_csv, export_json, render_chart, BenchmarkPrinter, PhaseProgressReporter,
};
use fsbench::{logging, BenchmarkConfig, BenchmarkRunner, SystemInfo};
use std::fs;
use std::process::ExitCode;
use tracing::Span;

fn main() -> ExitCode {
    // A missing .env is fine; a malformed one is not.
    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        eprintln!("Failed to load .env: {e}");
        return ExitCode::FAILURE;
    }

    let cli = Cli::parse();
    let printer = BenchmarkPrinter::new(!cli.no_color);

    match run(&cli, &printer) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            printer.print_failure(&e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, printer: &BenchmarkPrinter) -> Result<()> {
    let config = cli.to_config().context("Invalid benchmark configuration")?;

    if cli.mode() == Mode::SystemInfo {
        let _logging = logging::init(cli.verbose, None)?;
        println!("{}", SystemInfo::collect(&config.large_files_dir, &Span::none()));
        return Ok(());
    }

    for dir in config.directories() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }

    let run_id = cli.run_id();
    let logging = logging::init(cli.verbose, Some(&config.run_log_dir(&run_id)))?;
    let span = tracing::info_span!("benchmark_run", run_id = %run_id);
    tracing::info!(parent: &span, "benchmark_suite_started");

    let result = execute(cli, &config, &run_id, &span, printer);
    match &result {
        Ok(()) => tracing::info!(parent: &span, "benchmark_suite_completed"),
        Err(e) => tracing::error!(parent: &span, error = %format!("{e:#}"), "benchmark_suite_failed"),
    }
    if let Some(path) = logging.log_file() {
        println!("Log: {}", path.display());
    }
    result
}

fn execute(
    cli: &Cli,
    config: &BenchmarkConfig,
    run_id: &str,
    span: &Span,
    printer: &BenchmarkPrinter,
) -> Result<()> {
    let color = !cli.no_color;
    let mode = cli.mode();

    if matches!(mode, Mode::GenerateOnly | Mode::Full { generate: true }) {
        tracing::info!(parent: span, step = 1, description = "Generating test files", "step_started");
        let report = FixtureGenerator::new(FIXTURE_SEED, span.clone())
            .generate_all(config)
            .context("Fixture generation failed")?;
        tracing::info!(parent: span, step = 1, created = report.created, skipped = report.skipped, "step_completed");

        if mode == Mode::GenerateOnly {
            println!(
                "Fixtures ready: {} created, {} already present",
                report.created, report.skipped
            );
            return Ok(());
        }
    }

    let system_info = SystemInfo::collect(&config.large_files_dir, span);
    println!("{system_info}");
    printer.print_banner(run_id, &config.large_files_dir);

    tracing::info!(parent: span, step = 2, description = "Running benchmarks", "step_started");
    let runner = BenchmarkRunner::new(config.clone())
        .context("Invalid benchmark configuration")?
        .with_span(span.clone());

    let reporter = PhaseProgressReporter::new(runner.total_steps(), color);
    let on_progress = |p: &PhaseProgress| reporter.update(p);
    let outcome = runner.run_with_progress(Some(&on_progress));
    let (results, elapsed) = match outcome {
        Ok(results) => (results, reporter.finish()),
        Err(e) => {
            reporter.abandon();
            let hint = if is_missing_fixture(&e) {
                " (fixtures missing; run without --skip-generate)"
            } else {
                ""
            };
            return Err(e).context(format!("Benchmark execution failed{hint}"));
        }
    };
    tracing::info!(
        parent: span,
        step = 2,
        total_tests = results.len(),
        elapsed_sec = elapsed.as_secs_f64(),
        "step_completed"
    );

    printer.print_results(&results);
    printer.print_total_time(elapsed);
    println!();
    render_chart(&mut std::io::stdout().lock(), &results, color)
        .context("Failed to render chart")?;

    tracing::info!(parent: span, step = 3, description = "Saving results", "step_started");
    let csv_path = export_csv(&results, run_id, &config.results_dir).context("Failed to export CSV")?;
    let json_path = export_json(&results, &system_info, run_id, &config.results_dir)
        .context("Failed to export JSON")?;
    let chart_path = export_chart(&results, run_id, &config.graphs_dir).context("Failed to export chart")?;
    tracing::info!(parent: span, step = 3, "step_completed");

    printer.print_exports(&[&csv_path, &json_path, &chart_path]);
    Ok(())
}
