//! Full JSON report.

use crate::results::{AggregateSummary, ResultsAggregate};
use crate::system_info::SystemInfo;
use anyhow::Context;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Root object of `full_results_<run_id>.json`.
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport<'a> {
    pub run_id: &'a str,
    pub timestamp: String,
    pub system_info: &'a SystemInfo,
    pub results: AggregateSummary,
}

impl<'a> JsonReport<'a> {
    pub fn new(run_id: &'a str, system_info: &'a SystemInfo, results: &ResultsAggregate) -> Self {
        Self {
            run_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
            system_info,
            results: results.summary(),
        }
    }
}

/// Write `full_results_<run_id>.json` into `dir` and return its path.
pub fn export_json(
    results: &ResultsAggregate,
    system_info: &SystemInfo,
    run_id: &str,
    dir: &Path,
) -> anyhow::Result<PathBuf> {
    let report = JsonReport::new(run_id, system_info, results);
    let json = serde_json::to_string_pretty(&report)?;

    let path = dir.join(format!("full_results_{run_id}.json"));
    fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "json_exported");
    Ok(path)
}
