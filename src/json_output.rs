//! JSON output for run analyses and experiment comparisons

use crate::aggregate::{energy, SummaryCondition};
use crate::comparison::{ComparisonResult, RunComparison};
use crate::pipeline::{
    ExperimentReport, RunFailure, RunParameters, RunReport, WindowBounds,
};
use crate::process_tree::Pid;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const RUN_FORMAT: &str = "vatio-run-v1";
const EXPERIMENT_FORMAT: &str = "vatio-experiment-v1";

/// Size and energy of one exported series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSeriesSummary {
    pub entity: String,
    pub samples: usize,
    /// Trapezoidal energy, joules
    pub energy: f64,
}

/// `analysis.json`: one run's summary and how it was obtained
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRunAnalysis {
    pub version: String,
    pub format: String,
    /// `pid` or `pattern`
    pub mode: String,
    pub internal_repetitions: u32,
    pub window: WindowBounds,
    pub timebase_offset: f64,
    pub attributed_pids: Vec<Pid>,
    pub series: Vec<JsonSeriesSummary>,
    pub metrics: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<SummaryCondition>,
}

impl JsonRunAnalysis {
    pub fn from_report(report: &RunReport, params: &RunParameters) -> Self {
        let series = report
            .series
            .iter()
            .map(|s| JsonSeriesSummary {
                entity: s.entity.to_string(),
                samples: s.len(),
                energy: energy(s),
            })
            .collect();

        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: RUN_FORMAT.to_string(),
            mode: params.attribution.name().to_string(),
            internal_repetitions: params.internal_repetitions,
            window: report.window.clone(),
            timebase_offset: report.timebase.offset(),
            attributed_pids: report.attributed_pids.iter().copied().collect(),
            series,
            metrics: report.summary.metrics.clone(),
            conditions: report.summary.conditions.clone(),
        }
    }
}

/// One image inside `comparison.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonVariation {
    pub image: String,
    pub label: String,
    pub runs: BTreeMap<usize, crate::aggregate::RunSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<RunFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_comparison: Option<RunComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_error: Option<String>,
}

/// `comparison.json`: every image, its runs, and the image comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonExperimentOutput {
    pub version: String,
    pub format: String,
    pub variations: Vec<JsonVariation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonResult>,
}

impl JsonExperimentOutput {
    pub fn from_report(report: &ExperimentReport) -> Self {
        let variations = report
            .variations
            .iter()
            .map(|v| JsonVariation {
                image: v.report.image.clone(),
                label: v.report.label.clone(),
                runs: v.report.runs.clone(),
                failures: v.report.failures.clone(),
                run_comparison: v.run_comparison.clone(),
                table_error: v.table_error.clone(),
            })
            .collect();

        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: EXPERIMENT_FORMAT.to_string(),
            variations,
            comparison: report.comparison.clone(),
        }
    }
}

/// Pretty-print `value` to `path`
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialise {}", path.display()))?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
