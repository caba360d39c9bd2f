//! Run and experiment orchestration over already-captured inputs
//!
//! Directory layout per image (the run index is omitted when there is a single
//! external repetition):
//!
//! ```text
//! <out>/<display_name>/<i>/
//!     power.json            raw power stream            (input)
//!     ptrace.txt            fork/exit trace             (input, PID mode)
//!     rpid.txt              workload root PID           (input, PID mode)
//!     timesheet.json        phase boundaries            (input)
//!     power_processed.json  windowed raw stream         (output)
//!     dfs/<entity>.csv      one series per entity       (output)
//!     analysis.json         run summary                 (output)
//! <out>/<display_name>/runs.csv  run × metric table     (output)
//! <out>/comparison.json     cross-run / cross-image     (output)
//! ```
//!
//! A failing run is logged and recorded; it never discards the summaries of
//! runs that already succeeded.

use crate::aggregate::RunSummary;
use crate::attribution::{
    aggregate_series, attributed_series, host_series, AttributionMode, Membership,
    PatternMembership, PidSetMembership, SeriesSet, Timebase,
};
use crate::comparison::{
    compare_variations, flatten, run_deltas, ComparisonResult, RunComparison, RunTable,
    Variation,
};
use crate::config::{display_name, ExperimentConfig};
use crate::csv_output::{CsvRunTableOutput, CsvSeriesOutput};
use crate::json_output::{write_json, JsonExperimentOutput, JsonRunAnalysis};
use crate::power::{parse_stream, RawSample};
use crate::process_tree::{Pid, ProcessTree};
use crate::series::{Series, Timesheet};
use crate::window::{window_between, WindowError};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const POWER_FILE: &str = "power.json";
pub const TRACE_FILE: &str = "ptrace.txt";
pub const ROOT_PID_FILE: &str = "rpid.txt";
pub const TIMESHEET_FILE: &str = "timesheet.json";
pub const PROCESSED_FILE: &str = "power_processed.json";
pub const SERIES_DIR: &str = "dfs";
pub const ANALYSIS_FILE: &str = "analysis.json";
pub const COMPARISON_FILE: &str = "comparison.json";
pub const RUN_TABLE_FILE: &str = "runs.csv";

/// Label of the summed workload series
pub const WORKLOAD_LABEL: &str = "workload";

/// Everything captured for one run
#[derive(Debug, Clone, Default)]
pub struct RunInputs {
    pub power: Vec<RawSample>,
    pub trace: String,
    pub root_pid: Option<Pid>,
    pub timesheet: Timesheet,
}

impl RunInputs {
    /// Load a run directory
    ///
    /// `ptrace.txt` and `rpid.txt` may be absent (pattern mode does not need
    /// them); the power stream and timesheet are required.
    pub fn load(dir: &Path) -> Result<Self> {
        let power_path = dir.join(POWER_FILE);
        let power_content = fs::read_to_string(&power_path)
            .with_context(|| format!("Failed to read {}", power_path.display()))?;
        let power = parse_stream(&power_content)
            .with_context(|| format!("Invalid power stream: {}", power_path.display()))?;

        let trace = read_optional(&dir.join(TRACE_FILE))?.unwrap_or_default();

        let root_pid = match read_optional(&dir.join(ROOT_PID_FILE))? {
            Some(content) => parse_root_pid(&content)?,
            None => None,
        };

        let timesheet_path = dir.join(TIMESHEET_FILE);
        let timesheet_content = fs::read_to_string(&timesheet_path)
            .with_context(|| format!("Failed to read {}", timesheet_path.display()))?;
        let timesheet = Timesheet::from_json(&timesheet_content)
            .with_context(|| format!("Invalid timesheet: {}", timesheet_path.display()))?;

        Ok(Self {
            power,
            trace,
            root_pid,
            timesheet,
        })
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    fs::read_to_string(path)
        .map(Some)
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Parse the captured root PID; blank content means "not captured"
pub fn parse_root_pid(content: &str) -> Result<Option<Pid>> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<Pid>()
        .map(Some)
        .with_context(|| format!("Invalid root PID: {:?}", trimmed))
}

/// Per-run analysis parameters, resolved once from the experiment config
#[derive(Debug, Clone, PartialEq)]
pub struct RunParameters {
    pub attribution: AttributionMode,
    pub prune_mark: String,
    pub prune_buffer: f64,
    pub rebase_timestamps: bool,
    pub internal_repetitions: u32,
    pub sample_interval_secs: f64,
}

impl RunParameters {
    pub fn from_config(config: &ExperimentConfig) -> Result<Self> {
        let attribution = config
            .analysis
            .attribution()
            .map_err(anyhow::Error::msg)?;
        Ok(Self {
            attribution,
            prune_mark: config.analysis.prune_mark.clone(),
            prune_buffer: config.analysis.prune_buffer,
            rebase_timestamps: config.analysis.rebase_timestamps,
            internal_repetitions: config.procedure.internal_repetitions,
            sample_interval_secs: config.procedure.sample_interval_secs,
        })
    }
}

/// Interval actually used to window a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowBounds {
    pub event: String,
    pub start: f64,
    pub end: f64,
    pub buffer: f64,
    pub samples: usize,
}

/// Result of analysing one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub window: WindowBounds,
    pub timebase: Timebase,
    /// Raw entries inside the window
    pub processed: Vec<RawSample>,
    pub series: SeriesSet,
    /// All matching consumers summed per raw entry
    pub workload: Series,
    /// PIDs that produced at least one attributed reading
    pub attributed_pids: BTreeSet<Pid>,
    pub summary: RunSummary,
}

fn resolve_membership(
    inputs: &RunInputs,
    attribution: &AttributionMode,
) -> Result<Box<dyn Membership>> {
    match attribution {
        AttributionMode::Pid => {
            let root = inputs
                .root_pid
                .context("PID attribution needs the workload root PID (rpid.txt)")?;
            let tree = ProcessTree::from_trace(&inputs.trace);
            let membership = PidSetMembership::from_tree(&tree, root);
            debug!(
                "Resolved {} PIDs under root {} ({} parents in trace)",
                membership.pids().len(),
                root,
                tree.parent_count()
            );
            Ok(Box::new(membership))
        }
        AttributionMode::Pattern {
            pattern,
            case_insensitive,
        } => {
            let membership = PatternMembership::new(pattern, *case_insensitive)
                .with_context(|| format!("Invalid attribution pattern: {}", pattern))?;
            Ok(Box::new(membership))
        }
    }
}

/// Window, attribute and summarise one run
///
/// Pure over `inputs`: nothing is read from or written to disk.
///
/// # Errors
/// - the prune-mark event is missing, or the power stream does not cover it
/// - PID mode without a root PID, or an invalid pattern
/// - the window holds no samples, or the repetition count is zero
pub fn analyze_run(inputs: &RunInputs, params: &RunParameters) -> Result<RunReport> {
    let event = inputs
        .timesheet
        .find(&params.prune_mark)
        .ok_or_else(|| WindowError::EventNotFound(params.prune_mark.clone()))?;
    let start = event.start - params.prune_buffer;
    let end = event.end + params.prune_buffer;

    let processed = window_between(&inputs.power, start, end)
        .with_context(|| format!("Power samples do not cover '{}' event", event.name))?
        .to_vec();
    debug!(
        "Window [{}, {}] keeps {} of {} raw samples",
        start,
        end,
        processed.len(),
        inputs.power.len()
    );

    let timebase = if params.rebase_timestamps {
        Timebase::rebased(&processed)
    } else {
        Timebase::absolute()
    };

    let membership = resolve_membership(inputs, &params.attribution)?;
    let series = SeriesSet {
        host: host_series(&processed, &timebase),
        consumers: attributed_series(&processed, membership.as_ref(), &timebase),
    };
    let workload = aggregate_series(&processed, membership.as_ref(), WORKLOAD_LABEL, &timebase);

    if series.consumers.is_empty() {
        info!(
            "No consumers matched {} attribution; process energy is zero",
            params.attribution.name()
        );
    }

    let summary = RunSummary::from_series(&series, params.internal_repetitions)
        .context("Failed to summarise run")?;

    Ok(RunReport {
        window: WindowBounds {
            event: event.name.clone(),
            start,
            end,
            buffer: params.prune_buffer,
            samples: processed.len(),
        },
        timebase,
        attributed_pids: series.consumers.keys().copied().collect(),
        processed,
        series,
        workload,
        summary,
    })
}

/// Write `power_processed.json`, `dfs/*.csv` and `analysis.json`
pub fn write_run_outputs(dir: &Path, report: &RunReport, params: &RunParameters) -> Result<()> {
    let processed = serde_json::to_string_pretty(&report.processed)
        .context("Failed to serialise processed power samples")?;
    let processed_path = dir.join(PROCESSED_FILE);
    fs::write(&processed_path, processed)
        .with_context(|| format!("Failed to write {}", processed_path.display()))?;

    let series_dir = dir.join(SERIES_DIR);
    fs::create_dir_all(&series_dir)
        .with_context(|| format!("Failed to create {}", series_dir.display()))?;
    for series in report.series.iter().chain(std::iter::once(&report.workload)) {
        let path = series_dir.join(format!("{}.csv", series.entity));
        fs::write(&path, CsvSeriesOutput::new(series).to_csv())
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    write_json(
        &dir.join(ANALYSIS_FILE),
        &JsonRunAnalysis::from_report(report, params),
    )
}

/// Load, analyse and write one run directory
pub fn analyze_run_dir(dir: &Path, params: &RunParameters) -> Result<RunReport> {
    let inputs = RunInputs::load(dir)?;
    let report = analyze_run(&inputs, params)?;
    write_run_outputs(dir, &report, params)?;
    Ok(report)
}

/// A run whose analysis failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFailure {
    pub run: usize,
    pub directory: PathBuf,
    pub error: String,
}

/// All runs of one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariationReport {
    pub image: String,
    pub label: String,
    pub runs: BTreeMap<usize, RunSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<RunFailure>,
}

impl VariationReport {
    pub fn table(&self) -> Result<RunTable, crate::comparison::ShapeError> {
        flatten(&self.runs)
    }
}

/// Analyse every external repetition of `image`
pub fn analyze_variation(
    config: &ExperimentConfig,
    image: &str,
    params: &RunParameters,
) -> VariationReport {
    let label = display_name(image).to_string();
    info!("Running analysis for {}", label);

    let mut report = VariationReport {
        image: image.to_string(),
        label,
        runs: BTreeMap::new(),
        failures: Vec::new(),
    };

    for run in 0..config.procedure.external_repetitions {
        let dir = config.run_dir(image, run);
        info!("Repetition {} ({})", run, dir.display());
        match analyze_run_dir(&dir, params) {
            Ok(result) => {
                report.runs.insert(run as usize, result.summary);
            }
            Err(e) => {
                warn!("Run {} of {} failed: {:#}", run, report.label, e);
                report.failures.push(RunFailure {
                    run: run as usize,
                    directory: dir,
                    error: format!("{:#}", e),
                });
            }
        }
    }

    report
}

/// Per-image results plus the run-to-run view inside the image
#[derive(Debug, Clone, PartialEq)]
pub struct VariationAnalysis {
    pub report: VariationReport,
    pub run_comparison: Option<RunComparison>,
    pub table_error: Option<String>,
}

/// Everything produced by one `analyze` invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentReport {
    pub variations: Vec<VariationAnalysis>,
    pub comparison: Option<ComparisonResult>,
}

impl ExperimentReport {
    pub fn failed_runs(&self) -> usize {
        self.variations.iter().map(|v| v.report.failures.len()).sum()
    }
}

/// Analyse every image and compare them against the baseline image
pub fn analyze_experiment(config: &ExperimentConfig) -> Result<ExperimentReport> {
    let params = RunParameters::from_config(config)?;

    let mut variations = Vec::with_capacity(config.images.len());
    let mut tables: Vec<Option<RunTable>> = Vec::with_capacity(config.images.len());

    for image in &config.images {
        let report = analyze_variation(config, image, &params);
        let (table, table_error) = match report.table() {
            Ok(table) => (Some(table), None),
            Err(e) => {
                warn!("Cannot tabulate runs of {}: {}", report.label, e);
                (None, Some(e.to_string()))
            }
        };

        // Within-image view: every run against the first successful run
        let run_comparison = table
            .as_ref()
            .filter(|t| t.len() > 1)
            .and_then(|t| run_deltas(t, t.runs[0]).ok());

        tables.push(table);
        variations.push(VariationAnalysis {
            report,
            run_comparison,
            table_error,
        });
    }

    let comparison = compare_images(config, &variations, &tables)?;

    Ok(ExperimentReport {
        variations,
        comparison,
    })
}

fn compare_images(
    config: &ExperimentConfig,
    variations: &[VariationAnalysis],
    tables: &[Option<RunTable>],
) -> Result<Option<ComparisonResult>> {
    if variations.len() < 2 {
        return Ok(None);
    }

    let mut usable = Vec::new();
    let mut baseline = None;
    for (index, (analysis, table)) in variations.iter().zip(tables).enumerate() {
        let Some(table) = table else {
            warn!(
                "Excluding {} from the image comparison",
                analysis.report.label
            );
            continue;
        };
        if index == config.analysis.baseline {
            baseline = Some(usable.len());
        }
        usable.push(Variation::new(analysis.report.label.clone(), table.clone()));
    }

    let Some(baseline) = baseline else {
        warn!("Baseline image has no usable runs; skipping image comparison");
        return Ok(None);
    };
    if usable.len() < 2 {
        return Ok(None);
    }

    let result = compare_variations(&usable, baseline, &config.analysis.comparison())
        .context("Failed to compare images")?;
    Ok(Some(result))
}

/// Write `<out>/<display_name>/runs.csv` per image and `<out>/comparison.json`
pub fn write_experiment_outputs(config: &ExperimentConfig, report: &ExperimentReport) -> Result<()> {
    fs::create_dir_all(&config.out)
        .with_context(|| format!("Failed to create {}", config.out.display()))?;

    for variation in &report.variations {
        let Ok(table) = variation.report.table() else {
            continue;
        };
        let dir = config.out.join(&variation.report.label);
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join(RUN_TABLE_FILE);
        fs::write(&path, CsvRunTableOutput::new(&table).to_csv())
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    write_json(
        &config.out.join(COMPARISON_FILE),
        &JsonExperimentOutput::from_report(report),
    )
}
