//! Sanity checks on captured run inputs before analysis
//!
//! Catches the capture failures seen in practice (meter produced nothing,
//! trace never attached, block phase shorter than the sampling period)
//! without running the full pipeline.

use crate::attribution::AttributionMode;
use crate::pipeline::{RunInputs, RunParameters};
use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

/// A problem that would make a run's analysis meaningless or impossible
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "problem", rename_all = "snake_case")]
pub enum PreflightProblem {
    #[error("No power data found")]
    EmptyPowerStream,

    #[error("No process trace data found")]
    EmptyTrace,

    #[error("No root PID captured")]
    MissingRootPid,

    #[error("No '{name}' event found in timesheet")]
    MissingPruneMark { name: String },

    #[error("'{name}' duration {duration}s is shorter than two sample intervals ({minimum}s)")]
    PruneMarkTooShort {
        name: String,
        duration: f64,
        minimum: f64,
    },
}

/// Check one run's inputs; an empty list means the run looks analysable
pub fn check_run(inputs: &RunInputs, params: &RunParameters) -> Vec<PreflightProblem> {
    let mut problems = Vec::new();

    if inputs.power.is_empty() {
        problems.push(PreflightProblem::EmptyPowerStream);
    }

    if params.attribution == AttributionMode::Pid {
        if inputs.trace.trim().is_empty() {
            problems.push(PreflightProblem::EmptyTrace);
        }
        if inputs.root_pid.is_none() {
            problems.push(PreflightProblem::MissingRootPid);
        }
    }

    match inputs.timesheet.find(&params.prune_mark) {
        None => problems.push(PreflightProblem::MissingPruneMark {
            name: params.prune_mark.clone(),
        }),
        Some(event) => {
            let minimum = 2.0 * params.sample_interval_secs;
            if event.duration < minimum {
                problems.push(PreflightProblem::PruneMarkTooShort {
                    name: event.name.clone(),
                    duration: event.duration,
                    minimum,
                });
            }
        }
    }

    for problem in &problems {
        tracing::error!("{}", problem);
    }
    problems
}

/// Load a run directory and check it
///
/// Unreadable or unparsable inputs are returned as errors, not problems.
pub fn check_run_dir(dir: &Path, params: &RunParameters) -> Result<Vec<PreflightProblem>> {
    let inputs = RunInputs::load(dir)?;
    Ok(check_run(&inputs, params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::power::{HostReading, RawSample};
    use crate::series::{Timesheet, TimesheetEvent};

    fn params(attribution: AttributionMode) -> RunParameters {
        RunParameters {
            attribution,
            prune_mark: "block".to_string(),
            prune_buffer: 0.0,
            rebase_timestamps: true,
            internal_repetitions: 1,
            sample_interval_secs: 0.05,
        }
    }

    fn good_inputs() -> RunInputs {
        RunInputs {
            power: vec![RawSample {
                host: HostReading {
                    timestamp: 1.0,
                    consumption: 1.0,
                },
                consumers: vec![],
            }],
            trace: "a (1) -> b (2)\n".to_string(),
            root_pid: Some(1),
            timesheet: Timesheet::new(vec![TimesheetEvent::new("block", 0.0, 10.0)]),
        }
    }

    #[test]
    fn test_good_run_passes() {
        assert!(check_run(&good_inputs(), &params(AttributionMode::Pid)).is_empty());
    }

    #[test]
    fn test_empty_inputs_reported() {
        let inputs = RunInputs::default();
        let problems = check_run(&inputs, &params(AttributionMode::Pid));
        assert_eq!(
            problems,
            vec![
                PreflightProblem::EmptyPowerStream,
                PreflightProblem::EmptyTrace,
                PreflightProblem::MissingRootPid,
                PreflightProblem::MissingPruneMark {
                    name: "block".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_pattern_mode_ignores_trace() {
        let mut inputs = good_inputs();
        inputs.trace.clear();
        inputs.root_pid = None;
        let mode = AttributionMode::Pattern {
            pattern: "java".to_string(),
            case_insensitive: false,
        };
        assert!(check_run(&inputs, &params(mode)).is_empty());
    }

    #[test]
    fn test_block_shorter_than_two_intervals() {
        let mut inputs = good_inputs();
        inputs.timesheet = Timesheet::new(vec![TimesheetEvent::new("block", 5.0, 5.08)]);
        let problems = check_run(&inputs, &params(AttributionMode::Pid));
        assert!(matches!(
            problems.as_slice(),
            [PreflightProblem::PruneMarkTooShort { .. }]
        ));
    }
}
