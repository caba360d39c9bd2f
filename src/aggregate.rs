//! Per-run energy and power aggregation
//!
//! Turns the windowed series of one run into a flat [`RunSummary`]:
//! sampling-interval statistics, host energy, host power statistics and the
//! energy charged to the attributed processes.
//!
//! - Energy is the trapezoidal integral of power over the (possibly irregular)
//!   timestamp axis: watts × seconds = joules.
//! - Descriptive statistics use trueno vectors; the median comes from
//!   aprender's `DescriptiveStats`.
//! - Standard deviation is the sample standard deviation (n−1).

use crate::attribution::SeriesSet;
use crate::series::Series;
use aprender::stats::DescriptiveStats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use trueno::Vector;

/// Errors raised while aggregating a single run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregateError {
    #[error("Insufficient data: need at least {required} samples, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Invalid repetition count: {0} (must be >= 1)")]
    InvalidRepetitionCount(u32),

    #[error("Statistics computation failed: {0}")]
    Statistics(String),
}

pub type Result<T> = std::result::Result<T, AggregateError>;

/// Mean, spread and range of a set of values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

/// Sampling regularity of a host series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimestampStats {
    /// Statistics over consecutive timestamp gaps
    pub interval: SummaryStats,
    /// Last timestamp of the series (elapsed time once rebased)
    pub running_time: f64,
}

/// Describe a non-empty set of values
///
/// The reductions run on trueno's f32 vectors, so results carry f32 precision
/// (about seven significant digits) even though they are returned as f64.
/// Energy totals are integrated in f64 and do not go through here.
pub fn describe(values: &[f64]) -> Result<SummaryStats> {
    if values.is_empty() {
        return Err(AggregateError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }

    let data: Vec<f32> = values.iter().map(|&v| v as f32).collect();
    let v = Vector::from_slice(&data);
    let stat_err = |e: &dyn std::fmt::Display| AggregateError::Statistics(e.to_string());

    let mean = v.mean().map_err(|e| stat_err(&e))?;
    let min = v.min().map_err(|e| stat_err(&e))?;
    let max = v.max().map_err(|e| stat_err(&e))?;
    let median = DescriptiveStats::new(&v)
        .quantile(0.5)
        .map_err(|e| stat_err(&e))?;

    // trueno's variance divides by n; rescale for the sample estimate
    let n = data.len();
    let std = if n < 2 {
        0.0
    } else {
        let population = v.variance().map_err(|e| stat_err(&e))? as f64;
        (population * n as f64 / (n - 1) as f64).sqrt()
    };

    Ok(SummaryStats {
        mean: mean as f64,
        std,
        min: min as f64,
        max: max as f64,
        median: median as f64,
    })
}

/// Statistics over the gaps between consecutive host samples
///
/// Needs at least two samples; fewer is reported as `InsufficientData`.
pub fn timestamp_statistics(host: &Series) -> Result<TimestampStats> {
    if host.len() < 2 {
        return Err(AggregateError::InsufficientData {
            required: 2,
            actual: host.len(),
        });
    }

    let gaps: Vec<f64> = host
        .samples
        .windows(2)
        .map(|pair| pair[1].timestamp - pair[0].timestamp)
        .collect();

    Ok(TimestampStats {
        interval: describe(&gaps)?,
        running_time: host.last_timestamp().unwrap_or(0.0),
    })
}

/// Trapezoidal integral of power over time
///
/// Zero for series with fewer than two samples. Samples sharing a timestamp
/// contribute a zero-width segment.
pub fn energy(series: &Series) -> f64 {
    series
        .samples
        .windows(2)
        .map(|pair| {
            let dt = pair[1].timestamp - pair[0].timestamp;
            dt * (pair[0].value + pair[1].value) / 2.0
        })
        .sum()
}

/// Normalise a total by the number of internal repetitions
pub fn per_repetition(total: f64, repetitions: u32) -> Result<f64> {
    if repetitions < 1 {
        return Err(AggregateError::InvalidRepetitionCount(repetitions));
    }
    Ok(total / repetitions as f64)
}

/// Statistics of the instantaneous power values (not integrated)
pub fn power_statistics(series: &Series) -> Result<SummaryStats> {
    describe(&series.values())
}

/// Total energy over every attributed series
///
/// No attributed consumers is a valid zero, not an error.
pub fn process_energy<'a, I>(series: I) -> f64
where
    I: IntoIterator<Item = &'a Series>,
{
    series.into_iter().map(energy).sum()
}

/// Metric keys, `<section>.<metric>`
pub mod keys {
    pub const TIMESTAMP_MEAN: &str = "timestamp.mean";
    pub const TIMESTAMP_STD: &str = "timestamp.std";
    pub const TIMESTAMP_MIN: &str = "timestamp.min";
    pub const TIMESTAMP_MAX: &str = "timestamp.max";
    pub const TIMESTAMP_MEDIAN: &str = "timestamp.median";
    pub const TIMESTAMP_RUNNING_TIME: &str = "timestamp.running_time";
    pub const HOST_ENERGY_TOTAL: &str = "host_energy.total";
    pub const HOST_ENERGY_PER_REPETITION: &str = "host_energy.per_repetition";
    pub const HOST_POWER_MEAN: &str = "host_power.mean";
    pub const HOST_POWER_STD: &str = "host_power.std";
    pub const HOST_POWER_MIN: &str = "host_power.min";
    pub const HOST_POWER_MAX: &str = "host_power.max";
    pub const HOST_POWER_MEDIAN: &str = "host_power.median";
    pub const PROCESS_ENERGY_TOTAL: &str = "process_energy.total";
    pub const PROCESS_ENERGY_PER_REPETITION: &str = "process_energy.per_repetition";
}

/// Non-fatal conditions met while summarising a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "condition", rename_all = "snake_case")]
pub enum SummaryCondition {
    /// Host series too short for interval statistics; `timestamp.*` omitted
    InsufficientTimestampData { samples: usize },
}

/// Flat metric-name → value mapping for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub metrics: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<SummaryCondition>,
}

impl RunSummary {
    /// Summarise one run's windowed series
    ///
    /// # Errors
    /// - `InvalidRepetitionCount` if `internal_repetitions` is 0
    /// - `InsufficientData` if the host series is empty
    pub fn from_series(set: &SeriesSet, internal_repetitions: u32) -> Result<Self> {
        let mut summary = RunSummary::default();

        match timestamp_statistics(&set.host) {
            Ok(ts) => {
                summary.insert_stats("timestamp", &ts.interval);
                summary.insert(keys::TIMESTAMP_RUNNING_TIME, ts.running_time);
            }
            Err(AggregateError::InsufficientData { actual, .. }) => {
                tracing::warn!(
                    "Host series has {} samples; skipping timestamp statistics",
                    actual
                );
                summary
                    .conditions
                    .push(SummaryCondition::InsufficientTimestampData { samples: actual });
            }
            Err(e) => return Err(e),
        }

        let host_total = energy(&set.host);
        summary.insert(keys::HOST_ENERGY_TOTAL, host_total);
        summary.insert(
            keys::HOST_ENERGY_PER_REPETITION,
            per_repetition(host_total, internal_repetitions)?,
        );

        summary.insert_stats("host_power", &power_statistics(&set.host)?);

        let process_total = process_energy(set.consumers.values());
        summary.insert(keys::PROCESS_ENERGY_TOTAL, process_total);
        summary.insert(
            keys::PROCESS_ENERGY_PER_REPETITION,
            per_repetition(process_total, internal_repetitions)?,
        );

        Ok(summary)
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).copied()
    }

    pub fn insert(&mut self, key: &str, value: f64) {
        self.metrics.insert(key.to_string(), value);
    }

    fn insert_stats(&mut self, section: &str, stats: &SummaryStats) {
        for (name, value) in [
            ("mean", stats.mean),
            ("std", stats.std),
            ("min", stats.min),
            ("max", stats.max),
            ("median", stats.median),
        ] {
            self.metrics.insert(format!("{}.{}", section, name), value);
        }
    }
}
