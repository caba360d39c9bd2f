// Named statistical conditions and partial results
//
// A comparison over many metrics must not abort because one metric has zero
// variance; each statistic is carried as an `Outcome` instead.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Statistical precondition that prevented a value from being computed
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "condition", rename_all = "snake_case")]
pub enum StatCondition {
    #[error("Insufficient samples: need at least {required}, got {actual}")]
    InsufficientSamples { required: usize, actual: usize },

    #[error("Length mismatch: baseline has {baseline} samples, variant has {variant}")]
    LengthMismatch { baseline: usize, variant: usize },

    #[error("Run mismatch: baseline runs {baseline:?}, variant runs {variant:?}")]
    RunMismatch {
        baseline: Vec<usize>,
        variant: Vec<usize>,
    },

    #[error("Zero variance: test statistic is undefined")]
    ZeroVariance,

    #[error("Zero pooled variance: effect size is undefined")]
    ZeroPooledVariance,

    #[error("Zero baseline: percentage change is undefined")]
    ZeroBaseline,

    #[error("Statistical test failed: {reason}")]
    TestFailed { reason: String },
}

/// A computed statistic or the condition that made it unavailable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome<T> {
    Computed(T),
    Unavailable(StatCondition),
}

impl<T> Outcome<T> {
    pub fn computed(&self) -> Option<&T> {
        match self {
            Outcome::Computed(value) => Some(value),
            Outcome::Unavailable(_) => None,
        }
    }

    pub fn condition(&self) -> Option<&StatCondition> {
        match self {
            Outcome::Computed(_) => None,
            Outcome::Unavailable(condition) => Some(condition),
        }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, Outcome::Computed(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Computed(value) => Outcome::Computed(f(value)),
            Outcome::Unavailable(condition) => Outcome::Unavailable(condition),
        }
    }
}

impl<T> From<Result<T, StatCondition>> for Outcome<T> {
    fn from(result: Result<T, StatCondition>) -> Self {
        match result {
            Ok(value) => Outcome::Computed(value),
            Err(condition) => Outcome::Unavailable(condition),
        }
    }
}

/// Input tables cannot be lined up for comparison
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    #[error("No runs to compare")]
    NoRuns,

    #[error("Run {run} is missing metric '{metric}'")]
    MissingMetric { run: usize, metric: String },

    #[error("Run {run} reports metric '{metric}' more than once after key normalisation")]
    DuplicateMetric { run: usize, metric: String },

    #[error("Baseline index {index} out of range for {len} entries")]
    BaselineOutOfRange { index: usize, len: usize },

    #[error("Baseline run {0} not present in the table")]
    BaselineRunNotFound(usize),

    #[error("Variation '{variation}' is missing metric '{metric}' present in the baseline")]
    ColumnMismatch { variation: String, metric: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_result() {
        let ok: Outcome<f64> = Ok(1.5).into();
        assert_eq!(ok.computed(), Some(&1.5));
        assert!(ok.condition().is_none());

        let err: Outcome<f64> = Err(StatCondition::ZeroBaseline).into();
        assert!(!err.is_computed());
        assert_eq!(err.condition(), Some(&StatCondition::ZeroBaseline));
    }

    #[test]
    fn test_outcome_serialisation() {
        let ok: Outcome<f64> = Outcome::Computed(20.0);
        assert_eq!(serde_json::to_string(&ok).unwrap(), r#"{"computed":20.0}"#);

        let err: Outcome<f64> = Outcome::Unavailable(StatCondition::InsufficientSamples {
            required: 3,
            actual: 2,
        });
        assert_eq!(
            serde_json::to_string(&err).unwrap(),
            r#"{"unavailable":{"condition":"insufficient_samples","required":3,"actual":2}}"#
        );
    }

    #[test]
    fn test_condition_messages() {
        assert_eq!(
            StatCondition::ZeroPooledVariance.to_string(),
            "Zero pooled variance: effect size is undefined"
        );
        assert_eq!(
            ShapeError::MissingMetric {
                run: 2,
                metric: "host_energy_total".to_string()
            }
            .to_string(),
            "Run 2 is missing metric 'host_energy_total'"
        );
    }
}
