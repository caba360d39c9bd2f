// Cross-run and cross-variation comparison reports
//
// Two views over flattened run tables:
// - run deltas: inside one variation, every run against a chosen baseline run
// - variation comparison: every variation against a chosen baseline variation,
//   pairing runs by run index

use super::condition::{Outcome, ShapeError, StatCondition};
use super::config::ComparisonConfig;
use super::flatten::RunTable;
use super::normality::{normality_check, NormalityTest};
use super::paired::{mean, paired_comparison, percentage_change, PairedComparison};
use serde::{Deserialize, Serialize};

/// One run measured against the baseline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDelta {
    pub run: usize,
    pub value: f64,
    /// `value - baseline`
    pub difference: f64,
    pub percentage_change: Outcome<f64>,
}

/// Per-metric view of one variation's runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRunDeltas {
    pub metric: String,
    pub baseline_value: f64,
    pub mean: f64,
    pub normality: Outcome<NormalityTest>,
    pub deltas: Vec<RunDelta>,
}

/// All metrics of one variation against one of its runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunComparison {
    pub baseline_run: usize,
    pub metrics: Vec<MetricRunDeltas>,
}

impl RunComparison {
    pub fn metric(&self, name: &str) -> Option<&MetricRunDeltas> {
        self.metrics.iter().find(|m| m.metric == name)
    }
}

/// Compare every run of a table against `baseline_run`
///
/// `baseline_run` is a run index as it appears in the table, not a position.
pub fn run_deltas(table: &RunTable, baseline_run: usize) -> Result<RunComparison, ShapeError> {
    if table.is_empty() {
        return Err(ShapeError::NoRuns);
    }
    let baseline_position = table
        .position(baseline_run)
        .ok_or(ShapeError::BaselineRunNotFound(baseline_run))?;

    let metrics = table
        .columns
        .iter()
        .filter_map(|metric| table.column(metric).map(|values| (metric, values)))
        .map(|(metric, values)| {
            let baseline_value = values[baseline_position];
            let deltas = table
                .runs
                .iter()
                .zip(&values)
                .enumerate()
                .filter(|(position, _)| *position != baseline_position)
                .map(|(_, (&run, &value))| RunDelta {
                    run,
                    value,
                    difference: value - baseline_value,
                    percentage_change: percentage_change(baseline_value, value).into(),
                })
                .collect();

            MetricRunDeltas {
                metric: metric.clone(),
                baseline_value,
                mean: mean(&values),
                normality: normality_check(&values),
                deltas,
            }
        })
        .collect();

    Ok(RunComparison {
        baseline_run,
        metrics,
    })
}

/// A labelled set of runs (one image or configuration)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variation {
    pub label: String,
    pub table: RunTable,
}

impl Variation {
    pub fn new(label: impl Into<String>, table: RunTable) -> Self {
        Self {
            label: label.into(),
            table,
        }
    }
}

/// One non-baseline variation for one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantComparison {
    pub label: String,
    pub normality: Outcome<NormalityTest>,
    pub comparison: Outcome<PairedComparison>,
    /// Paired test below the significance level; absent when not computed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub significant: Option<bool>,
}

/// One metric across all variations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricComparison {
    pub metric: String,
    pub baseline_mean: f64,
    pub baseline_normality: Outcome<NormalityTest>,
    pub variants: Vec<VariantComparison>,
}

/// Every variation against the baseline variation, metric by metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub baseline: String,
    pub significance_level: f64,
    pub metrics: Vec<MetricComparison>,
}

impl ComparisonResult {
    pub fn metric(&self, name: &str) -> Option<&MetricComparison> {
        self.metrics.iter().find(|m| m.metric == name)
    }

    /// `(metric, variant label)` pairs with a significant paired test
    pub fn significant(&self) -> Vec<(&str, &str)> {
        self.metrics
            .iter()
            .flat_map(|m| {
                m.variants
                    .iter()
                    .filter(|v| v.significant == Some(true))
                    .map(move |v| (m.metric.as_str(), v.label.as_str()))
            })
            .collect()
    }

    /// Generate human-readable report
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();

        let significant = self.significant();
        if significant.is_empty() {
            report.push_str("✅ NO SIGNIFICANT DIFFERENCE\n\n");
        } else {
            report.push_str(&format!(
                "❗ SIGNIFICANT DIFFERENCES ({} metric/variation pairs)\n\n",
                significant.len()
            ));
        }
        report.push_str(&format!("Baseline: {}\n", self.baseline));
        report.push_str(&format!(
            "Significance level: {} ({}% confidence)\n",
            self.significance_level,
            (1.0 - self.significance_level) * 100.0
        ));

        for metric in &self.metrics {
            report.push_str(&format!(
                "\n📊 {} (baseline mean={:.3})\n",
                metric.metric, metric.baseline_mean
            ));
            for variant in &metric.variants {
                report.push_str(&format!("  {}: {}\n", variant.label, describe(variant)));
            }
        }

        report
    }
}

fn describe(variant: &VariantComparison) -> String {
    let comparison = match &variant.comparison {
        Outcome::Computed(c) => c,
        Outcome::Unavailable(condition) => return format!("unavailable ({})", condition),
    };

    let mut parts = vec![
        format!("value={:.3}", comparison.variant_mean),
        format!("diff={:+.3}", comparison.difference),
    ];
    parts.push(match &comparison.percentage_change {
        Outcome::Computed(pct) => format!("change={:+.2}%", pct),
        Outcome::Unavailable(_) => "change=n/a".to_string(),
    });
    parts.push(match &comparison.paired_test {
        Outcome::Computed(t) => format!("p={:.4}", t.p_value),
        Outcome::Unavailable(_) => "p=n/a".to_string(),
    });
    parts.push(match &comparison.effect_size {
        Outcome::Computed(d) => format!("d={:.2}", d),
        Outcome::Unavailable(_) => "d=n/a".to_string(),
    });
    if variant.significant == Some(true) {
        parts.push("[significant]".to_string());
    }
    parts.join(", ")
}

/// Compare every variation against `variations[baseline]`
///
/// Runs are paired by run index. Variations must expose every metric the
/// baseline has; a differing run count or run set only makes that variant's
/// comparison unavailable.
///
/// # Errors
/// - `NoRuns` if `variations` is empty
/// - `BaselineOutOfRange` if `baseline` is not a valid index
/// - `ColumnMismatch` if a variation lacks a baseline metric
pub fn compare_variations(
    variations: &[Variation],
    baseline: usize,
    config: &ComparisonConfig,
) -> Result<ComparisonResult, ShapeError> {
    let base = variations.get(baseline).ok_or(if variations.is_empty() {
        ShapeError::NoRuns
    } else {
        ShapeError::BaselineOutOfRange {
            index: baseline,
            len: variations.len(),
        }
    })?;

    for variation in variations {
        if let Some(missing) = base
            .table
            .columns
            .iter()
            .find(|c| !variation.table.columns.contains(*c))
        {
            return Err(ShapeError::ColumnMismatch {
                variation: variation.label.clone(),
                metric: missing.clone(),
            });
        }
    }

    let mut metrics = Vec::with_capacity(base.table.columns.len());
    for metric in &base.table.columns {
        let baseline_values = base.table.column(metric).unwrap_or_default();

        let variants = variations
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != baseline)
            .map(|(_, variation)| {
                let values = variation.table.column(metric).unwrap_or_default();
                let comparison: Outcome<PairedComparison> =
                    aligned_column(&base.table, &variation.table, metric)
                        .and_then(|aligned| paired_comparison(&baseline_values, &aligned))
                        .map(|c| enforce_min_sample_size(c, config.min_sample_size))
                        .into();
                let significant = comparison
                    .computed()
                    .and_then(|c| c.is_significant(config.significance_level));

                VariantComparison {
                    label: variation.label.clone(),
                    normality: normality_check(&values),
                    comparison,
                    significant,
                }
            })
            .collect();

        metrics.push(MetricComparison {
            metric: metric.clone(),
            baseline_mean: mean(&baseline_values),
            baseline_normality: normality_check(&baseline_values),
            variants,
        });
    }

    Ok(ComparisonResult {
        baseline: base.label.clone(),
        significance_level: config.significance_level,
        metrics,
    })
}

/// Variant values for `metric`, ordered by the baseline's run indices
fn aligned_column(
    base: &RunTable,
    variant: &RunTable,
    metric: &str,
) -> Result<Vec<f64>, StatCondition> {
    if base.len() != variant.len() {
        return Err(StatCondition::LengthMismatch {
            baseline: base.len(),
            variant: variant.len(),
        });
    }
    base.runs
        .iter()
        .map(|&run| variant.value(run, metric))
        .collect::<Option<Vec<f64>>>()
        .ok_or_else(|| StatCondition::RunMismatch {
            baseline: base.runs.clone(),
            variant: variant.runs.clone(),
        })
}

fn enforce_min_sample_size(mut comparison: PairedComparison, min: usize) -> PairedComparison {
    if comparison.n < min {
        let condition = StatCondition::InsufficientSamples {
            required: min,
            actual: comparison.n,
        };
        comparison.paired_test = Outcome::Unavailable(condition.clone());
        comparison.welch_test = Outcome::Unavailable(condition);
    }
    comparison
}
