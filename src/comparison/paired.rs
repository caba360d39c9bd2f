// Paired comparison of two index-aligned measurement vectors
//
// Run i of the baseline and run i of the variant are assumed to have been
// measured under matching conditions (same repetition slot), so the primary
// test is on per-run differences. Welch's unpaired test is reported alongside.

use super::condition::{Outcome, StatCondition};
use serde::{Deserialize, Serialize};

/// t-test result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TTest {
    pub statistic: f64,
    /// Two-sided p-value
    pub p_value: f64,
    pub df: f64,
}

/// Baseline vs. variant for one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairedComparison {
    pub n: usize,
    pub baseline_mean: f64,
    /// Mean of the variant; the "value" reported for it
    pub variant_mean: f64,
    /// `variant_mean - baseline_mean`
    pub difference: f64,
    /// Positive when the variant consumed less than the baseline
    pub percentage_change: Outcome<f64>,
    pub paired_test: Outcome<TTest>,
    pub welch_test: Outcome<TTest>,
    /// Cohen's d, `(baseline_mean - variant_mean) / pooled_std`
    pub effect_size: Outcome<f64>,
}

impl PairedComparison {
    /// Whether the paired test rejects equality at `alpha`; `None` if the
    /// test could not be computed
    pub fn is_significant(&self, alpha: f64) -> Option<bool> {
        self.paired_test.computed().map(|t| t.p_value < alpha)
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (n−1); zero for fewer than two values
fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// Round half away from zero to two decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `round(100 × (baseline − value) / baseline, 2)`
///
/// # Example
/// ```
/// use vatio::comparison::percentage_change;
///
/// assert_eq!(percentage_change(100.0, 80.0).unwrap(), 20.0);
/// assert_eq!(percentage_change(10.0, 11.0).unwrap(), -10.0);
/// assert!(percentage_change(0.0, 1.0).is_err());
/// ```
pub fn percentage_change(baseline: f64, value: f64) -> Result<f64, StatCondition> {
    if baseline == 0.0 {
        return Err(StatCondition::ZeroBaseline);
    }
    Ok(round2(100.0 * (baseline - value) / baseline))
}

fn check_aligned(baseline: &[f64], variant: &[f64]) -> Result<usize, StatCondition> {
    if baseline.len() != variant.len() {
        return Err(StatCondition::LengthMismatch {
            baseline: baseline.len(),
            variant: variant.len(),
        });
    }
    Ok(baseline.len())
}

fn require(n: usize, required: usize) -> Result<(), StatCondition> {
    if n < required {
        return Err(StatCondition::InsufficientSamples {
            required,
            actual: n,
        });
    }
    Ok(())
}

/// Paired t-test on `baseline[i] - variant[i]` via aprender
///
/// A positive statistic means the variant is lower than the baseline.
pub fn paired_t_test(baseline: &[f64], variant: &[f64]) -> Result<TTest, StatCondition> {
    let n = check_aligned(baseline, variant)?;
    require(n, 2)?;

    let differences: Vec<f64> = baseline.iter().zip(variant).map(|(b, v)| b - v).collect();
    if sample_variance(&differences) == 0.0 {
        return Err(StatCondition::ZeroVariance);
    }

    let b: Vec<f32> = baseline.iter().map(|&v| v as f32).collect();
    let v: Vec<f32> = variant.iter().map(|&v| v as f32).collect();
    let result = aprender::stats::hypothesis::ttest_rel(&b, &v).map_err(|e| {
        StatCondition::TestFailed {
            reason: e.to_string(),
        }
    })?;

    // Differences that vanish at f32 precision
    if !result.statistic.is_finite() || !result.pvalue.is_finite() {
        return Err(StatCondition::ZeroVariance);
    }
    Ok(TTest {
        statistic: result.statistic as f64,
        p_value: result.pvalue as f64,
        df: result.df as f64,
    })
}

/// Welch's unequal-variance t-test via aprender
pub fn welch_t_test(baseline: &[f64], variant: &[f64]) -> Result<TTest, StatCondition> {
    require(baseline.len().min(variant.len()), 2)?;
    if sample_variance(baseline) == 0.0 && sample_variance(variant) == 0.0 {
        return Err(StatCondition::ZeroVariance);
    }

    let b: Vec<f32> = baseline.iter().map(|&v| v as f32).collect();
    let v: Vec<f32> = variant.iter().map(|&v| v as f32).collect();
    let result = aprender::stats::hypothesis::ttest_ind(&b, &v, false).map_err(|e| {
        StatCondition::TestFailed {
            reason: e.to_string(),
        }
    })?;

    if !result.statistic.is_finite() || !result.pvalue.is_finite() {
        return Err(StatCondition::ZeroVariance);
    }
    Ok(TTest {
        statistic: result.statistic as f64,
        p_value: result.pvalue as f64,
        df: result.df as f64,
    })
}

/// Cohen's d with pooled standard deviation
/// `sqrt(((n−1)s₁² + (n−1)s₂²) / (2n−2))`
pub fn cohens_d(baseline: &[f64], variant: &[f64]) -> Result<f64, StatCondition> {
    let n = check_aligned(baseline, variant)?;
    require(n, 2)?;

    let weight = (n - 1) as f64;
    let pooled_variance = (weight * sample_variance(baseline) + weight * sample_variance(variant))
        / (2 * n - 2) as f64;
    if pooled_variance == 0.0 {
        return Err(StatCondition::ZeroPooledVariance);
    }
    Ok((mean(baseline) - mean(variant)) / pooled_variance.sqrt())
}

/// Compare a variant against the baseline over aligned runs
///
/// Fails as a whole only when the vectors cannot be paired (length mismatch
/// or no runs); otherwise each statistic carries its own `Outcome`.
pub fn paired_comparison(
    baseline: &[f64],
    variant: &[f64],
) -> Result<PairedComparison, StatCondition> {
    let n = check_aligned(baseline, variant)?;
    require(n, 1)?;

    let baseline_mean = mean(baseline);
    let variant_mean = mean(variant);

    Ok(PairedComparison {
        n,
        baseline_mean,
        variant_mean,
        difference: variant_mean - baseline_mean,
        percentage_change: percentage_change(baseline_mean, variant_mean).into(),
        paired_test: paired_t_test(baseline, variant).into(),
        welch_test: welch_t_test(baseline, variant).into(),
        effect_size: cohens_d(baseline, variant).into(),
    })
}
