// Shapiro–Wilk normality test
//
// Coefficients and p-value use Royston's (1992, 1995) approximations, the
// same ones behind R's `shapiro.test`, valid for 3 <= n <= 5000.

use super::condition::{Outcome, StatCondition};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::f64::consts::PI;

const MIN_SAMPLES: usize = 3;
const MAX_SAMPLES: usize = 5000;

/// W statistic and its p-value
///
/// Small p-values reject normality; the paired t-test assumes approximately
/// normal differences, so a low p flags a result to read with care.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalityTest {
    pub statistic: f64,
    pub p_value: f64,
}

/// Shapiro–Wilk test over a metric's values across runs
///
/// Fewer than three values is reported as `InsufficientSamples`, never
/// silently skipped.
pub fn normality_check(values: &[f64]) -> Outcome<NormalityTest> {
    shapiro_wilk(values).into()
}

/// Shapiro–Wilk W statistic and p-value
///
/// # Errors
/// - `InsufficientSamples` for n < 3
/// - `ZeroVariance` when all values are identical
/// - `TestFailed` for n > 5000 or non-finite input
pub fn shapiro_wilk(values: &[f64]) -> Result<NormalityTest, StatCondition> {
    let n = values.len();
    if n < MIN_SAMPLES {
        return Err(StatCondition::InsufficientSamples {
            required: MIN_SAMPLES,
            actual: n,
        });
    }
    if n > MAX_SAMPLES {
        return Err(StatCondition::TestFailed {
            reason: format!("Shapiro-Wilk supports at most {} samples, got {}", MAX_SAMPLES, n),
        });
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(StatCondition::TestFailed {
            reason: "non-finite value in sample".to_string(),
        });
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mean = sorted.iter().sum::<f64>() / n as f64;
    let ss: f64 = sorted.iter().map(|x| (x - mean).powi(2)).sum();
    if ss == 0.0 || sorted[n - 1] == sorted[0] {
        return Err(StatCondition::ZeroVariance);
    }

    let normal = Normal::new(0.0, 1.0).map_err(|e| StatCondition::TestFailed {
        reason: e.to_string(),
    })?;

    let weights = coefficients(n, &normal);
    let numerator: f64 = weights.iter().zip(&sorted).map(|(a, x)| a * x).sum();
    let w = (numerator * numerator / ss).min(1.0);

    Ok(NormalityTest {
        statistic: w,
        p_value: p_value(w, n, &normal),
    })
}

/// Antisymmetric weights a_1..a_n for the ordered sample
fn coefficients(n: usize, normal: &Normal) -> Vec<f64> {
    if n == 3 {
        let a = 0.5f64.sqrt();
        return vec![-a, 0.0, a];
    }

    let nf = n as f64;
    let m: Vec<f64> = (1..=n)
        .map(|i| normal.inverse_cdf((i as f64 - 0.375) / (nf + 0.25)))
        .collect();
    let mm: f64 = m.iter().map(|v| v * v).sum();
    let u = 1.0 / nf.sqrt();

    let a_n = polynomial(&[0.0, 0.221_157, -0.147_981, -2.071_190, 4.434_685, -2.706_056], u)
        + m[n - 1] / mm.sqrt();

    let mut a = vec![0.0; n];
    if n > 5 {
        let a_n1 = polynomial(&[0.0, 0.042_981, -0.293_762, -1.752_461, 5.682_633, -3.582_633], u)
            + m[n - 2] / mm.sqrt();
        let phi = (mm - 2.0 * m[n - 1].powi(2) - 2.0 * m[n - 2].powi(2))
            / (1.0 - 2.0 * a_n.powi(2) - 2.0 * a_n1.powi(2));
        let scale = phi.sqrt();
        for (a_i, m_i) in a.iter_mut().zip(&m).take(n - 2).skip(2) {
            *a_i = m_i / scale;
        }
        a[0] = -a_n;
        a[1] = -a_n1;
        a[n - 2] = a_n1;
        a[n - 1] = a_n;
    } else {
        let phi = (mm - 2.0 * m[n - 1].powi(2)) / (1.0 - 2.0 * a_n.powi(2));
        let scale = phi.sqrt();
        for (a_i, m_i) in a.iter_mut().zip(&m).take(n - 1).skip(1) {
            *a_i = m_i / scale;
        }
        a[0] = -a_n;
        a[n - 1] = a_n;
    }
    a
}

/// Royston's normalising transformation of W
fn p_value(w: f64, n: usize, normal: &Normal) -> f64 {
    if w >= 1.0 {
        return 1.0;
    }

    if n == 3 {
        let p = 6.0 / PI * (w.sqrt().asin() - 0.75f64.sqrt().asin());
        return p.clamp(0.0, 1.0);
    }

    let nf = n as f64;
    let log_one_minus_w = (1.0 - w).ln();

    let (y, mu, sigma) = if n <= 11 {
        let gamma = 0.459 * nf - 2.273;
        if log_one_minus_w >= gamma {
            return 0.0;
        }
        let y = -(gamma - log_one_minus_w).ln();
        let mu = polynomial(&[0.5440, -0.39978, 0.025_054, -0.000_671_4], nf);
        let sigma = polynomial(&[1.3822, -0.77857, 0.062_767, -0.002_032_2], nf).exp();
        (y, mu, sigma)
    } else {
        let ln_n = nf.ln();
        let mu = polynomial(&[-1.5861, -0.31082, -0.083_751, 0.003_891_5], ln_n);
        let sigma = polynomial(&[-0.4803, -0.082_676, 0.003_030_2], ln_n).exp();
        (log_one_minus_w, mu, sigma)
    };

    let z = (y - mu) / sigma;
    normal.sf(z).clamp(0.0, 1.0)
}

/// c[0] + c[1]·x + c[2]·x² + ...
fn polynomial(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}
