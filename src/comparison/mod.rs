// Cross-Run Statistical Comparison of Energy Measurements
//
// Repeated runs of the same experiment never measure exactly the same energy.
// This module decides whether a difference between two variations (images,
// configurations) is larger than run-to-run noise.
//
// Scientific Foundation:
// [1] Shapiro, S. S., & Wilk, M. B. (1965). An analysis of variance test for
//     normality (complete samples). Biometrika 52(3/4).
//
// [2] Royston, P. (1995). Remark AS R94: A remark on algorithm AS 181: The
//     W-test for normality. Applied Statistics 44(4). Coefficient and p-value
//     approximations valid for 3 <= n <= 5000.
//
// [3] Student (1908). The probable error of a mean. Biometrika 6(1).
//     Paired t-test over per-run differences.
//
// [4] Cohen, J. (1988). Statistical Power Analysis for the Behavioral
//     Sciences. Standardized effect size d with pooled standard deviation.
//
// Key Insight: a precondition failure on one metric (too few runs, zero
// variance) is reported next to the other metrics' results instead of
// aborting the whole comparison.
//
// Implementation:
// - aprender's `ttest_rel` for the paired test, `ttest_ind` (Welch) as an
//   unpaired cross-check
// - Shapiro-Wilk over f64 with statrs' standard normal

mod condition;
mod config;
mod flatten;
mod normality;
mod paired;
mod report;

pub use condition::{Outcome, ShapeError, StatCondition};
pub use config::ComparisonConfig;
pub use flatten::{flatten, normalize_key, RunTable};
pub use normality::{normality_check, shapiro_wilk, NormalityTest};
pub use paired::{
    cohens_d, paired_comparison, paired_t_test, percentage_change, welch_t_test,
    PairedComparison, TTest,
};
pub use report::{
    compare_variations, run_deltas, ComparisonResult, MetricComparison, MetricRunDeltas,
    RunComparison, RunDelta, VariantComparison, Variation,
};
