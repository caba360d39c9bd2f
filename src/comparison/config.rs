// Configuration for cross-run comparison

use serde::{Deserialize, Serialize};

/// Thresholds applied when reading comparison results
///
/// # Example
/// ```
/// use vatio::comparison::ComparisonConfig;
///
/// let config = ComparisonConfig::default();
/// assert_eq!(config.significance_level, 0.05);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonConfig {
    /// Alpha for the paired t-test
    ///
    /// - 0.05 (default): 95% confidence
    /// - 0.01: stricter, fewer false positives
    /// - 0.10: looser, catches smaller effects with more noise
    pub significance_level: f64,

    /// Runs needed per variation before a paired test is attempted
    ///
    /// Two is the arithmetic minimum for a t-test; energy measurements on
    /// shared hardware usually need more to be meaningful.
    pub min_sample_size: usize,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            significance_level: 0.05,
            min_sample_size: 2,
        }
    }
}

impl ComparisonConfig {
    /// 99% confidence, at least five runs
    pub fn strict() -> Self {
        Self {
            significance_level: 0.01,
            min_sample_size: 5,
        }
    }

    pub fn with_significance_level(mut self, significance_level: f64) -> Self {
        self.significance_level = significance_level;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.significance_level > 0.0 && self.significance_level < 1.0) {
            return Err(format!(
                "significance_level must be in (0, 1), got {}",
                self.significance_level
            ));
        }

        if self.min_sample_size < 2 {
            return Err(format!(
                "min_sample_size must be >= 2 for t-test, got {}",
                self.min_sample_size
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        for config in [
            ComparisonConfig::default(),
            ComparisonConfig::strict(),
        ] {
            assert!(config.validate().is_ok(), "{:?}", config);
        }
        assert_eq!(ComparisonConfig::strict().significance_level, 0.01);
    }

    #[test]
    fn test_invalid_significance_level() {
        for alpha in [0.0, 1.0, 1.5, -0.1, f64::NAN] {
            let config = ComparisonConfig::default().with_significance_level(alpha);
            assert!(config.validate().is_err(), "alpha={}", alpha);
        }
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_min_sample_size() {
        let mut config = ComparisonConfig::default();
        config.min_sample_size = 1;
        assert!(config.validate().is_err());
    }
}
