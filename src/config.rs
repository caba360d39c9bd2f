//! Experiment configuration loaded from TOML
//!
//! ```toml
//! images = ["library/nginx:1.25", "library/nginx:1.25-alpine"]
//! out = "results"
//!
//! [procedure]
//! external_repetitions = 5
//! internal_repetitions = 10
//!
//! [analysis]
//! mode = "pattern"
//! pattern = "nginx"
//! case_insensitive = true
//! prune_buffer = 0.5
//! ```

use crate::attribution::AttributionMode;
use crate::comparison::ComparisonConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Sampling interval of the power meter, seconds
pub const DEFAULT_SAMPLE_INTERVAL_SECS: f64 = 0.05;

/// Timesheet event bounding the measured block
pub const DEFAULT_PRUNE_MARK: &str = "block";

/// Top-level experiment description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentConfig {
    /// Container images, one variation each
    pub images: Vec<String>,
    /// Root of the per-image run directories
    pub out: PathBuf,
    pub procedure: ProcedureConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcedureConfig {
    /// Independent runs per image
    pub external_repetitions: u32,
    /// Workload repetitions inside one run
    pub internal_repetitions: u32,
    #[serde(default = "default_sample_interval")]
    pub sample_interval_secs: f64,
}

/// How each run is attributed, windowed and compared
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub mode: ModeKind,
    /// Regex for pattern mode; must be absent in PID mode
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub case_insensitive: bool,
    #[serde(default = "default_prune_mark")]
    pub prune_mark: String,
    /// Seconds added on both sides of the prune-mark event
    #[serde(default)]
    pub prune_buffer: f64,
    #[serde(default = "default_true")]
    pub rebase_timestamps: bool,
    /// Index into `images` of the baseline variation
    #[serde(default)]
    pub baseline: usize,
    #[serde(default = "default_significance_level")]
    pub significance_level: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    #[default]
    Pid,
    Pattern,
}

fn default_sample_interval() -> f64 {
    DEFAULT_SAMPLE_INTERVAL_SECS
}

fn default_prune_mark() -> String {
    DEFAULT_PRUNE_MARK.to_string()
}

fn default_true() -> bool {
    true
}

fn default_significance_level() -> f64 {
    0.05
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            mode: ModeKind::Pid,
            pattern: None,
            case_insensitive: false,
            prune_mark: default_prune_mark(),
            prune_buffer: 0.0,
            rebase_timestamps: true,
            baseline: 0,
            significance_level: default_significance_level(),
        }
    }
}

impl AnalysisConfig {
    /// Resolved attribution strategy
    ///
    /// PID mode and pattern mode are mutually exclusive: a pattern in PID
    /// mode, or pattern mode without one, is rejected.
    pub fn attribution(&self) -> Result<AttributionMode, String> {
        match (self.mode, &self.pattern) {
            (ModeKind::Pid, None) => Ok(AttributionMode::Pid),
            (ModeKind::Pid, Some(_)) => {
                Err("analysis.pattern is only valid with mode = \"pattern\"".to_string())
            }
            (ModeKind::Pattern, Some(pattern)) if !pattern.is_empty() => {
                Ok(AttributionMode::Pattern {
                    pattern: pattern.clone(),
                    case_insensitive: self.case_insensitive,
                })
            }
            (ModeKind::Pattern, _) => {
                Err("mode = \"pattern\" requires a non-empty analysis.pattern".to_string())
            }
        }
    }

    pub fn comparison(&self) -> ComparisonConfig {
        ComparisonConfig::default().with_significance_level(self.significance_level)
    }
}

impl ExperimentConfig {
    /// Read and validate a TOML config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML config")?;
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.images.is_empty() {
            return Err("images must list at least one image".to_string());
        }

        if self.procedure.external_repetitions < 1 {
            return Err(format!(
                "external_repetitions must be >= 1, got {}",
                self.procedure.external_repetitions
            ));
        }

        if self.procedure.internal_repetitions < 1 {
            return Err(format!(
                "internal_repetitions must be >= 1, got {}",
                self.procedure.internal_repetitions
            ));
        }

        let interval = self.procedure.sample_interval_secs;
        if interval.is_nan() || interval <= 0.0 {
            return Err(format!(
                "sample_interval_secs must be positive, got {}",
                interval
            ));
        }

        let buffer = self.analysis.prune_buffer;
        if buffer.is_nan() || buffer < 0.0 {
            return Err(format!(
                "prune_buffer must be non-negative, got {}",
                buffer
            ));
        }

        if self.analysis.baseline >= self.images.len() {
            return Err(format!(
                "baseline index {} out of range for {} images",
                self.analysis.baseline,
                self.images.len()
            ));
        }

        self.analysis.attribution()?;
        self.analysis.comparison().validate()?;

        Ok(())
    }

    /// Directory holding run `index` of `image`
    ///
    /// A single external repetition writes directly into the image directory.
    pub fn run_dir(&self, image: &str, index: u32) -> PathBuf {
        let base = self.out.join(display_name(image));
        if self.procedure.external_repetitions > 1 {
            base.join(index.to_string())
        } else {
            base
        }
    }
}

/// Short name of an image reference: `org/name:tag` → `name`
pub fn display_name(image: &str) -> &str {
    let without_tag = match image.rfind(':') {
        // A colon before the last slash belongs to a registry port
        Some(colon) if !image[colon..].contains('/') => &image[..colon],
        _ => image,
    };
    without_tag.rsplit('/').next().unwrap_or(without_tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
images = ["library/nginx:1.25"]
out = "results"

[procedure]
external_repetitions = 3
internal_repetitions = 10
"#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = ExperimentConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.procedure.sample_interval_secs, 0.05);
        assert_eq!(config.analysis.prune_mark, "block");
        assert_eq!(config.analysis.prune_buffer, 0.0);
        assert!(config.analysis.rebase_timestamps);
        assert_eq!(config.analysis.baseline, 0);
        assert_eq!(config.analysis.attribution(), Ok(AttributionMode::Pid));
    }

    #[test]
    fn test_pattern_mode() {
        let content = format!(
            "{}\n[analysis]\nmode = \"pattern\"\npattern = \"java\"\ncase_insensitive = true\n",
            MINIMAL
        );
        let config = ExperimentConfig::from_toml_str(&content).unwrap();
        assert_eq!(
            config.analysis.attribution(),
            Ok(AttributionMode::Pattern {
                pattern: "java".to_string(),
                case_insensitive: true
            })
        );
    }

    #[test]
    fn test_pattern_mode_requires_pattern() {
        let content = format!("{}\n[analysis]\nmode = \"pattern\"\n", MINIMAL);
        assert!(ExperimentConfig::from_toml_str(&content).is_err());
    }

    #[test]
    fn test_pid_mode_rejects_pattern() {
        let content = format!("{}\n[analysis]\npattern = \"java\"\n", MINIMAL);
        assert!(ExperimentConfig::from_toml_str(&content).is_err());
    }

    #[test]
    fn test_zero_repetitions_rejected() {
        let content = MINIMAL.replace("internal_repetitions = 10", "internal_repetitions = 0");
        let err = ExperimentConfig::from_toml_str(&content).unwrap_err();
        assert!(format!("{:#}", err).contains("internal_repetitions"));
    }

    #[test]
    fn test_baseline_out_of_range() {
        let content = format!("{}\n[analysis]\nbaseline = 1\n", MINIMAL);
        assert!(ExperimentConfig::from_toml_str(&content).is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let content = format!("{}\ncooldown = 5\n", MINIMAL);
        assert!(ExperimentConfig::from_toml_str(&content).is_err());
    }

    #[test]
    fn test_run_dir_layout() {
        let config = ExperimentConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(
            config.run_dir("library/nginx:1.25", 2),
            PathBuf::from("results/nginx/2")
        );

        let single = MINIMAL.replace("external_repetitions = 3", "external_repetitions = 1");
        let config = ExperimentConfig::from_toml_str(&single).unwrap();
        assert_eq!(
            config.run_dir("library/nginx:1.25", 0),
            PathBuf::from("results/nginx")
        );
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("library/nginx:1.25"), "nginx");
        assert_eq!(display_name("nginx"), "nginx");
        assert_eq!(display_name("ghcr.io/org/app:latest"), "app");
        assert_eq!(display_name("localhost:5000/app"), "app");
        assert_eq!(display_name("localhost:5000/team/app:v2"), "app");
    }
}
