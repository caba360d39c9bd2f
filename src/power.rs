//! Raw power-sample stream as written by the capture layer
//!
//! Each entry carries one host reading and the per-process consumers that the
//! power meter attributed at that instant. Consumption is in microwatts.
//! Fields the analysis does not use (resource usage, socket breakdown) are
//! ignored on deserialisation.

use crate::window::Timestamped;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Raw readings are reported in micro-units
pub const MICRO_UNITS_PER_UNIT: f64 = 1_000_000.0;

/// Whole-machine reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HostReading {
    pub timestamp: f64,
    pub consumption: f64,
}

/// A single process's share of the measured power
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumerReading {
    pub pid: u32,
    #[serde(default)]
    pub exe: String,
    #[serde(default)]
    pub cmdline: String,
    pub timestamp: f64,
    pub consumption: f64,
}

/// One entry of the raw stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub host: HostReading,
    #[serde(default)]
    pub consumers: Vec<ConsumerReading>,
}

impl Timestamped for RawSample {
    fn timestamp(&self) -> f64 {
        self.host.timestamp
    }
}

impl RawSample {
    /// Earliest timestamp across the host and all consumers of this entry
    pub fn earliest_timestamp(&self) -> f64 {
        self.consumers
            .iter()
            .map(|c| c.timestamp)
            .fold(self.host.timestamp, f64::min)
    }
}

/// Parse a raw power stream
///
/// Accepts a JSON array of entries or a sequence of concatenated objects
/// (`{...}{...}`), which is what the meter writes when it is stopped without
/// closing its output.
pub fn parse_stream(content: &str) -> Result<Vec<RawSample>> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("Failed to parse power sample array");
    }

    serde_json::Deserializer::from_str(trimmed)
        .into_iter::<RawSample>()
        .enumerate()
        .map(|(index, entry)| {
            entry.with_context(|| format!("Failed to parse power sample #{}", index))
        })
        .collect()
}
