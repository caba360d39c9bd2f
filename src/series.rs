//! Time series primitives shared by windowing, attribution and aggregation
//!
//! A [`Series`] is an ordered run of `(timestamp, value)` samples owned by one
//! entity: the host, a single PID, or an aggregation label.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Power reading at a point in time
///
/// `timestamp` is in seconds, `value` in watts once it has left the raw
/// ingestion layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: f64,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: f64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Owner of a series
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityId {
    /// Whole-machine reading
    Host,
    /// A single attributed process
    Pid(u32),
    /// Several consumers summed under one name
    Label(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Host => write!(f, "host"),
            EntityId::Pid(pid) => write!(f, "{}", pid),
            EntityId::Label(label) => write!(f, "{}", label),
        }
    }
}

/// Ordered sequence of samples for one entity
///
/// Timestamps are non-decreasing; ties are allowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub entity: EntityId,
    pub samples: Vec<Sample>,
}

impl Series {
    pub fn new(entity: EntityId, samples: Vec<Sample>) -> Self {
        Self { entity, samples }
    }

    /// Build a series from samples in arbitrary order
    ///
    /// The sort is stable so samples sharing a timestamp keep their
    /// collection order.
    pub fn from_unsorted(entity: EntityId, mut samples: Vec<Sample>) -> Self {
        samples.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Self { entity, samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn timestamps(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.timestamp).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    pub fn first_timestamp(&self) -> Option<f64> {
        self.samples.first().map(|s| s.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<f64> {
        self.samples.last().map(|s| s.timestamp)
    }

    /// Check the non-decreasing timestamp invariant
    pub fn is_monotonic(&self) -> bool {
        self.samples
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp)
    }
}

/// A named phase of an experiment run, e.g. the measured `block`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimesheetEvent {
    pub name: String,
    pub start: f64,
    pub end: f64,
    pub duration: f64,
}

impl TimesheetEvent {
    pub fn new(name: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            name: name.into(),
            start,
            end,
            duration: end - start,
        }
    }
}

/// Ordered list of phase boundaries for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Timesheet {
    pub events: Vec<TimesheetEvent>,
}

/// On-disk shape written by the experiment runner: `{"<name>": {...}}`
#[derive(Debug, Deserialize)]
struct KeyedTiming {
    start: f64,
    end: f64,
    #[serde(default)]
    duration: Option<f64>,
}

impl Timesheet {
    pub fn new(events: Vec<TimesheetEvent>) -> Self {
        Self { events }
    }

    /// First event with the given name
    pub fn find(&self, name: &str) -> Option<&TimesheetEvent> {
        self.events.iter().find(|event| event.name == name)
    }

    /// Parse a timesheet from JSON
    ///
    /// Accepts both `[{"name": .., "start": .., "end": .., "duration": ..}]`
    /// and the keyed form `[{"<name>": {"start": .., "end": .., "duration": ..}}]`.
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        let raw: Vec<serde_json::Value> = serde_json::from_str(content)?;
        let mut events = Vec::with_capacity(raw.len());

        for value in raw {
            if value.get("name").is_some() {
                events.push(serde_json::from_value::<TimesheetEvent>(value)?);
                continue;
            }

            let keyed: std::collections::BTreeMap<String, KeyedTiming> =
                serde_json::from_value(value)?;
            for (name, timing) in keyed {
                events.push(TimesheetEvent {
                    duration: timing.duration.unwrap_or(timing.end - timing.start),
                    name,
                    start: timing.start,
                    end: timing.end,
                });
            }
        }

        Ok(Self { events })
    }
}
