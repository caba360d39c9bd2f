// Projection of the raw power stream into per-entity series
//
// Raw consumption is reported in micro-units; every series produced here is
// converted to watts. Consumer entries are not guaranteed to be time-ordered,
// so per-PID series are sorted after collection.

use super::membership::Membership;
use crate::power::{RawSample, MICRO_UNITS_PER_UNIT};
use crate::process_tree::Pid;
use crate::series::{EntityId, Sample, Series};
use std::collections::BTreeMap;

/// Time origin applied to every series of one run
///
/// Host and consumer streams may start at slightly different instants, so the
/// rebased origin is the earliest timestamp of any reading in the first raw
/// entry, not the host's own first timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timebase {
    offset: f64,
}

impl Timebase {
    /// Keep timestamps as captured
    pub fn absolute() -> Self {
        Self { offset: 0.0 }
    }

    /// Shift timestamps so the first raw entry starts at zero
    pub fn rebased(raw: &[RawSample]) -> Self {
        let offset = raw.first().map(RawSample::earliest_timestamp).unwrap_or(0.0);
        Self { offset }
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    fn apply(&self, timestamp: f64) -> f64 {
        timestamp - self.offset
    }
}

impl Default for Timebase {
    fn default() -> Self {
        Self::absolute()
    }
}

/// Host series plus one series per attributed PID
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSet {
    pub host: Series,
    pub consumers: BTreeMap<Pid, Series>,
}

impl SeriesSet {
    /// Host first, then consumers in PID order
    pub fn iter(&self) -> impl Iterator<Item = &Series> {
        std::iter::once(&self.host).chain(self.consumers.values())
    }
}

/// Whole-machine power over time
pub fn host_series(raw: &[RawSample], timebase: &Timebase) -> Series {
    let samples = raw
        .iter()
        .map(|entry| {
            Sample::new(
                timebase.apply(entry.host.timestamp),
                entry.host.consumption / MICRO_UNITS_PER_UNIT,
            )
        })
        .collect();

    Series::from_unsorted(EntityId::Host, samples)
}

/// One series per consumer PID accepted by `membership`
///
/// A workload with no matching consumers yields an empty map.
pub fn attributed_series<M: Membership + ?Sized>(
    raw: &[RawSample],
    membership: &M,
    timebase: &Timebase,
) -> BTreeMap<Pid, Series> {
    let mut collected: BTreeMap<Pid, Vec<Sample>> = BTreeMap::new();

    for entry in raw {
        for consumer in entry.consumers.iter().filter(|c| membership.contains(c)) {
            collected.entry(consumer.pid).or_default().push(Sample::new(
                timebase.apply(consumer.timestamp),
                consumer.consumption / MICRO_UNITS_PER_UNIT,
            ));
        }
    }

    collected
        .into_iter()
        .map(|(pid, samples)| (pid, Series::from_unsorted(EntityId::Pid(pid), samples)))
        .collect()
}

/// Sum of all matching consumers per raw entry, stamped with the host time
///
/// Entries with no matching consumer contribute a zero sample so the series
/// stays aligned with the host series.
pub fn aggregate_series<M: Membership + ?Sized>(
    raw: &[RawSample],
    membership: &M,
    label: &str,
    timebase: &Timebase,
) -> Series {
    let samples = raw
        .iter()
        .map(|entry| {
            let total: f64 = entry
                .consumers
                .iter()
                .filter(|c| membership.contains(c))
                .map(|c| c.consumption)
                .sum();
            Sample::new(
                timebase.apply(entry.host.timestamp),
                total / MICRO_UNITS_PER_UNIT,
            )
        })
        .collect();

    Series::from_unsorted(EntityId::Label(label.to_string()), samples)
}
