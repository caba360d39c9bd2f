//! Trimming a sampled time series to an experiment phase
//!
//! Windowing refuses to clamp. If the series does not reach far enough to
//! cover the requested boundary the call fails: a clamped window would
//! silently shrink or stretch the integration range and corrupt the energy
//! figure without any visible signal.
//!
//! Window convention: CLOSED on both ends. The returned slice runs from the
//! first sample at or after `start` through the last sample at or before
//! `end`, both included.

use crate::series::{Sample, Timesheet};
use thiserror::Error;

/// Anything carrying a position on the sample time axis
pub trait Timestamped {
    fn timestamp(&self) -> f64;
}

impl Timestamped for Sample {
    fn timestamp(&self) -> f64 {
        self.timestamp
    }
}

/// Scan direction for [`closest_index`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Smallest index with `timestamp >= target`
    Forward,
    /// Largest index with `timestamp <= target`
    Backward,
}

/// Reasons a window cannot be cut
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WindowError {
    #[error("Cannot window an empty series")]
    EmptySeries,

    #[error("Requested time {target} is before the first sample at {first}")]
    BeforeFirstSample { target: f64, first: f64 },

    #[error("Requested time {target} is after the last sample at {last}")]
    AfterLastSample { target: f64, last: f64 },

    #[error("Timesheet event '{0}' not found")]
    EventNotFound(String),
}

/// Locate the sample closest to `target` in the given direction
///
/// Equivalent to a linear scan from the start (`Forward`) or from the end
/// (`Backward`) over a non-decreasing series, implemented with a binary
/// search. Ties resolve to the first matching index for `Forward` and the
/// last matching index for `Backward`.
///
/// # Errors
/// - `Forward` with `target` before the first sample, or past the last one
/// - `Backward` with `target` after the last sample, or before the first one
///
/// # Example
/// ```
/// use vatio::series::Sample;
/// use vatio::window::{closest_index, Direction};
///
/// let series = vec![Sample::new(0.0, 5.0), Sample::new(10.0, 5.0)];
/// assert_eq!(closest_index(&series, 4.0, Direction::Forward).unwrap(), 1);
/// assert_eq!(closest_index(&series, 4.0, Direction::Backward).unwrap(), 0);
/// assert!(closest_index(&series, -1.0, Direction::Forward).is_err());
/// ```
pub fn closest_index<T: Timestamped>(
    series: &[T],
    target: f64,
    direction: Direction,
) -> Result<usize, WindowError> {
    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        return Err(WindowError::EmptySeries);
    };
    let first = first.timestamp();
    let last = last.timestamp();

    match direction {
        Direction::Forward => {
            if target < first {
                return Err(WindowError::BeforeFirstSample { target, first });
            }
            let index = series.partition_point(|s| s.timestamp() < target);
            if index == series.len() {
                return Err(WindowError::AfterLastSample { target, last });
            }
            Ok(index)
        }
        Direction::Backward => {
            if target > last {
                return Err(WindowError::AfterLastSample { target, last });
            }
            let upper = series.partition_point(|s| s.timestamp() <= target);
            if upper == 0 {
                return Err(WindowError::BeforeFirstSample { target, first });
            }
            Ok(upper - 1)
        }
    }
}

/// Slice `series` to the named timesheet event, widened by `buffer` seconds
/// on each side
///
/// Returns an empty slice when the interval falls strictly between two
/// consecutive samples.
pub fn window<'a, T: Timestamped>(
    series: &'a [T],
    timesheet: &Timesheet,
    event_name: &str,
    buffer: f64,
) -> Result<&'a [T], WindowError> {
    let event = timesheet
        .find(event_name)
        .ok_or_else(|| WindowError::EventNotFound(event_name.to_string()))?;

    window_between(series, event.start - buffer, event.end + buffer)
}

/// Slice `series` to the closed interval `[start, end]`
pub fn window_between<T: Timestamped>(
    series: &[T],
    start: f64,
    end: f64,
) -> Result<&[T], WindowError> {
    let start_index = closest_index(series, start, Direction::Forward)?;
    let end_index = closest_index(series, end, Direction::Backward)?;

    if start_index > end_index {
        return Ok(&series[start_index..start_index]);
    }
    Ok(&series[start_index..=end_index])
}
