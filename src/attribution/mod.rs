// Power Attribution for Workload Energy Accounting
//
// Objective: Split a raw power stream into one series for the host and one
// series per consumer process that belongs to the measured workload.
//
// Key Insight: The meter reports every process on the machine. Only the
// processes that descend from the workload root (or that match a pattern for
// workloads whose PID is not known up front) should be charged.
//
// Two membership strategies are supported:
// - PID set: descendants of the workload root resolved from the fork trace
// - Pattern: regex over the consumer's executable path or command line

mod membership;
mod series;

pub use membership::{AttributionMode, Membership, PatternMembership, PidSetMembership};
pub use series::{aggregate_series, attributed_series, host_series, SeriesSet, Timebase};

#[cfg(test)]
mod tests;
