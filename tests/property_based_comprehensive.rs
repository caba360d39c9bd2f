//! Comprehensive property-based tests for pre-commit hook
//!
//! Covers the core invariants of vatio with proptest. Designed to run in a
//! few seconds as a pre-commit quality gate.
//!
//! Properties tested:
//! 1. Descendant closure of the process tree
//! 2. Window monotonicity and boundary refusal
//! 3. Energy integration of constant and degenerate series
//! 4. Percentage-change sign convention
//! 5. Trace-line parser robustness

use proptest::prelude::*;
use std::collections::BTreeSet;
use vatio::aggregate::{energy, timestamp_statistics, AggregateError};
use vatio::comparison::percentage_change;
use vatio::process_tree::{ProcessTree, TraceEvent};
use vatio::series::{EntityId, Sample, Series};
use vatio::window::{closest_index, window_between, Direction, WindowError};

/// Strictly increasing timestamps with irregular gaps
fn timestamps() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.01f64..2.0, 2..60).prop_map(|gaps| {
        let mut t = 0.0;
        gaps.into_iter()
            .map(|gap| {
                t += gap;
                t
            })
            .collect()
    })
}

fn samples(timestamps: &[f64], value: f64) -> Vec<Sample> {
    timestamps.iter().map(|&t| Sample::new(t, value)).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_descendants_closed_under_children(
        edges in prop::collection::vec((1u32..50, 1u32..50), 0..80),
        root in 1u32..50,
    ) {
        let tree = ProcessTree::build(
            edges.iter().map(|&(parent, child)| TraceEvent::Fork { parent, child }),
        );
        let closure = tree.descendants(root);

        prop_assert!(closure.contains(&root));
        for pid in &closure {
            if let Some(children) = tree.children(*pid) {
                for child in children {
                    prop_assert!(closure.contains(child));
                }
            }
        }
    }

    #[test]
    fn prop_descendants_of_unknown_root_is_singleton(
        edges in prop::collection::vec((1u32..50, 1u32..50), 0..40),
    ) {
        let tree = ProcessTree::build(
            edges.iter().map(|&(parent, child)| TraceEvent::Fork { parent, child }),
        );
        prop_assert_eq!(tree.descendants(1000), BTreeSet::from([1000]));
    }

    #[test]
    fn prop_tree_keys_have_children_and_single_parent(
        edges in prop::collection::vec((1u32..30, 1u32..30), 0..60),
    ) {
        let tree = ProcessTree::build(
            edges.iter().map(|&(parent, child)| TraceEvent::Fork { parent, child }),
        );
        let mut seen = BTreeSet::new();
        for parent in 1u32..30 {
            if let Some(children) = tree.children(parent) {
                prop_assert!(!children.is_empty());
                for child in children {
                    prop_assert!(seen.insert(*child), "child {} has two parents", child);
                }
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_window_shrinks_with_buffer(
        ts in timestamps(),
        start_frac in 0.0f64..0.5,
        end_frac in 0.5f64..1.0,
        buffer in 0.0f64..1.0,
    ) {
        let series = samples(&ts, 1.0);
        let first = ts[0];
        let last = ts[ts.len() - 1];
        let span = last - first;
        let start = first + span * start_frac;
        let end = first + span * end_frac;

        let narrow = window_between(&series, start, end).unwrap();
        let wide_start = (start - buffer).max(first);
        let wide_end = (end + buffer).min(last);
        let wide = window_between(&series, wide_start, wide_end).unwrap();

        prop_assert!(narrow.len() <= wide.len());
        for s in narrow {
            prop_assert!(s.timestamp >= start && s.timestamp <= end);
        }
    }

    #[test]
    fn prop_window_refuses_out_of_range(ts in timestamps(), overshoot in 0.001f64..10.0) {
        let series = samples(&ts, 1.0);
        let first = ts[0];
        let last = ts[ts.len() - 1];

        let before = window_between(&series, first - overshoot, last);
        let is_before_first = matches!(before, Err(WindowError::BeforeFirstSample { .. }));
        prop_assert!(is_before_first);
        let after = window_between(&series, first, last + overshoot);
        let is_after_last = matches!(after, Err(WindowError::AfterLastSample { .. }));
        prop_assert!(is_after_last);
    }

    #[test]
    fn prop_closest_index_matches_linear_scan(ts in timestamps(), frac in 0.0f64..1.0) {
        let series = samples(&ts, 1.0);
        let target = ts[0] + (ts[ts.len() - 1] - ts[0]) * frac;

        let forward = ts.iter().position(|&t| t >= target).unwrap();
        let backward = ts.iter().rposition(|&t| t <= target).unwrap();
        prop_assert_eq!(closest_index(&series, target, Direction::Forward).unwrap(), forward);
        prop_assert_eq!(closest_index(&series, target, Direction::Backward).unwrap(), backward);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_constant_power_energy(ts in timestamps(), watts in 0.0f64..500.0) {
        let series = Series::new(EntityId::Host, samples(&ts, watts));
        let expected = watts * (ts[ts.len() - 1] - ts[0]);
        prop_assert!((energy(&series) - expected).abs() <= 1e-9 * expected.max(1.0));
    }

    #[test]
    fn prop_single_sample_energy_zero(t in 0.0f64..1e6, watts in 0.0f64..500.0) {
        let series = Series::new(EntityId::Host, vec![Sample::new(t, watts)]);
        prop_assert_eq!(energy(&series), 0.0);
        prop_assert_eq!(
            timestamp_statistics(&series),
            Err(AggregateError::InsufficientData { required: 2, actual: 1 })
        );
    }

    #[test]
    fn prop_percentage_change_sign(baseline in 1.0f64..1e4, value in 0.0f64..1e4) {
        let pct = percentage_change(baseline, value).unwrap();
        if value < baseline {
            prop_assert!(pct >= 0.0);
        } else {
            prop_assert!(pct <= 0.0);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_trace_parser_never_panics(line in ".{0,80}") {
        let _ = TraceEvent::parse(&line);
    }

    #[test]
    fn prop_trace_parser_reads_fork_lines(
        parent in 1u32..100_000,
        child in 1u32..100_000,
        comm in "[a-z][a-z0-9_-]{0,12}",
    ) {
        let line = format!("{} ({}) -> {} ({})", comm, parent, comm, child);
        prop_assert_eq!(TraceEvent::parse(&line), Some(TraceEvent::Fork { parent, child }));
    }
}

#[test]
fn test_window_boundary_violation_at_minus_one() {
    let series = samples(&[0.0, 1.0, 2.0], 1.0);
    assert_eq!(
        closest_index(&series, -1.0, Direction::Forward),
        Err(WindowError::BeforeFirstSample {
            target: -1.0,
            first: 0.0
        })
    );
}
