// Scenario tests for power attribution
//
// Realistic shape: a shell spawns a JVM which forks worker threads-as-processes,
// while unrelated system daemons share the machine.

use super::*;
use crate::power::{ConsumerReading, HostReading, RawSample};
use crate::process_tree::ProcessTree;
use crate::series::EntityId;

fn consumer(pid: u32, exe: &str, timestamp: f64, micro_watts: f64) -> ConsumerReading {
    ConsumerReading {
        pid,
        exe: exe.to_string(),
        cmdline: format!("{} --run", exe),
        timestamp,
        consumption: micro_watts,
    }
}

fn raw(timestamp: f64, host_micro_watts: f64, consumers: Vec<ConsumerReading>) -> RawSample {
    RawSample {
        host: HostReading {
            timestamp,
            consumption: host_micro_watts,
        },
        consumers,
    }
}

fn stream() -> Vec<RawSample> {
    vec![
        raw(
            100.0,
            20_000_000.0,
            vec![
                consumer(500, "/bin/sh", 100.02, 1_000_000.0),
                consumer(501, "/usr/bin/java", 99.98, 8_000_000.0),
                consumer(900, "/usr/sbin/sshd", 100.01, 500_000.0),
            ],
        ),
        raw(
            101.0,
            22_000_000.0,
            vec![
                // Out of order within the entry
                consumer(502, "/usr/bin/java", 101.03, 3_000_000.0),
                consumer(501, "/usr/bin/java", 101.01, 9_000_000.0),
            ],
        ),
        raw(
            102.0,
            21_000_000.0,
            vec![
                consumer(501, "/usr/bin/java", 100.99, 7_000_000.0),
                consumer(900, "/usr/sbin/sshd", 102.0, 400_000.0),
            ],
        ),
    ]
}

const TRACE: &str = "\
99.0 C1: containerd-shim (400) -> sh (500)
99.1 C2: sh (500) -> java (501)
99.2 C3: java (501) -> java (502)
99.3 C4: systemd (1) -> sshd (900)
";

#[test]
fn test_host_series_converts_units() {
    let host = host_series(&stream(), &Timebase::absolute());
    assert_eq!(host.entity, EntityId::Host);
    assert_eq!(host.values(), vec![20.0, 22.0, 21.0]);
    assert_eq!(host.timestamps(), vec![100.0, 101.0, 102.0]);
}

#[test]
fn test_rebase_uses_earliest_reading_of_first_entry() {
    let raw = stream();
    let timebase = Timebase::rebased(&raw);
    assert_eq!(timebase.offset(), 99.98);

    let host = host_series(&raw, &timebase);
    let first = host.first_timestamp().unwrap();
    assert!((first - 0.02).abs() < 1e-9, "host starts after the JVM reading");
}

#[test]
fn test_pid_attribution_follows_descendants() {
    let tree = ProcessTree::from_trace(TRACE);
    let membership = PidSetMembership::from_tree(&tree, 500);
    let series = attributed_series(&stream(), &membership, &Timebase::absolute());

    let pids: Vec<u32> = series.keys().copied().collect();
    assert_eq!(pids, vec![500, 501, 502]);
    assert!(!series.contains_key(&900), "unrelated daemon is not charged");
}

#[test]
fn test_attributed_series_sorted_across_entries() {
    let membership = PidSetMembership::new([501].into_iter().collect());
    let series = attributed_series(&stream(), &membership, &Timebase::absolute());
    let java = &series[&501];

    // 100.99 was reported in a later entry but belongs before 101.01
    assert_eq!(java.timestamps(), vec![99.98, 100.99, 101.01]);
    assert_eq!(java.values(), vec![8.0, 7.0, 9.0]);
    assert!(java.is_monotonic());
}

#[test]
fn test_pattern_attribution() {
    let membership = PatternMembership::new("JAVA", true).unwrap();
    let series = attributed_series(&stream(), &membership, &Timebase::absolute());
    assert_eq!(series.keys().copied().collect::<Vec<_>>(), vec![501, 502]);
}

#[test]
fn test_no_matching_consumers_yields_empty_map() {
    let membership = PatternMembership::new("postgres", false).unwrap();
    let series = attributed_series(&stream(), &membership, &Timebase::absolute());
    assert!(series.is_empty());
}

#[test]
fn test_aggregate_series_sums_per_entry() {
    let membership = PatternMembership::new("java", false).unwrap();
    let series = aggregate_series(&stream(), &membership, "java", &Timebase::absolute());

    assert_eq!(series.entity, EntityId::Label("java".to_string()));
    assert_eq!(series.timestamps(), vec![100.0, 101.0, 102.0]);
    assert_eq!(series.values(), vec![8.0, 12.0, 7.0]);
}

#[test]
fn test_series_set_iterates_host_first() {
    let raw = stream();
    let timebase = Timebase::absolute();
    let membership = PatternMembership::new("java", false).unwrap();
    let set = SeriesSet {
        host: host_series(&raw, &timebase),
        consumers: attributed_series(&raw, &membership, &timebase),
    };

    let entities: Vec<String> = set.iter().map(|s| s.entity.to_string()).collect();
    assert_eq!(entities, vec!["host", "501", "502"]);
}

#[test]
fn test_raw_input_is_not_mutated() {
    let raw = stream();
    let before = raw.clone();
    let membership = PidSetMembership::new([501, 502].into_iter().collect());
    let _ = attributed_series(&raw, &membership, &Timebase::rebased(&raw));
    assert_eq!(raw, before);
}
