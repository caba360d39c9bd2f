// Membership predicates deciding which consumers belong to the workload

use crate::power::ConsumerReading;
use crate::process_tree::{Pid, ProcessTree};
use regex::{Regex, RegexBuilder};
use std::collections::BTreeSet;

/// Predicate over a consumer record
pub trait Membership {
    fn contains(&self, consumer: &ConsumerReading) -> bool;
}

/// Consumer belongs if its PID is in a resolved set
#[derive(Debug, Clone, Default)]
pub struct PidSetMembership {
    pids: BTreeSet<Pid>,
}

impl PidSetMembership {
    pub fn new(pids: BTreeSet<Pid>) -> Self {
        Self { pids }
    }

    /// Root PID plus everything it forked, per the trace
    pub fn from_tree(tree: &ProcessTree, root: Pid) -> Self {
        Self::new(tree.descendants(root))
    }

    pub fn pids(&self) -> &BTreeSet<Pid> {
        &self.pids
    }
}

impl Membership for PidSetMembership {
    fn contains(&self, consumer: &ConsumerReading) -> bool {
        self.pids.contains(&consumer.pid)
    }
}

/// Consumer belongs if its executable path or command line matches
///
/// Unanchored search: `java` matches `/usr/lib/jvm/bin/java`.
#[derive(Debug, Clone)]
pub struct PatternMembership {
    regex: Regex,
}

impl PatternMembership {
    pub fn new(pattern: &str, case_insensitive: bool) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()?;
        Ok(Self { regex })
    }
}

impl Membership for PatternMembership {
    fn contains(&self, consumer: &ConsumerReading) -> bool {
        self.regex.is_match(&consumer.exe) || self.regex.is_match(&consumer.cmdline)
    }
}

/// How a run's workload is identified
///
/// PID mode takes its root from the run's captured root PID; pattern mode
/// needs no trace at all. The two are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributionMode {
    Pid,
    Pattern {
        pattern: String,
        case_insensitive: bool,
    },
}

impl AttributionMode {
    pub fn name(&self) -> &'static str {
        match self {
            AttributionMode::Pid => "pid",
            AttributionMode::Pattern { .. } => "pattern",
        }
    }
}
