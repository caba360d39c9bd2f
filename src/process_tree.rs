//! Process ancestry reconstruction from a fork/exit trace
//!
//! The capture layer writes one line per scheduler event:
//!
//! ```text
//! 12.000000001 C12000000001: bash (4120) -> java (4121)
//! 15.500000000 E15500000000: java (4121)
//! ```
//!
//! Fork lines carry a `->` between parent and child; exit lines carry a single
//! `(<pid>)` group. Anything else is skipped. Exit records are parsed but do
//! not change the tree: a PID that exited before the measured window still
//! owned the energy it consumed while alive.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

pub type Pid = u32;

/// One parsed trace line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    Fork { parent: Pid, child: Pid },
    Exit { pid: Pid },
}

impl TraceEvent {
    /// Parse a single trace line, returning `None` for malformed input
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let parts: Vec<&str> = line.split(" -> ").collect();
        match parts.as_slice() {
            [parent, child] => Some(TraceEvent::Fork {
                parent: last_pid_group(parent)?,
                child: last_pid_group(child)?,
            }),
            [single] if !single.contains("->") => Some(TraceEvent::Exit {
                pid: last_pid_group(single)?,
            }),
            _ => None,
        }
    }
}

/// Extract the PID from the last `(...)` group of a process descriptor
///
/// Command names may themselves contain parentheses (`(sd-pam)`), so the
/// last group wins.
fn last_pid_group(descriptor: &str) -> Option<Pid> {
    let open = descriptor.rfind('(')?;
    let close = open + descriptor[open..].find(')')?;
    descriptor[open + 1..close].trim().parse().ok()
}

/// Parent → children map built from fork events
///
/// A PID is a key only if it has spawned at least one child, and each child
/// has at most one parent. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessTree {
    children: BTreeMap<Pid, BTreeSet<Pid>>,
}

impl ProcessTree {
    /// Build the tree from parsed events
    ///
    /// If a child is reported under two parents the later fork wins and the
    /// earlier edge is removed.
    pub fn build<I>(events: I) -> Self
    where
        I: IntoIterator<Item = TraceEvent>,
    {
        let mut children: BTreeMap<Pid, BTreeSet<Pid>> = BTreeMap::new();
        let mut parent_of: HashMap<Pid, Pid> = HashMap::new();

        for event in events {
            let TraceEvent::Fork { parent, child } = event else {
                continue;
            };

            if let Some(previous) = parent_of.insert(child, parent) {
                if previous != parent {
                    tracing::warn!(
                        "PID {} re-parented from {} to {}; keeping latest fork",
                        child,
                        previous,
                        parent
                    );
                    if let Some(siblings) = children.get_mut(&previous) {
                        siblings.remove(&child);
                        if siblings.is_empty() {
                            children.remove(&previous);
                        }
                    }
                }
            }

            children.entry(parent).or_default().insert(child);
        }

        Self { children }
    }

    /// Parse raw trace text and build the tree, skipping malformed lines
    pub fn from_trace(content: &str) -> Self {
        let mut skipped = 0usize;
        let events = content.lines().filter_map(|line| {
            let event = TraceEvent::parse(line);
            if event.is_none() && !line.trim().is_empty() {
                skipped += 1;
                tracing::trace!("Skipping malformed trace line: {:?}", line);
            }
            event
        });
        let tree = Self::build(events.collect::<Vec<_>>());

        if skipped > 0 {
            tracing::debug!("Skipped {} malformed trace lines", skipped);
        }
        tree
    }

    /// Children of `pid`, if it ever forked
    pub fn children(&self, pid: Pid) -> Option<&BTreeSet<Pid>> {
        self.children.get(&pid)
    }

    /// Number of PIDs that spawned at least one child
    pub fn parent_count(&self) -> usize {
        self.children.len()
    }

    /// All PIDs reachable from `root` through child edges, `root` included
    ///
    /// Iterative depth-first walk with a visited set, so neither deep chains
    /// nor an inconsistent (cyclic) input can blow the stack or loop forever.
    pub fn descendants(&self, root: Pid) -> BTreeSet<Pid> {
        let mut visited: HashSet<Pid> = HashSet::new();
        let mut stack = vec![root];

        while let Some(pid) = stack.pop() {
            if !visited.insert(pid) {
                continue;
            }
            if let Some(children) = self.children.get(&pid) {
                stack.extend(children.iter().filter(|c| !visited.contains(*c)));
            }
        }

        visited.into_iter().collect()
    }
}
