//! Blocked-interval accounting.
//!
//! A process is blocked iff it has at least one unsatisfied request in the
//! graph. The tracker records when each process most recently flipped into
//! that state and folds the elapsed interval into a running total when it
//! flips back out, so interval boundaries land exactly on the event
//! timestamps that caused the transitions.

use std::collections::BTreeMap;

use gridlock_graph::AllocGraph;

/// Per-process blocked-time bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct BlockingTracker {
    /// Timestamp at which each currently-blocked process became blocked.
    blocked_since: BTreeMap<String, u64>,
    /// Accumulated blocked time across completed intervals.
    total_blocked: BTreeMap<String, u64>,
}

impl BlockingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-derives each process's blocked state from the live graph and
    /// opens or closes intervals on transitions. `known` must cover every
    /// process ever seen, not just the currently-registered ones.
    pub fn refresh<'a>(
        &mut self,
        graph: &AllocGraph,
        known: impl IntoIterator<Item = &'a str>,
        now: u64,
    ) {
        for process in known {
            let blocked = graph.is_blocked(process);
            let open = self.blocked_since.contains_key(process);
            if blocked && !open {
                self.blocked_since.insert(process.to_string(), now);
            } else if !blocked && open {
                self.fold(process, now);
            }
        }
    }

    /// Closes the process's open interval at `now`, if it has one.
    ///
    /// Used on a finish event before termination removes the process's
    /// edges and its blocked state becomes meaningless.
    pub fn close_open(&mut self, process: &str, now: u64) {
        if self.blocked_since.contains_key(process) {
            self.fold(process, now);
        }
    }

    /// Folds every still-open interval up to `final_time`. Invoked once at
    /// simulation end, whether that end was a deadlock halt or an exhausted
    /// event stream.
    pub fn close_all(&mut self, final_time: u64) {
        let open: Vec<String> = self.blocked_since.keys().cloned().collect();
        for process in open {
            self.fold(&process, final_time);
        }
    }

    fn fold(&mut self, process: &str, now: u64) {
        if let Some(since) = self.blocked_since.remove(process) {
            *self.total_blocked.entry(process.to_string()).or_insert(0) +=
                now.saturating_sub(since);
        }
    }

    /// Total blocked time accumulated for a process.
    pub fn total(&self, process: &str) -> u64 {
        self.total_blocked.get(process).copied().unwrap_or(0)
    }

    /// Sum of blocked time over all processes.
    pub fn total_sum(&self) -> u64 {
        self.total_blocked.values().sum()
    }

    /// True iff the process currently has an open blocked interval.
    pub fn is_open(&self, process: &str) -> bool {
        self.blocked_since.contains_key(process)
    }
}
