//! Event-driven replay engine for resource contention scenarios.
//!
//! Replays a timestamped event list against the allocation graph, checking
//! for a cycle after every request and halting the instant one appears.
//! "Blocked" here is a modeled property of a simulated process, not an
//! execution pause: the replay itself is strictly sequential and
//! deterministic (events sorted by time, original order kept on ties).

use std::collections::{BTreeMap, BTreeSet};

use gridlock_graph::{AllocGraph, RequestOutcome, detect};
use gridlock_types::{
    DeadlockReport, Event, EventKind, ProcessReport, Scenario, SimReport, TraceEvent, TraceKind,
};
use tracing::{debug, info};

pub mod blocking;

pub use blocking::BlockingTracker;

/// Replays one scenario and aggregates metrics.
///
/// Owns the graph, the blocking tracker, and the per-process timestamps
/// for the duration of a single run; there is no shared or concurrent
/// access to any of it.
#[derive(Debug, Default)]
pub struct Simulator {
    graph: AllocGraph,
    tracker: BlockingTracker,
    /// First time each process was mentioned by a request event.
    arrivals: BTreeMap<String, u64>,
    /// Finish event time per process.
    finishes: BTreeMap<String, u64>,
    trace: Vec<TraceEvent>,
    deadlock: Option<DeadlockReport>,
}

impl Simulator {
    /// Creates a simulator with the given resources pre-registered.
    pub fn new<'a>(resources: impl IntoIterator<Item = &'a str>) -> Self {
        let mut sim = Self::default();
        for resource in resources {
            sim.graph.add_resource(resource);
        }
        sim
    }

    /// Runs a whole scenario: registers its resources, replays its events.
    pub fn run(scenario: &Scenario) -> SimReport {
        Self::new(scenario.resources.iter().map(String::as_str)).replay(&scenario.events)
    }

    /// Replays the events in time order and produces the final report.
    ///
    /// An empty event list is a benign no-op and yields a zeroed report.
    pub fn replay(mut self, events: &[Event]) -> SimReport {
        if events.is_empty() {
            info!("no events to simulate");
            return SimReport::default();
        }

        let mut events: Vec<Event> = events.to_vec();
        // stable sort: ties keep their original relative order
        events.sort_by_key(|event| event.time);
        let first_time = events[0].time;
        let last_time = events[events.len() - 1].time;

        for event in &events {
            match &event.kind {
                EventKind::Request { process, resource } => {
                    self.handle_request(event.time, process, resource);
                    if self.deadlock.is_some() {
                        break;
                    }
                }
                EventKind::Finish { process } => {
                    self.handle_finish(event.time, process);
                }
            }
        }

        let final_time = self
            .deadlock
            .as_ref()
            .map(|d| d.time)
            .unwrap_or(last_time);
        self.tracker.close_all(final_time);
        self.report(first_time, final_time)
    }

    fn handle_request(&mut self, time: u64, process: &str, resource: &str) {
        debug!(time, process = %process, resource = %resource, "request");
        self.arrivals.entry(process.to_string()).or_insert(time);

        match self.graph.request_resource(process, resource) {
            RequestOutcome::Granted => self.trace.push(TraceEvent {
                time,
                kind: TraceKind::Granted {
                    resource: resource.to_string(),
                    process: process.to_string(),
                },
            }),
            RequestOutcome::Waiting { holder } => self.trace.push(TraceEvent {
                time,
                kind: TraceKind::Waiting {
                    process: process.to_string(),
                    resource: resource.to_string(),
                    holder,
                },
            }),
        }

        self.refresh_blocking(time);

        if let Some(cycle) = detect::find_cycle(&self.graph) {
            let cycle: Vec<String> = cycle
                .cycle_path
                .iter()
                .map(|node| node.label().to_string())
                .collect();
            info!(time, cycle = ?cycle, "deadlock detected, halting replay");
            self.deadlock = Some(DeadlockReport { time, cycle });
        }
    }

    fn handle_finish(&mut self, time: u64, process: &str) {
        debug!(time, process = %process, "finish");

        // Fold the open interval before termination removes the process's
        // edges and makes its blocked state meaningless.
        self.tracker.close_open(process, time);

        if let Some(termination) = self.graph.terminate_process(process) {
            self.trace.push(TraceEvent {
                time,
                kind: TraceKind::Terminated {
                    process: process.to_string(),
                },
            });
            for (resource, regrant) in termination.released {
                if let Some(next) = regrant {
                    self.trace.push(TraceEvent {
                        time,
                        kind: TraceKind::Regranted {
                            resource,
                            process: next,
                        },
                    });
                }
            }
        }

        self.finishes.insert(process.to_string(), time);

        // Knock-on effects: a regrant may have unblocked other processes.
        self.refresh_blocking(time);
    }

    fn refresh_blocking(&mut self, now: u64) {
        let known: Vec<String> = self.arrivals.keys().cloned().collect();
        self.tracker
            .refresh(&self.graph, known.iter().map(String::as_str), now);
    }

    fn report(self, first_time: u64, final_time: u64) -> SimReport {
        let completed = self.finishes.len() as u64;
        let duration_units = final_time.saturating_sub(first_time).max(1);
        let processes_seen = self.arrivals.len() as u64;

        let throughput = completed as f64 / duration_units as f64;
        // divisor is every process that ever arrived, by convention
        let avg_wait_units = self.tracker.total_sum() as f64 / processes_seen.max(1) as f64;

        let mut ids: BTreeSet<String> = self.arrivals.keys().cloned().collect();
        ids.extend(self.finishes.keys().cloned());
        let processes = ids
            .into_iter()
            .map(|id| ProcessReport {
                arrival: self.arrivals.get(&id).copied(),
                finish: self.finishes.get(&id).copied(),
                total_blocked: self.tracker.total(&id),
                id,
            })
            .collect();

        SimReport {
            completed,
            duration_units,
            throughput,
            avg_wait_units,
            deadlock: self.deadlock,
            processes,
            trace: self.trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(resources: &[&str], events: Vec<Event>) -> Scenario {
        Scenario {
            resources: resources.iter().map(|r| r.to_string()).collect(),
            events,
        }
    }

    // ── Scenario A: classic two-process deadlock ───────────────────
    //
    // p1 takes r1, p2 takes r2, then each requests the other's resource.
    // The fourth request closes the cycle; nothing completes.

    #[test]
    fn two_process_swap_deadlocks_at_t3() {
        let report = Simulator::run(&scenario(
            &["r1", "r2"],
            vec![
                Event::request(0, "p1", "r1"),
                Event::request(1, "p2", "r2"),
                Event::request(2, "p1", "r2"),
                Event::request(3, "p2", "r1"),
            ],
        ));

        let deadlock = report.deadlock.expect("deadlock expected");
        assert_eq!(deadlock.time, 3);
        assert_eq!(deadlock.cycle.first(), deadlock.cycle.last());
        assert_eq!(report.completed, 0);
        assert_eq!(report.duration_units, 3);
    }

    #[test]
    fn replay_halts_at_the_deadlock() {
        // the t=4 grant on r3 must never be narrated
        let report = Simulator::run(&scenario(
            &["r1", "r2", "r3"],
            vec![
                Event::request(0, "p1", "r1"),
                Event::request(1, "p2", "r2"),
                Event::request(2, "p1", "r2"),
                Event::request(3, "p2", "r1"),
                Event::request(4, "p3", "r3"),
            ],
        ));

        assert!(report.deadlock.is_some());
        assert!(report.trace.iter().all(|t| t.time <= 3));
        assert!(!report.processes.iter().any(|p| p.id == "p3"));
    }

    // ── Scenario B: single process, no contention ──────────────────

    #[test]
    fn lone_process_completes_without_waiting() {
        let report = Simulator::run(&scenario(
            &["r1"],
            vec![Event::request(0, "p1", "r1"), Event::finish(1, "p1")],
        ));

        assert!(report.deadlock.is_none());
        assert_eq!(report.completed, 1);
        assert_eq!(report.avg_wait_units, 0.0);
        assert_eq!(report.duration_units, 1);
        assert_eq!(report.throughput, 1.0);

        assert_eq!(report.processes.len(), 1);
        let p1 = &report.processes[0];
        assert_eq!(p1.arrival, Some(0));
        assert_eq!(p1.finish, Some(1));
        assert_eq!(p1.total_blocked, 0);
    }

    // ── Scenario C: wait, then inherit the freed resource ──────────

    #[test]
    fn waiter_is_regranted_when_the_holder_finishes() {
        let report = Simulator::run(&scenario(
            &["r1"],
            vec![
                Event::request(0, "p1", "r1"),
                Event::request(1, "p2", "r1"),
                Event::finish(5, "p1"),
            ],
        ));

        assert!(report.deadlock.is_none());
        assert_eq!(report.completed, 1);

        let p2 = report.processes.iter().find(|p| p.id == "p2").unwrap();
        assert_eq!(p2.total_blocked, 4); // blocked t=1..5
        assert_eq!(p2.finish, None);

        // the regrant shows up in the narration at the finish time
        assert!(report.trace.contains(&TraceEvent {
            time: 5,
            kind: TraceKind::Regranted {
                resource: "r1".to_string(),
                process: "p2".to_string(),
            },
        }));
    }

    // ── Edge cases ──────────────────────────────────────────────────

    #[test]
    fn empty_event_list_is_a_noop() {
        let report = Simulator::run(&scenario(&["r1", "r2"], vec![]));
        assert_eq!(report.completed, 0);
        assert_eq!(report.duration_units, 0);
        assert!(report.deadlock.is_none());
        assert!(report.processes.is_empty());
        assert!(report.trace.is_empty());
    }

    #[test]
    fn single_instant_run_floors_duration_at_one() {
        let report = Simulator::run(&scenario(
            &["r1"],
            vec![Event::request(7, "p1", "r1"), Event::finish(7, "p1")],
        ));
        assert_eq!(report.duration_units, 1);
        assert_eq!(report.throughput, 1.0);
    }

    #[test]
    fn unsorted_events_are_replayed_in_time_order() {
        let report = Simulator::run(&scenario(
            &["r1"],
            vec![
                Event::finish(5, "p1"),
                Event::request(1, "p2", "r1"),
                Event::request(0, "p1", "r1"),
            ],
        ));
        // same outcome as scenario C
        let p2 = report.processes.iter().find(|p| p.id == "p2").unwrap();
        assert_eq!(p2.total_blocked, 4);
        assert_eq!(report.completed, 1);
    }

    #[test]
    fn finish_of_an_unknown_process_still_counts_as_completed() {
        let report = Simulator::run(&scenario(&["r1"], vec![Event::finish(2, "ghost")]));
        assert_eq!(report.completed, 1);
        let ghost = &report.processes[0];
        assert_eq!(ghost.id, "ghost");
        assert_eq!(ghost.arrival, None);
        assert_eq!(ghost.finish, Some(2));
    }

    #[test]
    fn deadlock_halt_closes_open_intervals_at_the_deadlock_time() {
        // p3 blocks on r1 at t=1 and is still blocked when the cycle
        // closes at t=4; its interval ends at the deadlock time.
        let report = Simulator::run(&scenario(
            &["r1", "r2"],
            vec![
                Event::request(0, "p1", "r1"),
                Event::request(1, "p3", "r1"),
                Event::request(2, "p2", "r2"),
                Event::request(3, "p1", "r2"),
                Event::request(4, "p2", "r1"),
            ],
        ));

        assert_eq!(report.deadlock.as_ref().unwrap().time, 4);
        let p3 = report.processes.iter().find(|p| p.id == "p3").unwrap();
        assert_eq!(p3.total_blocked, 3); // t=1..4
    }

    #[test]
    fn average_wait_is_diluted_by_never_blocked_processes() {
        // p2 waits 4 units; p1 and p3 never wait. avg = 4 / 3.
        let report = Simulator::run(&scenario(
            &["r1", "r2"],
            vec![
                Event::request(0, "p1", "r1"),
                Event::request(1, "p2", "r1"),
                Event::request(2, "p3", "r2"),
                Event::finish(5, "p1"),
                Event::finish(6, "p2"),
                Event::finish(7, "p3"),
            ],
        ));

        assert!(report.deadlock.is_none());
        assert_eq!(report.completed, 3);
        assert!((report.avg_wait_units - 4.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn narration_orders_grant_wait_terminate_regrant() {
        let report = Simulator::run(&scenario(
            &["r1"],
            vec![
                Event::request(0, "p1", "r1"),
                Event::request(1, "p2", "r1"),
                Event::finish(2, "p1"),
            ],
        ));

        let kinds: Vec<&TraceKind> = report.trace.iter().map(|t| &t.kind).collect();
        assert!(matches!(kinds[0], TraceKind::Granted { .. }));
        assert!(matches!(kinds[1], TraceKind::Waiting { holder, .. } if holder == "p1"));
        assert!(matches!(kinds[2], TraceKind::Terminated { .. }));
        assert!(matches!(kinds[3], TraceKind::Regranted { .. }));
        assert_eq!(kinds.len(), 4);
    }
}
