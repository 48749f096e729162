//! Shared nomenclature for the gridlock simulator.
//!
//! - `Event`: a point-in-time occurrence with a timestamp — a process
//!   requesting a resource, or a process finishing.
//! - `Scenario`: an initial resource set plus an ordered event list.
//! - `TraceEvent`: one entry in the observational narration of graph
//!   mutations (grants, waits, regrants, terminations).
//! - `SimReport`: the metrics report produced at the end of a replay.
//!
//! In short: scenarios feed events to the simulator, the simulator narrates
//! every mutation as trace events, and everything it measured lands in the
//! report.

use facet::Facet;

// ── Events ──────────────────────────────────────────────────────

/// A timestamped simulation event.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Simulated time at which the event occurs.
    pub time: u64,
    /// What happened at that time.
    pub kind: EventKind,
}

/// The two event kinds the simulator consumes.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum EventKind {
    /// A process asks for a resource; the graph grants or queues it.
    Request { process: String, resource: String },
    /// A process finishes, releasing everything it holds.
    Finish { process: String },
}

impl Event {
    /// Builds a request event.
    pub fn request(time: u64, process: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            time,
            kind: EventKind::Request {
                process: process.into(),
                resource: resource.into(),
            },
        }
    }

    /// Builds a finish event.
    pub fn finish(time: u64, process: impl Into<String>) -> Self {
        Self {
            time,
            kind: EventKind::Finish {
                process: process.into(),
            },
        }
    }
}

/// An initial resource set plus the event list to replay over it.
///
/// Events need not be pre-sorted; the simulator sorts them by time,
/// preserving relative order on ties.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    /// Resource identities registered before any event runs.
    pub resources: Vec<String>,
    /// The events to replay.
    pub events: Vec<Event>,
}

// ── Observational trace ─────────────────────────────────────────

/// One entry in the ordered narration of graph mutations.
///
/// The trace is an observation channel only; nothing reads it back into
/// the simulation.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    /// Time of the event that caused the mutation.
    pub time: u64,
    /// Which mutation happened.
    pub kind: TraceKind,
}

/// The graph mutations worth narrating.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum TraceKind {
    /// A free resource was assigned to the requesting process.
    Granted { resource: String, process: String },
    /// The resource was busy; the process queued up behind its holder.
    Waiting {
        process: String,
        resource: String,
        holder: String,
    },
    /// A freed resource was handed to the first queued waiter.
    Regranted { resource: String, process: String },
    /// A process terminated and released its resources.
    Terminated { process: String },
}

// ── Report ──────────────────────────────────────────────────────

/// Deadlock diagnosis: when it was detected and the closed cycle path.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct DeadlockReport {
    /// Timestamp of the request event that completed the cycle.
    pub time: u64,
    /// Node labels along the cycle; first label repeated at the end.
    pub cycle: Vec<String>,
}

/// Per-process detail in the final report.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct ProcessReport {
    /// Process identity.
    pub id: String,
    /// Time of the first request mentioning this process, if any.
    pub arrival: Option<u64>,
    /// Time of the finish event, absent if the process never finished.
    pub finish: Option<u64>,
    /// Accumulated time spent with at least one unsatisfied request.
    pub total_blocked: u64,
}

/// The metrics report produced at the end of a replay.
#[derive(Facet, Debug, Clone, Default)]
pub struct SimReport {
    /// Number of processes whose finish event was processed.
    pub completed: u64,
    /// Observed span, floored at one time unit.
    pub duration_units: u64,
    /// Completed processes per unit of simulated time.
    pub throughput: f64,
    /// Sum of blocked time divided by the count of all processes ever
    /// seen — including processes that never blocked, which still dilute
    /// the average. That divisor is the scenario's own accounting
    /// convention and is preserved as-is.
    pub avg_wait_units: f64,
    /// Set iff a cycle was found; no further events were consumed after it.
    pub deadlock: Option<DeadlockReport>,
    /// Per-process detail, sorted by id.
    pub processes: Vec<ProcessReport>,
    /// Ordered narration of every graph mutation up to the halt.
    pub trace: Vec<TraceEvent>,
}
