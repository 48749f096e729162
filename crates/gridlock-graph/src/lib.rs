//! Resource-allocation graph for the gridlock simulator.
//!
//! Tracks which process holds each resource and which processes are queued
//! behind it. The graph is the single source of truth for cycle detection:
//! hold (R→P) and wait (P→R) edges are derived from the allocation state
//! rather than stored alongside it, so the two can never diverge.

use std::collections::{BTreeMap, BTreeSet};

use facet::Facet;

pub mod detect;

// ── Stable node identity ────────────────────────────────────────

/// Identifier for a graph node.
///
/// Processes and resources live in disjoint universes by construction.
/// Uses `BTreeMap`-friendly `Ord` so the adjacency view has deterministic
/// iteration order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Facet)]
#[repr(u8)]
pub enum NodeId {
    /// A simulated process.
    Process { id: String },
    /// A single-instance resource.
    Resource { id: String },
}

impl NodeId {
    /// Builds a process node id.
    pub fn process(id: impl Into<String>) -> Self {
        Self::Process { id: id.into() }
    }

    /// Builds a resource node id.
    pub fn resource(id: impl Into<String>) -> Self {
        Self::Resource { id: id.into() }
    }

    /// The identity string, without the process/resource distinction.
    pub fn label(&self) -> &str {
        match self {
            Self::Process { id } | Self::Resource { id } => id,
        }
    }
}

// ── Request / termination outcomes ──────────────────────────────

/// What happened to a resource request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The resource was free and is now held by the requester.
    Granted,
    /// The resource is busy; the requester is queued behind its holder.
    /// Re-requests do not duplicate the queue entry, but the outcome is
    /// still reported so the narration layer can log the observable event.
    Waiting { holder: String },
}

/// Effects of terminating a process: each resource it held, paired with
/// the waiter it was regranted to (or `None` if it was left free).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Termination {
    pub released: Vec<(String, Option<String>)>,
}

// ── Allocation state ────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
struct ResourceState {
    /// Current holder, if any. A resource has at most one holder.
    holder: Option<String>,
    /// Waiting processes in first-request order. The head of this queue
    /// is the regrant target when the resource frees up — an explicit
    /// FIFO, not an incidental container iteration order.
    waiters: Vec<String>,
}

/// The resource-allocation graph.
#[derive(Debug, Clone, Default)]
pub struct AllocGraph {
    resources: BTreeMap<String, ResourceState>,
    processes: BTreeSet<String>,
}

impl AllocGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resource. Idempotent; an already-known resource keeps
    /// its holder and waiter queue.
    pub fn add_resource(&mut self, resource: &str) {
        self.resources.entry(resource.to_string()).or_default();
    }

    /// Registers a process. Idempotent.
    pub fn add_process(&mut self, process: &str) {
        self.processes.insert(process.to_string());
    }

    /// Handles a request: grants immediately when the resource is free,
    /// otherwise queues the requester. Unknown processes and resources
    /// auto-register; self-requests and repeats are tolerated, not errors.
    pub fn request_resource(&mut self, process: &str, resource: &str) -> RequestOutcome {
        self.add_process(process);
        let state = self.resources.entry(resource.to_string()).or_default();
        match &state.holder {
            None => {
                state.holder = Some(process.to_string());
                RequestOutcome::Granted
            }
            Some(holder) => {
                let holder = holder.clone();
                if !state.waiters.iter().any(|w| w == process) {
                    state.waiters.push(process.to_string());
                }
                RequestOutcome::Waiting { holder }
            }
        }
    }

    /// Terminates a process: drops its pending requests, releases every
    /// resource it held, and regrants each to the first queued waiter.
    /// Returns `None` for an unknown process.
    ///
    /// Pending requests are dropped before any regrant happens, so a
    /// terminating process can never be handed a resource back.
    pub fn terminate_process(&mut self, process: &str) -> Option<Termination> {
        if !self.processes.contains(process) {
            return None;
        }

        for state in self.resources.values_mut() {
            state.waiters.retain(|w| w != process);
        }

        let held: Vec<String> = self
            .resources
            .iter()
            .filter(|(_, state)| state.holder.as_deref() == Some(process))
            .map(|(r, _)| r.clone())
            .collect();

        let mut released = Vec::with_capacity(held.len());
        for resource in held {
            if let Some(state) = self.resources.get_mut(&resource) {
                state.holder = None;
            }
            let regrant = self.grant_if_possible(&resource);
            released.push((resource, regrant));
        }

        self.processes.remove(process);
        Some(Termination { released })
    }

    /// Hands a free resource to the first queued waiter, if any.
    /// Returns the process it was granted to.
    fn grant_if_possible(&mut self, resource: &str) -> Option<String> {
        let state = self.resources.get_mut(resource)?;
        if state.holder.is_some() || state.waiters.is_empty() {
            return None;
        }
        let next = state.waiters.remove(0);
        state.holder = Some(next.clone());
        Some(next)
    }

    /// True iff the process has at least one unsatisfied request.
    /// Recomputed from the live waiter queues, never cached.
    pub fn is_blocked(&self, process: &str) -> bool {
        self.resources
            .values()
            .any(|state| state.waiters.iter().any(|w| w == process))
    }

    /// Current holder of a resource.
    pub fn holder(&self, resource: &str) -> Option<&str> {
        self.resources.get(resource)?.holder.as_deref()
    }

    /// Waiter queue of a resource, in first-request order.
    pub fn waiters(&self, resource: &str) -> &[String] {
        self.resources
            .get(resource)
            .map(|state| state.waiters.as_slice())
            .unwrap_or(&[])
    }

    /// Currently registered (live) processes.
    pub fn processes(&self) -> impl Iterator<Item = &str> {
        self.processes.iter().map(String::as_str)
    }

    /// All known resources. Resources persist for the whole run.
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    /// Derived adjacency view: every holder contributes an R→P edge and
    /// every waiter a P→R edge. Keys and neighbor sets iterate in a fixed
    /// order, so traversals over this view are reproducible.
    pub fn adjacency(&self) -> BTreeMap<NodeId, BTreeSet<NodeId>> {
        let mut adj: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
        for process in &self.processes {
            adj.entry(NodeId::process(process)).or_default();
        }
        for (resource, state) in &self.resources {
            let resource_node = NodeId::resource(resource);
            let outgoing = adj.entry(resource_node.clone()).or_default();
            if let Some(holder) = &state.holder {
                outgoing.insert(NodeId::process(holder));
            }
            for waiter in &state.waiters {
                adj.entry(NodeId::process(waiter))
                    .or_default()
                    .insert(resource_node.clone());
            }
        }
        adj
    }
}
