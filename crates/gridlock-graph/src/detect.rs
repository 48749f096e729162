//! Cycle detection over the allocation graph.
//!
//! A cycle in this topology is exactly the formal definition of deadlock:
//! every process on the cycle waits for a resource held, directly or
//! transitively, by another process on it.

use std::collections::{BTreeMap, BTreeSet};

use crate::{AllocGraph, NodeId};

/// A detected deadlock cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadlockCycle {
    /// Nodes participating in the cycle.
    pub nodes: Vec<NodeId>,
    /// The cycle as a closed path: the first node repeated at the end.
    pub cycle_path: Vec<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Not visited yet.
    White,
    /// On the current DFS stack.
    Gray,
    /// Fully explored.
    Black,
}

/// Finds one cycle in the graph, or `None` if it is acyclic.
///
/// Depth-first search with white/gray/black coloring; a back edge to a
/// gray node closes a cycle. Nodes and neighbors are visited in `NodeId`
/// order (the adjacency view is `BTreeMap`-backed), so the traversal — and
/// therefore which cycle is reported first — is reproducible across runs.
/// Stops at the first cycle; it does not enumerate all of them.
pub fn find_cycle(graph: &AllocGraph) -> Option<DeadlockCycle> {
    let adj = graph.adjacency();
    let mut colors: BTreeMap<&NodeId, Color> =
        adj.keys().map(|node| (node, Color::White)).collect();
    let mut stack: Vec<&NodeId> = Vec::new();

    for node in adj.keys() {
        if colors.get(node) == Some(&Color::White) {
            if let Some(cycle) = visit(&adj, node, &mut colors, &mut stack) {
                return Some(cycle);
            }
        }
    }
    None
}

fn visit<'g>(
    adj: &'g BTreeMap<NodeId, BTreeSet<NodeId>>,
    node: &'g NodeId,
    colors: &mut BTreeMap<&'g NodeId, Color>,
    stack: &mut Vec<&'g NodeId>,
) -> Option<DeadlockCycle> {
    colors.insert(node, Color::Gray);
    stack.push(node);

    if let Some(neighbors) = adj.get(node) {
        for next in neighbors {
            match colors.get(next).copied().unwrap_or(Color::White) {
                Color::White => {
                    if let Some(cycle) = visit(adj, next, colors, stack) {
                        return Some(cycle);
                    }
                }
                Color::Gray => {
                    // Back edge. The cycle is the stack suffix starting at
                    // the gray node, closed by repeating it.
                    let start = stack.iter().position(|n| *n == next).unwrap_or(0);
                    let nodes: Vec<NodeId> = stack[start..].iter().map(|n| (*n).clone()).collect();
                    let mut cycle_path = nodes.clone();
                    cycle_path.push(next.clone());
                    return Some(DeadlockCycle { nodes, cycle_path });
                }
                Color::Black => {}
            }
        }
    }

    stack.pop();
    colors.insert(node, Color::Black);
    None
}
