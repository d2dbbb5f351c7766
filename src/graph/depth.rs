//! Topological depth assignment.
//!
//! Depth 0 is reserved for nodes without any STANDARD/SUPPRESS edge. Roots
//! (sources that are never targets) sit at depth 1 and every other node one
//! layer below its deepest predecessor, so `depth(target) > depth(source)`
//! holds for every semantic edge. ARCHITECTURE edges are ignored.
//!
//! The layering loop is bounded by the node count. Nodes that never become
//! ready (they sit on, or downstream of, a cycle) are reported through
//! [`CyclicGraphError`] instead of spinning.

use std::collections::HashMap;

use thiserror::Error;

use crate::graph::model::Graph;
use crate::types::Edge;

/// A network whose semantic edges contain a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "{} node(s) left without a depth after {rounds} round(s), first: {}",
    .unassigned.len(),
    .unassigned.first().map(String::as_str).unwrap_or("-")
)]
pub struct CyclicGraphError {
    /// Ids of nodes that could not be placed, in graph order.
    pub unassigned: Vec<String>,
    pub rounds: usize,
}

/// Compute a depth for every node of `graph` without modifying it.
pub fn compute_depths(graph: &Graph) -> Result<HashMap<String, u32>, CyclicGraphError> {
    let mut pending: HashMap<&str, usize> = HashMap::with_capacity(graph.node_count());
    let mut depths: HashMap<String, u32> = HashMap::with_capacity(graph.node_count());
    let mut frontier: Vec<&str> = Vec::new();

    for node in graph.nodes() {
        let in_degree = graph.semantic_incoming(&node.id).count();
        let has_outgoing = graph.semantic_outgoing(&node.id).next().is_some();
        match (in_degree, has_outgoing) {
            (0, false) => {
                depths.insert(node.id.clone(), 0);
            }
            (0, true) => frontier.push(&node.id),
            _ => {}
        }
        pending.insert(&node.id, in_degree);
    }

    let limit = graph.node_count();
    let mut depth: u32 = 1;
    let mut rounds = 0;

    while !frontier.is_empty() && rounds < limit {
        rounds += 1;
        let mut next: Vec<&str> = Vec::new();
        for &id in &frontier {
            depths.insert(id.to_string(), depth);
            for edge in graph.semantic_outgoing(id) {
                if let Some(count) = pending.get_mut(edge.target.as_str()) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        next.push(&edge.target);
                    }
                }
            }
        }
        frontier = next;
        depth += 1;
    }

    let unassigned: Vec<String> = graph
        .nodes()
        .iter()
        .filter(|n| !depths.contains_key(&n.id))
        .map(|n| n.id.clone())
        .collect();

    if unassigned.is_empty() {
        tracing::debug!(nodes = graph.node_count(), rounds, "depths assigned");
        Ok(depths)
    } else {
        Err(CyclicGraphError { unassigned, rounds })
    }
}

/// Compute depths and write them into the graph's nodes.
///
/// On error the graph is left untouched.
pub fn assign_depths(graph: &mut Graph) -> Result<(), CyclicGraphError> {
    let depths = compute_depths(graph)?;
    graph.set_depths(&depths);
    Ok(())
}

/// Semantic edges whose target is not strictly deeper than their source.
///
/// Always empty after [`assign_depths`] succeeds; useful for datasets that
/// ship their own depths.
pub fn violations(graph: &Graph) -> Vec<&Edge> {
    graph
        .edges()
        .iter()
        .filter(|e| e.kind.is_semantic())
        .filter(|e| match (graph.node(&e.source), graph.node(&e.target)) {
            (Some(s), Some(t)) => t.depth <= s.depth,
            _ => false,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
