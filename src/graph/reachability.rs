//! Bidirectional reachability for highlight mode.
//!
//! No gate semantics: a node's chain is the plain transitive closure of its
//! descendants and ancestors. Traversals use an explicit stack and a visited
//! set, so deep or cyclic graphs neither overflow nor loop.

use std::collections::{BTreeSet, HashMap};

use crate::graph::model::Graph;

// ---------------------------------------------------------------------------
// Adjacency
// ---------------------------------------------------------------------------

/// Forward and backward adjacency lists over an arbitrary edge set.
#[derive(Debug, Clone, Default)]
pub struct Adjacency {
    forward: HashMap<String, Vec<String>>,
    backward: HashMap<String, Vec<String>>,
}

impl Adjacency {
    /// Build from `(source, target)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut adj = Self::default();
        for (source, target) in pairs {
            adj.forward
                .entry(source.to_string())
                .or_default()
                .push(target.to_string());
            adj.backward
                .entry(target.to_string())
                .or_default()
                .push(source.to_string());
        }
        adj
    }

    /// Adjacency over the STANDARD and SUPPRESS edges of `graph`.
    pub fn semantic(graph: &Graph) -> Self {
        Self::from_pairs(
            graph
                .edges()
                .iter()
                .filter(|e| e.kind.is_semantic())
                .map(|e| (e.source.as_str(), e.target.as_str())),
        )
    }

    pub fn successors(&self, id: &str) -> &[String] {
        self.forward.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn predecessors(&self, id: &str) -> &[String] {
        self.backward.get(id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Which way a closure follows edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Descendants,
    Ancestors,
}

// ---------------------------------------------------------------------------
// Closures
// ---------------------------------------------------------------------------

/// Every id reachable from `start` in `direction`, including `start`.
pub fn closure(adj: &Adjacency, start: &str, direction: Direction) -> BTreeSet<String> {
    let mut visited: BTreeSet<String> = BTreeSet::new();
    let mut stack: Vec<&str> = vec![start];

    while let Some(id) = stack.pop() {
        if !visited.insert(id.to_string()) {
            continue;
        }
        let next = match direction {
            Direction::Descendants => adj.successors(id),
            Direction::Ancestors => adj.predecessors(id),
        };
        stack.extend(
            next.iter()
                .map(String::as_str)
                .filter(|n| !visited.contains(*n)),
        );
    }

    visited
}

/// Union of descendants and ancestors of `start`, including `start`.
pub fn chain_in(adj: &Adjacency, start: &str) -> BTreeSet<String> {
    let mut chain = closure(adj, start, Direction::Descendants);
    chain.extend(closure(adj, start, Direction::Ancestors));
    chain
}

/// The highlight chain of `node_id` over semantic edges.
///
/// Unknown ids yield an empty set.
pub fn chain_of(graph: &Graph, node_id: &str) -> BTreeSet<String> {
    if !graph.contains(node_id) {
        tracing::warn!(node = node_id, "chain requested for unknown node");
        return BTreeSet::new();
    }
    chain_in(&Adjacency::semantic(graph), node_id)
}

/// Strict descendants of `node_id` over semantic edges.
pub fn descendants(graph: &Graph, node_id: &str) -> BTreeSet<String> {
    let mut set = closure(&Adjacency::semantic(graph), node_id, Direction::Descendants);
    set.remove(node_id);
    set
}

/// Strict ancestors of `node_id` over semantic edges.
pub fn ancestors(graph: &Graph, node_id: &str) -> BTreeSet<String> {
    let mut set = closure(&Adjacency::semantic(graph), node_id, Direction::Ancestors);
    set.remove(node_id);
    set
}

// ---------------------------------------------------------------------------
// Neighborhood
// ---------------------------------------------------------------------------

/// A node, its direct neighbours, and the edges joining them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Neighborhood {
    pub nodes: BTreeSet<String>,
    pub edges: Vec<String>,
}

/// One-hop neighbourhood of `node_id` across edges of every kind. Used for
/// hover previews.
pub fn neighborhood(graph: &Graph, node_id: &str) -> Neighborhood {
    let mut hood = Neighborhood::default();
    if !graph.contains(node_id) {
        return hood;
    }
    hood.nodes.insert(node_id.to_string());
    for edge in graph.outgoing(node_id).chain(graph.incoming(node_id)) {
        hood.nodes.insert(edge.source.clone());
        hood.nodes.insert(edge.target.clone());
        if !hood.edges.contains(&edge.id) {
            hood.edges.push(edge.id.clone());
        }
    }
    hood
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
