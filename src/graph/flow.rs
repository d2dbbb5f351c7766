//! Gated signal propagation from a single origin.
//!
//! The candidate universe is the forward closure of the origin. Nodes in it
//! are decided one at a time, each only once every predecessor inside the
//! universe has been decided, so a gate always sees its complete set of
//! active inputs. A node's included inputs are the semantic edges from
//! predecessors that passed; its round is one more than the latest of those
//! predecessors. Failed nodes are part of the chain but never expand.
//!
//! Evaluation is a pure function of the graph and the origin. The result,
//! a [`FlowTrace`], is an immutable snapshot.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use serde::Serialize;

use crate::graph::gate::{self, FailReason, GateInputs, GateOutcome};
use crate::graph::model::Graph;
use crate::graph::reachability::{closure, Adjacency, Direction};
use crate::types::{ChainEntry, Edge, EdgeKind, EntryKind};

// ---------------------------------------------------------------------------
// FlowTrace
// ---------------------------------------------------------------------------

/// The evaluated chain of one origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowTrace {
    origin: String,
    entries: Vec<ChainEntry>,
    failed: BTreeMap<String, FailReason>,
}

impl FlowTrace {
    fn empty(origin: &str) -> Self {
        Self {
            origin: origin.to_string(),
            entries: Vec::new(),
            failed: BTreeMap::new(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Chain entries ordered by round, nodes before edges, then id.
    pub fn entries(&self) -> &[ChainEntry] {
        &self.entries
    }

    /// Failed nodes and why they failed.
    pub fn failed(&self) -> &BTreeMap<String, FailReason> {
        &self.failed
    }

    pub fn is_failed(&self, node_id: &str) -> bool {
        self.failed.contains_key(node_id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn node_ids(&self) -> BTreeSet<&str> {
        self.ids_of(EntryKind::Node)
    }

    pub fn edge_ids(&self) -> BTreeSet<&str> {
        self.ids_of(EntryKind::Edge)
    }

    /// Round of the node or edge entry with `id`.
    pub fn index_of(&self, kind: EntryKind, id: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|e| e.kind == kind && e.id == id)
            .map(|e| e.index)
    }

    /// Highest round in the chain.
    pub fn last_round(&self) -> u32 {
        self.entries.iter().map(|e| e.index).max().unwrap_or(0)
    }

    fn ids_of(&self, kind: EntryKind) -> BTreeSet<&str> {
        self.entries
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.id.as_str())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Active(u32),
    Failed(u32),
    Unreached,
}

/// Evaluate the flow started at `origin`.
///
/// An unknown origin yields an empty trace.
pub fn evaluate_flow(graph: &Graph, origin: &str) -> FlowTrace {
    if !graph.contains(origin) {
        tracing::warn!(origin, "flow requested for unknown node");
        return FlowTrace::empty(origin);
    }

    let universe = closure(&Adjacency::semantic(graph), origin, Direction::Descendants);
    let mut eval = Evaluation::new(graph, origin, &universe);
    eval.run();
    let trace = eval.finish();

    tracing::debug!(
        origin,
        nodes = trace.node_ids().len(),
        edges = trace.edge_ids().len(),
        failed = trace.failed.len(),
        rounds = trace.last_round(),
        "flow evaluated"
    );
    trace
}

struct Evaluation<'g> {
    graph: &'g Graph,
    origin: &'g str,
    universe: &'g BTreeSet<String>,
    states: HashMap<&'g str, State>,
    pending: HashMap<&'g str, usize>,
    ready: VecDeque<&'g str>,
    entries: Vec<ChainEntry>,
    failed: BTreeMap<String, FailReason>,
}

impl<'g> Evaluation<'g> {
    fn new(graph: &'g Graph, origin: &'g str, universe: &'g BTreeSet<String>) -> Self {
        let mut pending = HashMap::with_capacity(universe.len());
        for id in universe {
            let count = graph
                .semantic_incoming(id)
                .filter(|e| universe.contains(&e.source))
                .count();
            pending.insert(id.as_str(), count);
        }
        Self {
            graph,
            origin,
            universe,
            states: HashMap::with_capacity(universe.len()),
            pending,
            ready: VecDeque::new(),
            entries: Vec::new(),
            failed: BTreeMap::new(),
        }
    }

    fn run(&mut self) {
        self.states.insert(self.origin, State::Active(0));
        self.entries.push(ChainEntry::node(self.origin, 0, self.origin));
        self.release_successors(self.origin);

        loop {
            while let Some(id) = self.ready.pop_front() {
                self.decide(id);
            }
            match self.stalled_candidate() {
                Some(id) => {
                    tracing::warn!(
                        origin = self.origin,
                        node = id,
                        "cycle in flow universe, deciding with partial inputs"
                    );
                    self.decide(id);
                }
                None => break,
            }
        }
    }

    /// Decide `id` from the inputs known now and release its successors.
    fn decide(&mut self, id: &'g str) {
        if self.states.contains_key(id) {
            return;
        }

        let graph = self.graph;
        let included: Vec<&'g Edge> = graph
            .semantic_incoming(id)
            .filter(|e| matches!(self.state(&e.source), Some(State::Active(_))))
            .collect();

        if included.is_empty() {
            self.states.insert(id, State::Unreached);
            self.release_successors(id);
            return;
        }

        let mut index = 0;
        for edge in &included {
            let source_index = self.active_index(&edge.source);
            index = index.max(source_index + 1);
            self.entries
                .push(ChainEntry::edge(&edge.id, source_index, self.origin));
        }

        let Some(node) = graph.node(id) else {
            return;
        };
        let outcome = gate::evaluate(node.node_type, &self.gate_inputs(id, &included));
        self.entries.push(ChainEntry::node(id, index, self.origin));
        match outcome {
            GateOutcome::Pass => {
                self.states.insert(id, State::Active(index));
            }
            GateOutcome::Fail(reason) => {
                self.states.insert(id, State::Failed(index));
                self.failed.insert(id.to_string(), reason);
            }
        }
        self.release_successors(id);
    }

    fn gate_inputs(&self, id: &str, included: &[&Edge]) -> GateInputs {
        let mut inputs = GateInputs::default();
        for edge in self.graph.semantic_incoming(id) {
            match edge.kind {
                EdgeKind::Standard => inputs.standard_declared += 1,
                EdgeKind::Suppress => inputs.suppress_declared += 1,
                EdgeKind::Architecture => {}
            }
        }
        for edge in included {
            match edge.kind {
                EdgeKind::Standard => inputs.standard_active += 1,
                EdgeKind::Suppress => inputs.suppress_active += 1,
                EdgeKind::Architecture => {}
            }
        }
        inputs
    }

    fn release_successors(&mut self, id: &str) {
        let graph = self.graph;
        for edge in graph.semantic_outgoing(id) {
            let target = edge.target.as_str();
            if self.states.contains_key(target) {
                continue;
            }
            if let Some(count) = self.pending.get_mut(target) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    self.ready.push_back(target);
                }
            }
        }
    }

    /// When nothing is ready but undecided nodes remain, the universe has a
    /// cycle. Pick the shallowest (then lowest-id) undecided node that has an
    /// active input; `None` once no such node exists.
    fn stalled_candidate(&self) -> Option<&'g str> {
        self.universe
            .iter()
            .map(String::as_str)
            .filter(|id| !self.states.contains_key(id))
            .filter(|id| {
                self.graph
                    .semantic_incoming(id)
                    .any(|e| matches!(self.state(&e.source), Some(State::Active(_))))
            })
            .min_by_key(|id| (self.graph.node(id).map(|n| n.depth).unwrap_or(0), *id))
    }

    fn state(&self, id: &str) -> Option<State> {
        self.states.get(id).copied()
    }

    fn active_index(&self, id: &str) -> u32 {
        match self.state(id) {
            Some(State::Active(index)) | Some(State::Failed(index)) => index,
            _ => 0,
        }
    }

    fn finish(self) -> FlowTrace {
        let mut entries = self.entries;
        entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        FlowTrace {
            origin: self.origin.to_string(),
            entries,
            failed: self.failed,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
