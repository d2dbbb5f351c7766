//! Per-origin flow traces for additive flow selection.
//!
//! Each selected origin owns one immutable [`FlowTrace`]. Traces are kept in
//! selection order and unioned on demand; removing an origin drops exactly
//! its trace and nothing else.

use std::collections::{BTreeSet, HashMap};

use crate::graph::flow::{evaluate_flow, FlowTrace};
use crate::graph::model::Graph;
use crate::types::{ChainEntry, EntryKind};

/// Selected flow origins and their traces.
#[derive(Debug, Clone, Default)]
pub struct FlowRegistry {
    traces: Vec<FlowTrace>,
}

impl FlowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn contains(&self, origin: &str) -> bool {
        self.position(origin).is_some()
    }

    /// Origins in selection order.
    pub fn origins(&self) -> Vec<&str> {
        self.traces.iter().map(FlowTrace::origin).collect()
    }

    pub fn get(&self, origin: &str) -> Option<&FlowTrace> {
        self.position(origin).map(|i| &self.traces[i])
    }

    pub fn traces(&self) -> &[FlowTrace] {
        &self.traces
    }

    /// Add a trace. A trace for an already selected origin replaces the old
    /// one in place, keeping its selection slot.
    pub fn insert(&mut self, trace: FlowTrace) {
        match self.position(trace.origin()) {
            Some(i) => self.traces[i] = trace,
            None => self.traces.push(trace),
        }
    }

    /// Evaluate `origin` on `graph` and register the result.
    pub fn select(&mut self, graph: &Graph, origin: &str) -> &FlowTrace {
        self.insert(evaluate_flow(graph, origin));
        let i = self.position(origin).unwrap_or(self.traces.len() - 1);
        &self.traces[i]
    }

    /// Drop the trace of `origin`.
    pub fn remove(&mut self, origin: &str) -> Option<FlowTrace> {
        self.position(origin).map(|i| self.traces.remove(i))
    }

    /// Select `origin` if absent, deselect it otherwise. Returns whether the
    /// origin is selected afterwards.
    pub fn toggle(&mut self, graph: &Graph, origin: &str) -> bool {
        if self.remove(origin).is_some() {
            false
        } else {
            self.select(graph, origin);
            true
        }
    }

    pub fn clear(&mut self) {
        self.traces.clear();
    }

    /// Re-evaluate every selected origin against `graph`, keeping the
    /// selection order. Fail flags are rebuilt from scratch.
    pub fn recompute(&mut self, graph: &Graph) {
        for trace in &mut self.traces {
            *trace = evaluate_flow(graph, trace.origin());
        }
    }

    /// Union of all traces, ordered like a single trace.
    ///
    /// An entry reached by several origins appears once, at the earliest
    /// round any of them reached it; ties keep the earlier origin. Since a
    /// trace gives an edge its source's index, every merged edge still
    /// starts no earlier than its source node.
    pub fn merged(&self) -> Vec<ChainEntry> {
        let mut slots: HashMap<(EntryKind, &str), usize> = HashMap::new();
        let mut merged: Vec<ChainEntry> = Vec::new();
        for trace in &self.traces {
            for entry in trace.entries() {
                let key = (entry.kind, entry.id.as_str());
                match slots.get(&key).copied() {
                    Some(i) if merged[i].index > entry.index => merged[i] = entry.clone(),
                    Some(_) => {}
                    None => {
                        slots.insert(key, merged.len());
                        merged.push(entry.clone());
                    }
                }
            }
        }
        merged.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        merged
    }

    /// Node ids active in any trace.
    pub fn active_nodes(&self) -> BTreeSet<&str> {
        self.traces.iter().flat_map(FlowTrace::node_ids).collect()
    }

    /// Edge ids active in any trace.
    pub fn active_edges(&self) -> BTreeSet<&str> {
        self.traces.iter().flat_map(FlowTrace::edge_ids).collect()
    }

    /// Nodes failed by every trace that contains them.
    pub fn failed_nodes(&self) -> BTreeSet<&str> {
        let mut candidates: BTreeSet<&str> = BTreeSet::new();
        for trace in &self.traces {
            candidates.extend(trace.failed().keys().map(String::as_str));
        }
        candidates.retain(|id| {
            self.traces
                .iter()
                .filter(|t| t.node_ids().contains(id))
                .all(|t| t.is_failed(id))
        });
        candidates
    }

    fn position(&self, origin: &str) -> Option<usize> {
        self.traces.iter().position(|t| t.origin() == origin)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Edge, EdgeKind, Node, NodeClass, NodeType};
    use pretty_assertions::assert_eq;

    // a -> g <- b, g is an ALL gate; a -> x, b -> y.
    fn fixture() -> Graph {
        let nodes = [
            ("a", NodeType::Standard),
            ("b", NodeType::Standard),
            ("g", NodeType::All),
            ("x", NodeType::Standard),
            ("y", NodeType::Standard),
        ];
        let links = [("a", "g"), ("b", "g"), ("a", "x"), ("b", "y")];
        Graph::build(
            nodes
                .iter()
                .map(|(l, t)| Node::new(l, "N", *t, NodeClass::Intermediate)),
            links.iter().map(|(s, t)| {
                Edge::new(&format!("{s}-N"), &format!("{t}-N"), EdgeKind::Standard)
            }),
        )
    }

    #[test]
    fn toggle_adds_then_removes() {
        let g = fixture();
        let mut reg = FlowRegistry::new();
        assert!(reg.toggle(&g, "a-N"));
        assert!(reg.contains("a-N"));
        assert!(!reg.toggle(&g, "a-N"));
        assert!(reg.is_empty());
    }

    #[test]
    fn origins_keep_selection_order() {
        let g = fixture();
        let mut reg = FlowRegistry::new();
        reg.select(&g, "b-N");
        reg.select(&g, "a-N");
        assert_eq!(reg.origins(), vec!["b-N", "a-N"]);
        reg.select(&g, "b-N");
        assert_eq!(reg.origins(), vec!["b-N", "a-N"]);
    }

    #[test]
    fn removing_one_origin_leaves_the_other_untouched() {
        let g = fixture();
        let mut reg = FlowRegistry::new();
        reg.select(&g, "a-N");
        let before = reg.get("a-N").cloned();
        reg.select(&g, "b-N");
        reg.remove("b-N");
        assert_eq!(reg.get("a-N").cloned(), before);
        assert_eq!(reg.active_nodes(), BTreeSet::from(["a-N", "g-N", "x-N"]));
    }

    #[test]
    fn merged_view_does_not_duplicate_entries() {
        let g = fixture();
        let mut reg = FlowRegistry::new();
        reg.select(&g, "a-N");
        reg.select(&g, "b-N");
        let merged = reg.merged();
        let g_entries: Vec<&ChainEntry> = merged.iter().filter(|e| e.id == "g-N").collect();
        assert_eq!(g_entries.len(), 1);
        assert_eq!(g_entries[0].origin, "a-N");
        assert_eq!(merged.len(), 5 + 4);
    }

    // o -> x -> y <- w, y -> z; y is an ALL gate.
    fn late_gate() -> Graph {
        let nodes = [
            ("o", NodeType::Standard),
            ("x", NodeType::Standard),
            ("w", NodeType::Standard),
            ("y", NodeType::All),
            ("z", NodeType::Standard),
        ];
        let links = [("o", "x"), ("x", "y"), ("w", "y"), ("y", "z")];
        Graph::build(
            nodes
                .iter()
                .map(|(l, t)| Node::new(l, "N", *t, NodeClass::Intermediate)),
            links.iter().map(|(s, t)| {
                Edge::new(&format!("{s}-N"), &format!("{t}-N"), EdgeKind::Standard)
            }),
        )
    }

    #[test]
    fn merged_entries_take_the_earliest_round() {
        let g = late_gate();
        let mut reg = FlowRegistry::new();
        reg.select(&g, "o-N");
        reg.select(&g, "y-N");
        assert_eq!(reg.get("o-N").unwrap().index_of(EntryKind::Node, "y-N"), Some(2));

        let merged = reg.merged();
        let index_of = |kind: EntryKind, id: &str| {
            merged
                .iter()
                .find(|e| e.kind == kind && e.id == id)
                .map(|e| (e.index, e.origin.as_str()))
        };
        assert_eq!(index_of(EntryKind::Node, "y-N"), Some((0, "y-N")));
        assert_eq!(index_of(EntryKind::Node, "x-N"), Some((1, "o-N")));

        for edge in merged.iter().filter(|e| e.kind == EntryKind::Edge) {
            let source = g.edge(&edge.id).map(|e| e.source.clone()).unwrap();
            let (source_index, _) = index_of(EntryKind::Node, &source).unwrap();
            assert!(
                edge.index >= source_index,
                "edge {} at {} precedes its source at {}",
                edge.id,
                edge.index,
                source_index
            );
        }
    }

    #[test]
    fn merged_ties_keep_the_earlier_origin() {
        let g = fixture();
        let mut reg = FlowRegistry::new();
        reg.select(&g, "b-N");
        reg.select(&g, "a-N");
        let gate = reg.merged().into_iter().find(|e| e.id == "g-N").unwrap();
        assert_eq!((gate.index, gate.origin.as_str()), (1, "b-N"));
    }

    #[test]
    fn gate_failed_by_every_trace_is_flagged() {
        let g = fixture();
        let mut reg = FlowRegistry::new();
        reg.select(&g, "a-N");
        reg.select(&g, "b-N");
        // Each origin alone feeds only half of the ALL gate.
        assert_eq!(reg.failed_nodes(), BTreeSet::from(["g-N"]));
    }

    #[test]
    fn gate_passed_by_some_trace_is_not_flagged() {
        let mut g = fixture();
        g.add_node(Node::new("root", "N", NodeType::Standard, NodeClass::Input));
        g.add_edge(Edge::new("root-N", "a-N", EdgeKind::Standard));
        g.add_edge(Edge::new("root-N", "b-N", EdgeKind::Standard));
        let mut reg = FlowRegistry::new();
        reg.select(&g, "a-N");
        reg.select(&g, "root-N");
        assert!(reg.get("a-N").unwrap().is_failed("g-N"));
        assert!(reg.failed_nodes().is_empty());
    }

    #[test]
    fn clear_drops_everything() {
        let g = fixture();
        let mut reg = FlowRegistry::new();
        reg.select(&g, "a-N");
        reg.clear();
        assert!(reg.merged().is_empty());
        assert!(reg.failed_nodes().is_empty());
    }

    #[test]
    fn recompute_follows_graph_changes() {
        let mut g = fixture();
        let mut reg = FlowRegistry::new();
        reg.select(&g, "x-N");
        assert_eq!(reg.active_nodes().len(), 1);
        g.add_node(Node::new("z", "N", NodeType::Standard, NodeClass::Output));
        g.add_edge(Edge::new("x-N", "z-N", EdgeKind::Standard));
        reg.recompute(&g);
        assert_eq!(reg.active_nodes(), BTreeSet::from(["x-N", "z-N"]));
    }
}
