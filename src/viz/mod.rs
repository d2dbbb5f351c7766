//! Display payload handed to a rendering layer.
//!
//! The payload is plain serializable data: every node and edge of the graph
//! in view, each tagged with the state a renderer needs (active, selected,
//! failed), plus the ordered flow chain and its fingerprint.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::config::DisplayMode;
use crate::graph::gate::FailReason;
use crate::graph::model::Graph;
use crate::graph::registry::FlowRegistry;
use crate::graph::sequencer::Schedule;
use crate::types::{ChainEntry, EdgeKind, NodeClass, NodeType};

// ---------------------------------------------------------------------------
// JSON types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeJson {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub class: NodeClass,
    pub depth: u32,
    pub network: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub active: bool,
    pub selected: bool,
    pub fail: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_reason: Option<FailReason>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeJson {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderPayload {
    pub mode: DisplayMode,
    pub nodes: Vec<NodeJson>,
    pub edges: Vec<EdgeJson>,
    /// Selected node ids, in selection order.
    pub selected: Vec<String>,
    /// Merged flow chain, empty in highlight mode.
    pub chain: Vec<ChainEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

impl RenderPayload {
    /// Payload for `graph` with nothing selected or active.
    pub fn new(graph: &Graph, mode: DisplayMode) -> Self {
        let nodes = graph
            .nodes()
            .iter()
            .map(|n| NodeJson {
                id: n.id.clone(),
                label: n.label.clone(),
                node_type: n.node_type,
                class: n.class,
                depth: n.depth,
                network: n.network.clone(),
                description: n.description.clone(),
                active: false,
                selected: false,
                fail: false,
                fail_reason: None,
            })
            .collect();
        let edges = graph
            .edges()
            .iter()
            .map(|e| EdgeJson {
                id: e.id.clone(),
                source: e.source.clone(),
                target: e.target.clone(),
                kind: e.kind,
                active: false,
            })
            .collect();
        Self {
            mode,
            nodes,
            edges,
            selected: Vec::new(),
            chain: Vec::new(),
            fingerprint: None,
        }
    }

    /// Mark `selected` nodes.
    pub fn with_selection(mut self, selected: &[String]) -> Self {
        let set: BTreeSet<&str> = selected.iter().map(String::as_str).collect();
        for node in &mut self.nodes {
            node.selected = set.contains(node.id.as_str());
        }
        self.selected = selected.to_vec();
        self
    }

    /// Highlight mode: activate `nodes` and every edge joining two of them.
    pub fn with_highlight(mut self, nodes: &BTreeSet<String>) -> Self {
        for node in &mut self.nodes {
            node.active = nodes.contains(&node.id);
        }
        for edge in &mut self.edges {
            edge.active = nodes.contains(&edge.source) && nodes.contains(&edge.target);
        }
        self
    }

    /// Flow mode: activate the merged chain of `registry` and flag nodes
    /// failed by every trace containing them.
    pub fn with_flow(mut self, registry: &FlowRegistry, schedule: Option<&Schedule>) -> Self {
        let active_nodes = registry.active_nodes();
        let active_edges = registry.active_edges();
        let failed = registry.failed_nodes();

        let mut reasons: BTreeMap<&str, FailReason> = BTreeMap::new();
        for trace in registry.traces() {
            for (id, reason) in trace.failed() {
                reasons.entry(id.as_str()).or_insert(*reason);
            }
        }

        for node in &mut self.nodes {
            node.active = active_nodes.contains(node.id.as_str());
            node.fail = failed.contains(node.id.as_str());
            node.fail_reason = if node.fail {
                reasons.get(node.id.as_str()).copied()
            } else {
                None
            };
        }
        for edge in &mut self.edges {
            edge.active = active_edges.contains(edge.id.as_str());
        }
        self.chain = registry.merged();
        self.fingerprint = schedule.map(|s| s.fingerprint().to_string());
        self
    }

    pub fn active_node_ids(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|n| n.active)
            .map(|n| n.id.as_str())
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
