//! The loaded, depth-assigned dataset.
//!
//! A workspace owns every network that passed depth assignment, the networks
//! rejected for being cyclic, and the architectures that compose them. A
//! rejected network does not affect the others: it is simply absent from
//! combined graphs and coarse views.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::dataset::{load_path, Dataset};
use crate::error::{ArchFlowError, Result};
use crate::graph::depth::{assign_depths, CyclicGraphError};
use crate::graph::hierarchy::{coarse_view, CoarseView};
use crate::graph::model::{combine, Architecture, Graph, Network};
use crate::types::Node;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A network left out of the workspace because its semantic edges contain a
/// cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedNetwork {
    pub name: String,
    pub error: CyclicGraphError,
}

impl RejectedNetwork {
    pub fn to_error(&self) -> ArchFlowError {
        ArchFlowError::CyclicGraph {
            network: self.name.clone(),
            source: self.error.clone(),
        }
    }
}

/// What a command operates on: one network, or an architecture's combined
/// graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", content = "name", rename_all = "snake_case")]
pub enum Scope {
    Network(String),
    Architecture(String),
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(name) => write!(f, "network {name}"),
            Self::Architecture(name) => write!(f, "architecture {name}"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Workspace {
    networks: BTreeMap<String, Network>,
    rejected: Vec<RejectedNetwork>,
    architectures: Vec<Architecture>,
}

// ---------------------------------------------------------------------------
// Implementation
// ---------------------------------------------------------------------------

impl Workspace {
    /// Load a dataset directory or bundle file and assign depths.
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::from_dataset(load_path(path)?))
    }

    /// Assign depths to every network of `dataset`. Cyclic networks are
    /// rejected and logged; the rest stay usable.
    pub fn from_dataset(dataset: Dataset) -> Self {
        let mut workspace = Self {
            architectures: dataset.architectures,
            ..Self::default()
        };
        for mut network in dataset.networks {
            match assign_depths(&mut network.graph) {
                Ok(()) => {
                    workspace.networks.insert(network.name.clone(), network);
                }
                Err(error) => {
                    tracing::warn!(network = %network.name, %error, "network rejected: not a DAG");
                    workspace.rejected.push(RejectedNetwork {
                        name: network.name,
                        error,
                    });
                }
            }
        }
        workspace
    }

    pub fn networks(&self) -> &BTreeMap<String, Network> {
        &self.networks
    }

    pub fn rejected(&self) -> &[RejectedNetwork] {
        &self.rejected
    }

    pub fn architectures(&self) -> &[Architecture] {
        &self.architectures
    }

    /// Look up a usable network.
    pub fn network(&self, name: &str) -> Result<&Network> {
        if let Some(network) = self.networks.get(name) {
            return Ok(network);
        }
        if self.rejected.iter().any(|r| r.name == name) {
            return Err(ArchFlowError::NetworkUnavailable(name.to_string()));
        }
        Err(ArchFlowError::UnknownNetwork(name.to_string()))
    }

    /// Look up an architecture by name or numeric id.
    pub fn architecture(&self, key: &str) -> Result<&Architecture> {
        let by_id = key.parse::<u32>().ok();
        self.architectures
            .iter()
            .find(|a| a.name == key)
            .or_else(|| by_id.and_then(|id| self.architectures.iter().find(|a| a.id == id)))
            .ok_or_else(|| ArchFlowError::UnknownArchitecture(key.to_string()))
    }

    /// Combined cross-network graph of `architecture`.
    pub fn combined(&self, architecture: &Architecture) -> Graph {
        combine(architecture, &self.networks)
    }

    /// Layer/network/depth grouping of `architecture`.
    pub fn coarse(&self, architecture: &Architecture) -> CoarseView {
        coarse_view(architecture, &self.networks)
    }

    /// Graph for `scope`. Network graphs are borrowed; combined graphs are
    /// built on demand.
    pub fn graph(&self, scope: &Scope) -> Result<Cow<'_, Graph>> {
        match scope {
            Scope::Network(name) => Ok(Cow::Borrowed(&self.network(name)?.graph)),
            Scope::Architecture(key) => Ok(Cow::Owned(self.combined(self.architecture(key)?))),
        }
    }

    /// Find a node by id in any usable network.
    pub fn find_node(&self, id: &str) -> Option<&Node> {
        self.networks.values().find_map(|n| n.graph.node(id))
    }

    /// `Err` naming the first rejected network, if any.
    pub fn ensure_acyclic(&self) -> Result<()> {
        match self.rejected.first() {
            Some(rejected) => Err(rejected.to_error()),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::NetworkFile;
    use crate::graph::model::LayerAssignment;
    use crate::types::EdgeKind;
    use pretty_assertions::assert_eq;

    fn network(name: &str, json: &str) -> Network {
        let file: NetworkFile = serde_json::from_str(json).unwrap();
        file.to_network(name)
    }

    fn dataset() -> Dataset {
        Dataset {
            networks: vec![
                network(
                    "A",
                    r#"{"nodes": [{"node": "a1"}, {"node": "a2"}], "links": [{"source": "a1", "target": "a2"}]}"#,
                ),
                network(
                    "B",
                    r#"{"nodes": [{"node": "b1"}], "links": []}"#,
                ),
                network(
                    "LOOP",
                    r#"{"nodes": [{"node": "x"}, {"node": "y"}],
                        "links": [{"source": "x", "target": "y"}, {"source": "y", "target": "x"}]}"#,
                ),
            ],
            architectures: vec![Architecture {
                id: 7,
                name: "main".into(),
                num_layers: 2,
                layers: vec![
                    LayerAssignment {
                        layer: 1,
                        network: "A".into(),
                    },
                    LayerAssignment {
                        layer: 2,
                        network: "B".into(),
                    },
                ],
                routes: vec![crate::graph::model::Route {
                    source_net: "A".into(),
                    source_node: "a2".into(),
                    dest_net: "B".into(),
                    dest_node: "b1".into(),
                }],
            }],
            sources: Vec::new(),
        }
    }

    #[test]
    fn depths_are_assigned_on_load() {
        let ws = Workspace::from_dataset(dataset());
        let a = ws.network("A").unwrap();
        assert_eq!(a.graph.node("a1-A").map(|n| n.depth), Some(1));
        assert_eq!(a.graph.node("a2-A").map(|n| n.depth), Some(2));
    }

    #[test]
    fn cyclic_network_is_rejected_alone() {
        let ws = Workspace::from_dataset(dataset());
        assert_eq!(ws.networks().len(), 2);
        assert_eq!(ws.rejected().len(), 1);
        assert!(matches!(
            ws.network("LOOP"),
            Err(ArchFlowError::NetworkUnavailable(name)) if name == "LOOP"
        ));
        assert!(matches!(ws.network("NOPE"), Err(ArchFlowError::UnknownNetwork(_))));
        assert!(matches!(
            ws.ensure_acyclic(),
            Err(ArchFlowError::CyclicGraph { network, .. }) if network == "LOOP"
        ));
    }

    #[test]
    fn architecture_lookup_by_name_or_id() {
        let ws = Workspace::from_dataset(dataset());
        assert_eq!(ws.architecture("main").unwrap().id, 7);
        assert_eq!(ws.architecture("7").unwrap().name, "main");
        assert!(matches!(ws.architecture("9"), Err(ArchFlowError::UnknownArchitecture(_))));
    }

    #[test]
    fn combined_graph_carries_route_edge() {
        let ws = Workspace::from_dataset(dataset());
        let graph = ws.graph(&Scope::Architecture("main".into())).unwrap();
        assert_eq!(graph.node_count(), 3);
        let arch_edges: Vec<_> = graph
            .edges()
            .iter()
            .filter(|e| e.kind == EdgeKind::Architecture)
            .collect();
        assert_eq!(arch_edges.len(), 1);
        assert_eq!(arch_edges[0].source, "a2-A");
    }

    #[test]
    fn network_scope_borrows() {
        let ws = Workspace::from_dataset(dataset());
        let graph = ws.graph(&Scope::Network("A".into())).unwrap();
        assert!(matches!(graph, Cow::Borrowed(_)));
        assert!(ws.find_node("b1-B").is_some());
        assert!(ws.find_node("x-LOOP").is_none());
    }
}
